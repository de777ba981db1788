//! Audit record data structures
//!
//! An `AuditRecord` is one immutable fact about one action: who did it, what
//! they did it to, the request it came from, the captured state, and whether
//! it succeeded. `NewAuditRecord` is the same content before the store assigns
//! an id and creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::action::Action;
use super::ids::AuditRecordId;
use crate::error::AuditError;

/// The authenticated identity responsible for an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User id; zero means "no actor", which the store rejects
    pub user_id: u64,
    /// Display name at the time of the action
    pub username: String,
}

impl Actor {
    pub fn new(user_id: u64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// The logical entity an action targeted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub resource_type: String,
    /// String so composite and non-numeric identifiers fit
    pub resource_id: String,
}

impl ResourceRef {
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.resource_id)
    }
}

/// Request metadata, present only when the action came from a request handler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub method: Option<String>,
    pub path: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn is_empty(&self) -> bool {
        self.method.is_none()
            && self.path.is_none()
            && self.ip_address.is_none()
            && self.user_agent.is_none()
    }
}

/// Outcome of the audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Failed,
}

impl AuditStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "success" | "ok" => Some(Self::Success),
            "failed" | "failure" | "error" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A captured piece of serialized state
///
/// Distinguishes "nothing was captured" from "capture was attempted and
/// failed", so an empty change-set is never mistaken for a failed diff.
/// Stored as the text itself, `null`, or `{"unavailable": reason}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Capture {
    /// Serialized structured text (JSON)
    Present(String),
    /// Not applicable for this action
    #[default]
    Absent,
    /// Capture was attempted but serialization or diffing failed
    Unavailable { reason: String },
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CaptureRepr<'a> {
    Text(std::borrow::Cow<'a, str>),
    Marker { unavailable: std::borrow::Cow<'a, str> },
}

impl Serialize for Capture {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            Self::Present(text) => Some(CaptureRepr::Text(text.as_str().into())),
            Self::Unavailable { reason } => Some(CaptureRepr::Marker {
                unavailable: reason.as_str().into(),
            }),
            Self::Absent => None,
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Capture {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<CaptureRepr<'de>>::deserialize(deserializer)? {
            Some(CaptureRepr::Text(text)) => Self::Present(text.into_owned()),
            Some(CaptureRepr::Marker { unavailable }) => Self::Unavailable {
                reason: unavailable.into_owned(),
            },
            None => Self::Absent,
        })
    }
}

impl Capture {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// The captured text, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Present(text) => Some(text),
            _ => None,
        }
    }

    /// Parse the captured text back into structured JSON
    pub fn parse_json(&self) -> Option<serde_json::Value> {
        self.text().and_then(|text| serde_json::from_str(text).ok())
    }
}

/// Contents of an audit record before the store assigns identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditRecord {
    pub user_id: u64,
    pub username: String,
    pub action: Action,
    pub resource_type: String,
    pub resource_id: String,
    pub description: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub old_values: Capture,
    #[serde(default)]
    pub new_values: Capture,
    #[serde(default)]
    pub changes: Capture,
    pub status: AuditStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl NewAuditRecord {
    /// Start a successful record for an actor acting on a resource
    pub fn success(actor: &Actor, action: Action, resource: &ResourceRef) -> Self {
        Self {
            user_id: actor.user_id,
            username: actor.username.clone(),
            action,
            resource_type: resource.resource_type.clone(),
            resource_id: resource.resource_id.clone(),
            description: String::new(),
            method: None,
            path: None,
            ip_address: None,
            user_agent: None,
            old_values: Capture::Absent,
            new_values: Capture::Absent,
            changes: Capture::Absent,
            status: AuditStatus::Success,
            error_message: None,
            duration_ms: None,
        }
    }

    /// Start a failed record carrying the error message and timing
    pub fn failure(
        actor: &Actor,
        action: Action,
        resource: &ResourceRef,
        error_message: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        let error_message = error_message.into();
        Self {
            description: format!("{} {} failed", action, resource),
            status: AuditStatus::Failed,
            error_message: Some(error_message),
            duration_ms: Some(duration_ms),
            ..Self::success(actor, action, resource)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_context(mut self, context: &RequestContext) -> Self {
        self.method = context.method.clone();
        self.path = context.path.clone();
        self.ip_address = context.ip_address.clone();
        self.user_agent = context.user_agent.clone();
        self
    }

    /// Check the fields every record must carry
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.user_id == 0 {
            return Err(AuditError::Validation(
                "Audit record requires an actor user id".into(),
            ));
        }
        if self.action.is_empty() {
            return Err(AuditError::Validation("Audit record requires an action".into()));
        }
        if self.resource_type.trim().is_empty() {
            return Err(AuditError::Validation(
                "Audit record requires a resource type".into(),
            ));
        }
        Ok(())
    }
}

/// One immutable audit fact, as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub user_id: u64,
    pub username: String,
    pub action: Action,
    pub resource_type: String,
    pub resource_id: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    pub description: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub old_values: Capture,
    #[serde(default)]
    pub new_values: Capture,
    #[serde(default)]
    pub changes: Capture,
    pub status: AuditStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Give a new record its identity
    pub fn from_new(id: AuditRecordId, created_at: DateTime<Utc>, new: NewAuditRecord) -> Self {
        Self {
            id,
            user_id: new.user_id,
            username: new.username,
            action: new.action,
            resource_type: new.resource_type,
            resource_id: new.resource_id,
            method: new.method,
            path: new.path,
            description: new.description,
            ip_address: new.ip_address,
            user_agent: new.user_agent,
            old_values: new.old_values,
            new_values: new.new_values,
            changes: new.changes,
            status: new.status,
            error_message: new.error_message,
            duration_ms: new.duration_ms,
            created_at,
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.username.clone())
    }

    pub fn resource(&self) -> ResourceRef {
        ResourceRef::new(self.resource_type.clone(), self.resource_id.clone())
    }

    pub fn request_context(&self) -> Option<RequestContext> {
        let context = RequestContext {
            method: self.method.clone(),
            path: self.path.clone(),
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
        };
        (!context.is_empty()).then_some(context)
    }

    /// Format the record as a single log line
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {} by {} (#{})",
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.status,
            self.action,
            self.resource(),
            self.username,
            self.user_id
        );

        if !self.description.is_empty() {
            output.push_str(&format!(": {}", self.description));
        }

        if let Some(error) = &self.error_message {
            output.push_str(&format!("\n  Error: {}", error));
        }

        output
    }
}
