//! Audit recorder
//!
//! Business operations call the recorder once they finish. The recorder turns
//! actor, action, resource, and before/after snapshots into one audit record
//! and persists it with a single store write. Snapshot and change-set
//! serialization problems never fail the call; they are recorded as
//! unavailable captures. Store failures are wrapped with the actor, action,
//! and resource and then handled according to the configured
//! [`AuditFailurePolicy`].

use std::fmt;

use tracing::{debug, error, warn};

use crate::config::{AuditFailurePolicy, Settings};
use crate::error::AuditError;
use crate::models::{
    Action, Actor, AuditRecord, Capture, NewAuditRecord, RequestContext, ResourceRef,
};
use crate::storage::AuditStore;

use super::diff::{diff_with_depth, DiffDepth};
use super::snapshot::Snapshot;

/// Writes audit records for business operations
pub struct AuditRecorder<'a, S: AuditStore + ?Sized> {
    store: &'a S,
    policy: AuditFailurePolicy,
    depth: DiffDepth,
}

impl<'a, S: AuditStore + ?Sized> AuditRecorder<'a, S> {
    pub fn new(store: &'a S, policy: AuditFailurePolicy, depth: DiffDepth) -> Self {
        Self {
            store,
            policy,
            depth,
        }
    }

    /// Build a recorder with the policy and diff depth from settings
    pub fn from_settings(store: &'a S, settings: &Settings) -> Self {
        Self::new(store, settings.failure_policy, settings.diff_depth)
    }

    pub fn policy(&self) -> AuditFailurePolicy {
        self.policy
    }

    /// Record a successful action
    ///
    /// Returns `Ok(Some(record))` once the record is stored. Under
    /// [`AuditFailurePolicy::LogAndContinue`] a store failure is logged and
    /// `Ok(None)` is returned instead of the error.
    pub fn log_action(
        &self,
        actor: &Actor,
        action: Action,
        resource: &ResourceRef,
        description: &str,
        before: &Snapshot,
        after: &Snapshot,
    ) -> Result<Option<AuditRecord>, AuditError> {
        let record = self.build_success(actor, action, resource, description, before, after);
        self.persist(record)
    }

    /// Record a successful action that came from a request handler
    #[allow(clippy::too_many_arguments)]
    pub fn log_action_with_context(
        &self,
        actor: &Actor,
        action: Action,
        resource: &ResourceRef,
        description: &str,
        before: &Snapshot,
        after: &Snapshot,
        context: &RequestContext,
    ) -> Result<Option<AuditRecord>, AuditError> {
        let record = self
            .build_success(actor, action, resource, description, before, after)
            .with_context(context);
        self.persist(record)
    }

    /// Record a failed action with its error and how long it ran
    pub fn log_error(
        &self,
        actor: &Actor,
        action: Action,
        resource: &ResourceRef,
        error: impl fmt::Display,
        duration_ms: u64,
    ) -> Result<Option<AuditRecord>, AuditError> {
        let record =
            NewAuditRecord::failure(actor, action, resource, error.to_string(), duration_ms);
        self.persist(record)
    }

    fn build_success(
        &self,
        actor: &Actor,
        action: Action,
        resource: &ResourceRef,
        description: &str,
        before: &Snapshot,
        after: &Snapshot,
    ) -> NewAuditRecord {
        let old_values = before.to_capture();
        let new_values = after.to_capture();

        let (changes, summary) = match (before, after) {
            (Snapshot::Captured(old), Snapshot::Captured(new)) => {
                let change_set = diff_with_depth(old, new, "", self.depth);
                let summary = change_set.summary();
                let capture = match serde_json::to_string(&change_set) {
                    Ok(text) => Capture::Present(text),
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize change-set");
                        Capture::unavailable(e.to_string())
                    }
                };
                (capture, summary)
            }
            (Snapshot::Unavailable(reason), _) | (_, Snapshot::Unavailable(reason)) => {
                (Capture::unavailable(reason.clone()), None)
            }
            _ => (Capture::Absent, None),
        };

        let description = if description.trim().is_empty() {
            default_description(&action, resource, summary.as_deref())
        } else {
            description.to_string()
        };

        NewAuditRecord {
            old_values,
            new_values,
            changes,
            ..NewAuditRecord::success(actor, action, resource)
        }
        .with_description(description)
    }

    fn persist(&self, record: NewAuditRecord) -> Result<Option<AuditRecord>, AuditError> {
        let user_id = record.user_id;
        let action = record.action.to_string();
        let resource_type = record.resource_type.clone();
        let resource_id = record.resource_id.clone();

        match self.store.create(record) {
            Ok(stored) => {
                debug!(id = %stored.id, status = %stored.status, "Recorded audit entry");
                Ok(Some(stored))
            }
            Err(source) => {
                let err = AuditError::Persistence {
                    user_id,
                    action,
                    resource_type,
                    resource_id,
                    source: Box::new(source),
                };

                match self.policy {
                    AuditFailurePolicy::Propagate => Err(err),
                    AuditFailurePolicy::LogAndContinue => {
                        error!(error = %err, "Audit record dropped");
                        Ok(None)
                    }
                }
            }
        }
    }
}

fn default_description(action: &Action, resource: &ResourceRef, summary: Option<&str>) -> String {
    match summary {
        Some(summary) => format!("{} {}: {}", action, resource, summary),
        None => format!("{} {}", action, resource),
    }
}
