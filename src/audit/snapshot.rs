//! Entity snapshots taken before and after a business operation

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::models::Capture;

/// State of an entity handed to the recorder
///
/// Capturing never fails the caller: a value that cannot be serialized
/// becomes `Unavailable` and is logged.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// Structured state of the entity
    Captured(Value),
    /// No state for this side of the operation (e.g. "before" of a create)
    None,
    /// Serialization of the entity failed
    Unavailable(String),
}

impl Snapshot {
    /// Capture the serialized state of an entity
    pub fn of<T: Serialize + ?Sized>(entity: &T) -> Self {
        match serde_json::to_value(entity) {
            Ok(value) => Self::Captured(value),
            Err(e) => {
                warn!(error = %e, "Failed to capture entity snapshot");
                Self::Unavailable(e.to_string())
            }
        }
    }

    pub fn none() -> Self {
        Self::None
    }

    pub fn from_value(value: Value) -> Self {
        Self::Captured(value)
    }

    /// Capture from JSON text, marking it unavailable if the text is not JSON
    pub fn from_json_str(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => Self::Captured(value),
            Err(e) => {
                warn!(error = %e, "Snapshot text is not valid JSON");
                Self::Unavailable(e.to_string())
            }
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Captured(value) => Some(value),
            _ => None,
        }
    }

    /// Serialize into the storable text form
    pub fn to_capture(&self) -> Capture {
        match self {
            Self::Captured(value) => match serde_json::to_string(value) {
                Ok(text) => Capture::Present(text),
                Err(e) => {
                    warn!(error = %e, "Failed to serialize snapshot");
                    Capture::unavailable(e.to_string())
                }
            },
            Self::None => Capture::Absent,
            Self::Unavailable(reason) => Capture::unavailable(reason.clone()),
        }
    }
}
