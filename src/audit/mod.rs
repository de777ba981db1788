//! Audit engine for erp-audit
//!
//! Records who did what to which entity, with before/after state and the
//! exact fields that changed.
//!
//! # Architecture
//!
//! - [`diff`]: pure structural diff between two entity states, producing a
//!   [`ChangeSet`] of `path -> {old, new}`.
//! - [`Snapshot`]: the state of an entity on one side of an operation,
//!   captured through serde without ever failing the caller.
//! - [`AuditRecorder`]: builds one audit record per business operation and
//!   writes it through an [`AuditStore`](crate::storage::AuditStore).
//!
//! # Example
//!
//! ```rust,ignore
//! use erp_audit::audit::{AuditRecorder, Snapshot};
//! use erp_audit::models::{Action, Actor, ResourceRef};
//!
//! let recorder = AuditRecorder::from_settings(&store, &settings);
//!
//! recorder.log_action(
//!     &Actor::new(7, "alice"),
//!     Action::Update,
//!     &ResourceRef::new("customer", "42"),
//!     "Raised credit limit",
//!     &Snapshot::of(&before),
//!     &Snapshot::of(&after),
//! )?;
//! ```

pub mod diff;
mod recorder;
mod snapshot;

pub use diff::{
    diff, diff_entities, diff_with_depth, diff_with_prefix, ChangeSet, DiffDepth, FieldChange,
};
pub use recorder::AuditRecorder;
pub use snapshot::Snapshot;
