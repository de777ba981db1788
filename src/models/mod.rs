//! Core data models for erp-audit
//!
//! Audit records, the identities and resources they reference, and the
//! action codes they carry.

pub mod action;
pub mod ids;
pub mod record;

pub use action::Action;
pub use ids::AuditRecordId;
pub use record::{
    Actor, AuditRecord, AuditStatus, Capture, NewAuditRecord, RequestContext, ResourceRef,
};
