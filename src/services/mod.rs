//! Service layer for erp-audit
//!
//! The service layer sits on top of the storage layer, validating queries and
//! retention requests before they reach the store.

pub mod audit_log;

pub use audit_log::{AuditLogService, CleanupReport};
