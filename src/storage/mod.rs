//! Storage layer for erp-audit
//!
//! The engine talks to persistence through the [`AuditStore`] trait so the
//! recorder and query service never depend on a concrete backend. The shipped
//! backend is [`JsonAuditStore`], an append-only JSON Lines file.

pub mod audit_log;
pub mod file_io;
pub mod query;

pub use audit_log::JsonAuditStore;
pub use file_io::{append_json_line, read_json_lines, write_json_lines_atomic};
pub use query::{Page, PageRequest, ResolvedPage, SearchCriteria};

use chrono::{DateTime, Utc};

use crate::error::AuditError;
use crate::models::{AuditRecord, AuditRecordId, NewAuditRecord};

/// Durable, append-only storage for audit records
///
/// Records are never modified after `create`; the only removal is
/// [`delete_before`](AuditStore::delete_before). Implementations must be safe
/// to share between threads.
pub trait AuditStore: Send + Sync {
    /// Persist a record, assigning its id and creation time
    fn create(&self, record: NewAuditRecord) -> Result<AuditRecord, AuditError>;

    /// Fetch one record by id
    fn get_by_id(&self, id: AuditRecordId) -> Result<Option<AuditRecord>, AuditError>;

    /// Records matching every set filter, newest first, one page at a time
    fn search(
        &self,
        criteria: &SearchCriteria,
        page: &PageRequest,
    ) -> Result<Page<AuditRecord>, AuditError>;

    /// Remove every record created strictly before `cutoff`, returning how many went
    fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize, AuditError>;

    /// Total number of stored records
    fn count(&self) -> Result<usize, AuditError>;

    /// Everything one actor did, newest first
    fn get_by_actor(
        &self,
        user_id: u64,
        page: &PageRequest,
    ) -> Result<Page<AuditRecord>, AuditError> {
        self.search(&SearchCriteria::for_actor(user_id), page)
    }

    /// Full history of one entity, newest first
    fn get_by_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        page: &PageRequest,
    ) -> Result<Page<AuditRecord>, AuditError> {
        self.search(&SearchCriteria::for_resource(resource_type, resource_id), page)
    }
}
