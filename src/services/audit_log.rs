//! Audit log query service
//!
//! Read access to the audit trail plus retention cleanup. Input is validated
//! here before the store is touched.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::Settings;
use crate::error::{AuditError, AuditResult};
use crate::models::{AuditRecord, AuditRecordId};
use crate::storage::{AuditStore, Page, PageRequest, SearchCriteria};

/// Service for querying and maintaining the audit log
pub struct AuditLogService<'a, S: AuditStore + ?Sized> {
    store: &'a S,
    settings: &'a Settings,
}

/// Outcome of a retention cleanup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Number of records removed
    pub deleted: usize,
    /// Records created strictly before this instant were removed
    pub cutoff: DateTime<Utc>,
    pub retention_days: i64,
}

impl<'a, S: AuditStore + ?Sized> AuditLogService<'a, S> {
    /// Create a new audit log service
    pub fn new(store: &'a S, settings: &'a Settings) -> Self {
        Self { store, settings }
    }

    /// Search the audit log, newest first
    pub fn list(
        &self,
        criteria: &SearchCriteria,
        page: &PageRequest,
    ) -> AuditResult<Page<AuditRecord>> {
        criteria.validate()?;
        validate_page(page)?;
        self.store.search(criteria, page)
    }

    /// Get a single record by id
    pub fn get(&self, id: AuditRecordId) -> AuditResult<AuditRecord> {
        self.store
            .get_by_id(id)?
            .ok_or_else(|| AuditError::record_not_found(id.to_string()))
    }

    /// Get a record by its textual id (with or without the `aud-` prefix)
    pub fn get_by_str(&self, id: &str) -> AuditResult<AuditRecord> {
        let parsed: AuditRecordId = id
            .parse()
            .map_err(|_| AuditError::record_not_found(id))?;
        self.get(parsed)
    }

    /// Everything one user did
    pub fn by_actor(&self, user_id: u64, page: &PageRequest) -> AuditResult<Page<AuditRecord>> {
        if user_id == 0 {
            return Err(AuditError::Validation("User id must be positive".into()));
        }
        validate_page(page)?;
        self.store.get_by_actor(user_id, page)
    }

    /// Full history of one entity
    pub fn by_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        page: &PageRequest,
    ) -> AuditResult<Page<AuditRecord>> {
        if resource_type.trim().is_empty() {
            return Err(AuditError::Validation("Resource type cannot be empty".into()));
        }
        validate_page(page)?;
        self.store.get_by_resource(resource_type, resource_id, page)
    }

    /// Every record matching the criteria, newest first
    ///
    /// Walks the pages at the maximum page size. Used for exports.
    pub fn collect_all(&self, criteria: &SearchCriteria) -> AuditResult<Vec<AuditRecord>> {
        criteria.validate()?;

        let page_size = self.settings.pagination.max_page_size;
        let mut records = Vec::new();
        let mut page_number = 1;

        loop {
            let page = self
                .store
                .search(criteria, &PageRequest::new(page_number, page_size))?;
            let has_next = page.has_next();
            records.extend(page.data);

            if !has_next {
                break;
            }
            page_number += 1;
        }

        Ok(records)
    }

    /// Delete records older than `days` days
    ///
    /// The cutoff is fixed once, before the store is scanned.
    pub fn cleanup(&self, days: i64) -> AuditResult<CleanupReport> {
        if days <= 0 {
            return Err(AuditError::Validation(format!(
                "Retention days must be positive, got {}",
                days
            )));
        }

        let cutoff = Duration::try_days(days)
            .and_then(|retention| Utc::now().checked_sub_signed(retention))
            .ok_or_else(|| {
                AuditError::Validation(format!("Retention of {} days is out of range", days))
            })?;

        let deleted = self.store.delete_before(cutoff)?;

        info!(
            deleted,
            retention_days = days,
            cutoff = %cutoff.to_rfc3339(),
            "Audit log cleanup finished"
        );

        Ok(CleanupReport {
            deleted,
            cutoff,
            retention_days: days,
        })
    }

    /// Delete records older than the configured retention
    pub fn cleanup_default(&self) -> AuditResult<CleanupReport> {
        self.cleanup(self.settings.retention.default_days)
    }

    /// Total number of stored records
    pub fn count(&self) -> AuditResult<usize> {
        self.store.count()
    }
}

fn validate_page(page: &PageRequest) -> AuditResult<()> {
    if page.page == Some(0) {
        return Err(AuditError::Validation("Page numbers start at 1".into()));
    }
    Ok(())
}
