//! File-backed audit store
//!
//! Records live in an append-only JSON Lines file (one record per line) and
//! are mirrored in memory for queries. Creating a record appends one line;
//! retention cleanup rewrites the file atomically. Both happen under the
//! in-memory write lock and the file lock, and memory is only updated once
//! the file write succeeded, so readers see either the state before or after
//! a write, never a mix.
//!
//! Other processes may append to the same file while a store is open.
//! Cleanup therefore works from a fresh read of the file, never from the
//! mirror, so their records survive it.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::settings::PaginationSettings;
use crate::error::AuditError;
use crate::models::{AuditRecord, AuditRecordId, NewAuditRecord};

use super::file_io::{
    append_json_line, load_json_lines, lock_exclusive, read_json_lines, truncate_json_lines,
    write_json_lines_atomic,
};
use super::query::{Page, PageRequest, SearchCriteria};
use super::AuditStore;

/// Audit store persisted as a JSON Lines file
pub struct JsonAuditStore {
    path: PathBuf,
    pagination: PaginationSettings,
    /// Records in insertion order
    records: RwLock<Vec<AuditRecord>>,
}

impl JsonAuditStore {
    /// Open the store, loading any records already on disk
    ///
    /// A torn last line from an interrupted append is cut from the file.
    pub fn open(path: PathBuf, pagination: PaginationSettings) -> Result<Self, AuditError> {
        let mut loaded = load_json_lines::<AuditRecord, _>(&path)?;

        if loaded.torn_at.is_some() {
            // Reload under the lock; a concurrent append may have been in flight
            let _lock = lock_exclusive(&path)?;
            loaded = load_json_lines(&path)?;
            if let Some(len) = loaded.torn_at {
                warn!(path = %path.display(), kept_bytes = len, "Truncating torn audit log tail");
                truncate_json_lines(&path, len)?;
            }
        }

        let records = loaded.items;
        debug!(path = %path.display(), count = records.len(), "Loaded audit log");

        Ok(Self {
            path,
            pagination,
            records: RwLock::new(records),
        })
    }

    /// Get the path to the audit log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an already-identified record
    fn append(&self, record: AuditRecord) -> Result<AuditRecord, AuditError> {
        let mut records = self.records.write().map_err(|e| {
            AuditError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let _lock = lock_exclusive(&self.path)?;
        append_json_line(&self.path, &record)?;
        records.push(record.clone());

        Ok(record)
    }

    #[cfg(test)]
    pub(crate) fn insert_backdated(
        &self,
        new: NewAuditRecord,
        created_at: DateTime<Utc>,
    ) -> AuditRecord {
        self.append(AuditRecord::from_new(AuditRecordId::new(), created_at, new))
            .unwrap()
    }
}

impl AuditStore for JsonAuditStore {
    fn create(&self, record: NewAuditRecord) -> Result<AuditRecord, AuditError> {
        record.validate()?;

        let record = AuditRecord::from_new(AuditRecordId::new(), Utc::now(), record);
        let record = self.append(record)?;

        debug!(
            id = %record.id,
            user_id = record.user_id,
            action = %record.action,
            resource_type = %record.resource_type,
            resource_id = %record.resource_id,
            "Audit record written"
        );

        Ok(record)
    }

    fn get_by_id(&self, id: AuditRecordId) -> Result<Option<AuditRecord>, AuditError> {
        let records = self.records.read().map_err(|e| {
            AuditError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    fn search(
        &self,
        criteria: &SearchCriteria,
        page: &PageRequest,
    ) -> Result<Page<AuditRecord>, AuditError> {
        let resolved = page.resolve(&self.pagination);

        let records = self.records.read().map_err(|e| {
            AuditError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        // Reverse first so equal timestamps list the later insert first
        let mut matching: Vec<&AuditRecord> =
            records.iter().rev().filter(|r| criteria.matches(r)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(resolved.offset())
            .take(resolved.page_size as usize)
            .cloned()
            .collect();

        Ok(Page::new(data, total, resolved))
    }

    fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize, AuditError> {
        let mut records = self.records.write().map_err(|e| {
            AuditError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let _lock = lock_exclusive(&self.path)?;
        let on_disk: Vec<AuditRecord> = read_json_lines(&self.path)?;

        let (expired, retained): (Vec<AuditRecord>, Vec<AuditRecord>) =
            on_disk.into_iter().partition(|r| r.created_at < cutoff);

        let deleted = expired.len();
        if deleted > 0 {
            write_json_lines_atomic(&self.path, &retained)?;
        }
        *records = retained;

        if deleted == 0 {
            return Ok(0);
        }

        info!(
            deleted,
            remaining = records.len(),
            cutoff = %cutoff.to_rfc3339(),
            "Expired audit records removed"
        );

        Ok(deleted)
    }

    fn count(&self) -> Result<usize, AuditError> {
        let records = self.records.read().map_err(|e| {
            AuditError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(records.len())
    }
}
