//! Search criteria and pagination for audit queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::settings::PaginationSettings;
use crate::error::AuditError;
use crate::models::{Action, AuditRecord, AuditStatus};

/// Filters for an audit search; every filter that is set must match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub user_id: Option<u64>,
    /// Case-insensitive substring of the actor's username
    pub username: Option<String>,
    pub action: Option<Action>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub status: Option<AuditStatus>,
    pub ip_address: Option<String>,
    /// Inclusive lower bound on creation time
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time
    pub end: Option<DateTime<Utc>>,
    /// Case-insensitive substring of the description or request path
    pub text: Option<String>,
}

impl SearchCriteria {
    pub fn for_actor(user_id: u64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn for_resource(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: Some(resource_type.into()),
            resource_id: Some(resource_id.into()),
            ..Self::default()
        }
    }

    /// Reject criteria that can never be satisfied by a well-formed query
    pub fn validate(&self) -> Result<(), AuditError> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(AuditError::Validation(format!(
                    "Time range start {} is after end {}",
                    start.to_rfc3339(),
                    end.to_rfc3339()
                )));
            }
        }
        if self.user_id == Some(0) {
            return Err(AuditError::Validation("User id filter must be positive".into()));
        }
        Ok(())
    }

    /// Check whether a record satisfies every filter
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if self.user_id.is_some_and(|id| id != record.user_id) {
            return false;
        }
        if let Some(username) = &self.username {
            if !contains_ignore_case(&record.username, username) {
                return false;
            }
        }
        if self.action.as_ref().is_some_and(|a| *a != record.action) {
            return false;
        }
        if self
            .resource_type
            .as_ref()
            .is_some_and(|t| *t != record.resource_type)
        {
            return false;
        }
        if self
            .resource_id
            .as_ref()
            .is_some_and(|id| *id != record.resource_id)
        {
            return false;
        }
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        if self.ip_address.is_some()
            && self.ip_address.as_deref() != record.ip_address.as_deref()
        {
            return false;
        }
        if self.start.is_some_and(|start| record.created_at < start) {
            return false;
        }
        if self.end.is_some_and(|end| record.created_at > end) {
            return false;
        }
        if let Some(text) = &self.text {
            let in_description = contains_ignore_case(&record.description, text);
            let in_path = record
                .path
                .as_deref()
                .is_some_and(|path| contains_ignore_case(path, text));
            if !in_description && !in_path {
                return false;
            }
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Requested page; missing or out-of-range values are clamped on resolve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    pub fn first() -> Self {
        Self::default()
    }

    /// Apply the configured limits
    ///
    /// Pages below 1 become 1, a missing or zero size becomes the default,
    /// and sizes above the maximum become the maximum.
    pub fn resolve(&self, limits: &PaginationSettings) -> ResolvedPage {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = match self.page_size {
            None | Some(0) => limits.default_page_size,
            Some(size) => size.min(limits.max_page_size),
        };
        ResolvedPage { page, page_size }
    }
}

/// A page request after clamping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPage {
    pub page: u32,
    pub page_size: u32,
}

impl ResolvedPage {
    pub fn offset(&self) -> usize {
        (self.page as usize - 1) * self.page_size as usize
    }
}

/// Paginated result envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Number of items matching the query across all pages
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, resolved: ResolvedPage) -> Self {
        let page_size = u64::from(resolved.page_size.max(1));
        let total_pages = u32::try_from(total.div_ceil(page_size)).unwrap_or(u32::MAX);
        Self {
            data,
            total,
            page: resolved.page,
            page_size: resolved.page_size,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
