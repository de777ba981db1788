//! Configuration module for erp-audit
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - Engine settings persistence (pagination, retention, failure policy)

pub mod paths;
pub mod settings;

pub use paths::AuditPaths;
pub use settings::{AuditFailurePolicy, PaginationSettings, RetentionSettings, Settings};
