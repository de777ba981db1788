//! Engine settings for erp-audit
//!
//! Everything the recorder, store, and query service need is carried here and
//! passed into their constructors: pagination limits, the retention default,
//! the audit-write failure policy, and the diff depth.

use serde::{Deserialize, Serialize};

use super::paths::AuditPaths;
use crate::audit::DiffDepth;
use crate::error::AuditError;

/// What the recorder does when the store rejects an audit write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditFailurePolicy {
    /// Return the persistence error to the calling business operation
    #[default]
    Propagate,
    /// Log the failure and let the business operation continue
    LogAndContinue,
}

impl AuditFailurePolicy {
    /// Parse a policy name as accepted on the command line
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "propagate" | "fatal" => Some(Self::Propagate),
            "log_and_continue" | "continue" | "ignore" => Some(Self::LogAndContinue),
            _ => None,
        }
    }
}

/// Page size limits applied to every list query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationSettings {
    /// Page size used when the caller does not ask for one
    pub default_page_size: u32,
    /// Upper bound for any requested page size
    pub max_page_size: u32,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// Retention defaults for cleanup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionSettings {
    /// Records older than this many days are removed by a default cleanup
    pub default_days: i64,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self { default_days: 90 }
    }
}

/// Settings for erp-audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub pagination: PaginationSettings,

    #[serde(default)]
    pub retention: RetentionSettings,

    #[serde(default)]
    pub failure_policy: AuditFailurePolicy,

    #[serde(default)]
    pub diff_depth: DiffDepth,
}

fn default_schema_version() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            pagination: PaginationSettings::default(),
            retention: RetentionSettings::default(),
            failure_policy: AuditFailurePolicy::default(),
            diff_depth: DiffDepth::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or fall back to defaults if the file doesn't exist
    pub fn load_or_create(paths: &AuditPaths) -> Result<Self, AuditError> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| AuditError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| AuditError::Config(format!("Failed to parse settings file: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &AuditPaths) -> Result<(), AuditError> {
        self.validate()?;
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| AuditError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| AuditError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Reject settings that would make pagination or retention meaningless
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.pagination.default_page_size == 0 || self.pagination.max_page_size == 0 {
            return Err(AuditError::Config("Page sizes must be positive".into()));
        }
        if self.pagination.default_page_size > self.pagination.max_page_size {
            return Err(AuditError::Config(format!(
                "Default page size {} exceeds maximum {}",
                self.pagination.default_page_size, self.pagination.max_page_size
            )));
        }
        if self.retention.default_days <= 0 {
            return Err(AuditError::Config(
                "Default retention must be a positive number of days".into(),
            ));
        }
        Ok(())
    }
}
