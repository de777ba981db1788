//! JSON Export functionality
//!
//! Exports audit records to JSON with schema versioning.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};
use crate::models::AuditRecord;
use crate::storage::SearchCriteria;

/// Current export schema version
pub const EXPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Audit log export structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditExport {
    /// Schema version for compatibility checking
    pub schema_version: String,

    /// Export timestamp
    pub exported_at: DateTime<Utc>,

    /// Application version that created the export
    pub app_version: String,

    /// Filters the records were selected with
    #[serde(default)]
    pub filters: SearchCriteria,

    /// Number of exported records
    pub record_count: usize,

    /// Exported records, newest first
    pub records: Vec<AuditRecord>,
}

impl AuditExport {
    pub fn new(records: Vec<AuditRecord>, filters: SearchCriteria) -> Self {
        Self {
            schema_version: EXPORT_SCHEMA_VERSION.to_string(),
            exported_at: Utc::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            filters,
            record_count: records.len(),
            records,
        }
    }

    /// Validate the export structure
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version != EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Schema version mismatch: expected {}, got {}",
                EXPORT_SCHEMA_VERSION, self.schema_version
            ));
        }

        if self.record_count != self.records.len() {
            return Err(format!(
                "Record count mismatch: header says {}, found {}",
                self.record_count,
                self.records.len()
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for record in &self.records {
            if !seen.insert(record.id) {
                return Err(format!("Duplicate audit record {}", record.id));
            }
        }

        Ok(())
    }
}

/// Write an export as JSON
pub fn export_audit_json<W: Write>(
    export: &AuditExport,
    writer: &mut W,
    pretty: bool,
) -> AuditResult<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, export)
    } else {
        serde_json::to_writer(&mut *writer, export)
    }
    .map_err(|e| AuditError::Export(e.to_string()))?;

    writeln!(writer).map_err(|e| AuditError::Export(e.to_string()))?;
    Ok(())
}

/// Read a JSON export back (for verification)
pub fn import_from_json(json_str: &str) -> AuditResult<AuditExport> {
    let export: AuditExport =
        serde_json::from_str(json_str).map_err(|e| AuditError::Export(e.to_string()))?;

    export.validate().map_err(AuditError::Export)?;

    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, Actor, AuditRecordId, Capture, NewAuditRecord, ResourceRef};

    fn sample_records() -> Vec<AuditRecord> {
        (0..3)
            .map(|i| {
                let new = NewAuditRecord {
                    new_values: Capture::Present(format!(r#"{{"qty":{}}}"#, i)),
                    ..NewAuditRecord::success(
                        &Actor::new(1, "alice"),
                        Action::Create,
                        &ResourceRef::new("stock_item", i.to_string()),
                    )
                };
                AuditRecord::from_new(AuditRecordId::new(), Utc::now(), new)
            })
            .collect()
    }

    #[test]
    fn test_export_header() {
        let export = AuditExport::new(sample_records(), SearchCriteria::default());

        assert_eq!(export.schema_version, EXPORT_SCHEMA_VERSION);
        assert_eq!(export.record_count, 3);
        assert!(export.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let records = sample_records();
        let export = AuditExport::new(records.clone(), SearchCriteria::for_actor(1));

        let mut output = Vec::new();
        export_audit_json(&export, &mut output, true).unwrap();

        let imported = import_from_json(&String::from_utf8(output).unwrap()).unwrap();
        assert_eq!(imported.records, records);
        assert_eq!(imported.filters.user_id, Some(1));
    }

    #[test]
    fn test_validate_detects_tampering() {
        let mut export = AuditExport::new(sample_records(), SearchCriteria::default());
        export.records.pop();
        assert!(export.validate().unwrap_err().contains("Record count"));

        let mut export = AuditExport::new(sample_records(), SearchCriteria::default());
        export.schema_version = "0.1.0".into();
        assert!(export.validate().is_err());
    }
}
