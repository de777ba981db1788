//! Export module for erp-audit
//!
//! Writes selected audit records in one of three formats:
//! - JSON: versioned envelope, machine-readable
//! - YAML: the same envelope with a comment header, for human review
//! - CSV: one row per record, spreadsheet-compatible

pub mod csv;
pub mod json;
pub mod yaml;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub use self::csv::export_audit_csv;
pub use json::{export_audit_json, import_from_json, AuditExport, EXPORT_SCHEMA_VERSION};
pub use yaml::{export_audit_yaml, import_from_yaml};

use crate::error::{AuditError, AuditResult};

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Yaml,
    Csv,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Csv => "csv",
        }
    }

    /// Give `path` this format's extension when it has none
    pub fn output_path(&self, path: &Path) -> PathBuf {
        if path.extension().is_some() {
            path.to_path_buf()
        } else {
            path.with_extension(self.extension())
        }
    }
}

/// Write an export in the given format
pub fn write_export<W: Write>(
    export: &AuditExport,
    format: ExportFormat,
    writer: &mut W,
) -> AuditResult<()> {
    match format {
        ExportFormat::Json => export_audit_json(export, writer, true),
        ExportFormat::Yaml => export_audit_yaml(export, writer),
        ExportFormat::Csv => export_audit_csv(&export.records, writer),
    }
}

/// Read a written export back and validate it
///
/// Returns the number of records found, or `None` for CSV, which has no
/// envelope to check.
pub fn verify_export(path: &Path, format: ExportFormat) -> AuditResult<Option<usize>> {
    if format == ExportFormat::Csv {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| AuditError::Export(format!("Failed to read {}: {}", path.display(), e)))?;

    let export = match format {
        ExportFormat::Json => import_from_json(&contents)?,
        ExportFormat::Yaml => import_from_yaml(&contents)?,
        ExportFormat::Csv => return Ok(None),
    };

    Ok(Some(export.record_count))
}
