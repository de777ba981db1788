//! YAML Export functionality
//!
//! Exports audit records to YAML for human review.

use std::io::Write;

use crate::error::{AuditError, AuditResult};
use crate::export::json::AuditExport;

/// Write an export as YAML with a comment header
pub fn export_audit_yaml<W: Write>(export: &AuditExport, writer: &mut W) -> AuditResult<()> {
    let header = format!(
        "# erp-audit Audit Log Export\n\
         # Generated: {}\n\
         # App Version: {}\n\
         # Records: {}\n\
         #\n\
         # Audit records are immutable; this file is a read-only copy.\n\n",
        export.exported_at, export.app_version, export.record_count
    );
    writer
        .write_all(header.as_bytes())
        .map_err(|e| AuditError::Export(e.to_string()))?;

    serde_yaml::to_writer(writer, export).map_err(|e| AuditError::Export(e.to_string()))?;

    Ok(())
}

/// Read a YAML export back
pub fn import_from_yaml(yaml_str: &str) -> AuditResult<AuditExport> {
    let export: AuditExport =
        serde_yaml::from_str(yaml_str).map_err(|e| AuditError::Export(e.to_string()))?;

    export.validate().map_err(AuditError::Export)?;

    Ok(export)
}
