//! CSV Export functionality
//!
//! One row per audit record, spreadsheet-compatible. Captured state is
//! written as its JSON text; absent captures are empty cells and unavailable
//! ones read `<unavailable: reason>`.

use std::io::Write;

use crate::error::{AuditError, AuditResult};
use crate::models::{AuditRecord, Capture};

const HEADER: [&str; 18] = [
    "id",
    "created_at",
    "user_id",
    "username",
    "action",
    "resource_type",
    "resource_id",
    "status",
    "description",
    "method",
    "path",
    "ip_address",
    "user_agent",
    "old_values",
    "new_values",
    "changes",
    "error_message",
    "duration_ms",
];

/// Export audit records to CSV
pub fn export_audit_csv<W: Write>(records: &[AuditRecord], writer: W) -> AuditResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(HEADER)
        .map_err(|e| AuditError::Export(e.to_string()))?;

    for record in records {
        csv_writer
            .write_record(row(record))
            .map_err(|e| AuditError::Export(e.to_string()))?;
    }

    csv_writer
        .flush()
        .map_err(|e| AuditError::Export(e.to_string()))?;

    Ok(())
}

fn row(record: &AuditRecord) -> Vec<String> {
    let optional = |value: &Option<String>| value.clone().unwrap_or_default();

    vec![
        record.id.to_string(),
        record.created_at.to_rfc3339(),
        record.user_id.to_string(),
        record.username.clone(),
        record.action.to_string(),
        record.resource_type.clone(),
        record.resource_id.clone(),
        record.status.to_string(),
        record.description.clone(),
        optional(&record.method),
        optional(&record.path),
        optional(&record.ip_address),
        optional(&record.user_agent),
        capture_cell(&record.old_values),
        capture_cell(&record.new_values),
        capture_cell(&record.changes),
        optional(&record.error_message),
        record
            .duration_ms
            .map(|ms| ms.to_string())
            .unwrap_or_default(),
    ]
}

fn capture_cell(capture: &Capture) -> String {
    match capture {
        Capture::Present(text) => text.clone(),
        Capture::Absent => String::new(),
        Capture::Unavailable { reason } => format!("<unavailable: {}>", reason),
    }
}
