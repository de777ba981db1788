//! Audit record display formatting
//!
//! Formats audit records for terminal output in table and detail views.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::audit::ChangeSet;
use crate::models::{AuditRecord, Capture};
use crate::storage::Page;

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "When (UTC)")]
    when: String,
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&AuditRecord> for RecordRow {
    fn from(record: &AuditRecord) -> Self {
        Self {
            id: record.id.short(),
            when: record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            user: format!("{} (#{})", record.username, record.user_id),
            action: record.action.to_string(),
            resource: record.resource().to_string(),
            status: record.status.to_string(),
            description: truncate(&record.description, 48),
        }
    }
}

/// Format one page of records as a table with a paging footer
pub fn format_record_page(page: &Page<AuditRecord>) -> String {
    if page.is_empty() {
        return if page.total == 0 {
            "No audit records found.\n".to_string()
        } else {
            format!(
                "Page {} is past the end ({} records, {} pages).\n",
                page.page, page.total, page.total_pages
            )
        };
    }

    let rows: Vec<RecordRow> = page.data.iter().map(RecordRow::from).collect();
    let mut output = Table::new(rows).with(Style::psql()).to_string();

    output.push_str(&format!(
        "\n\nPage {} of {} ({} records, {} per page)\n",
        page.page, page.total_pages, page.total, page.page_size
    ));

    output
}

/// Format every detail of one record
pub fn format_record_details(record: &AuditRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!("Audit record: {}\n", record.id));
    output.push_str(&format!(
        "When:        {}\n",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!(
        "User:        {} (#{})\n",
        record.username, record.user_id
    ));
    output.push_str(&format!("Action:      {}\n", record.action));
    output.push_str(&format!("Resource:    {}\n", record.resource()));
    output.push_str(&format!("Status:      {}\n", record.status));

    if !record.description.is_empty() {
        output.push_str(&format!("Description: {}\n", record.description));
    }

    if let Some(context) = record.request_context() {
        let request = [context.method.as_deref(), context.path.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if !request.is_empty() {
            output.push_str(&format!("Request:     {}\n", request));
        }
        if let Some(ip) = &context.ip_address {
            output.push_str(&format!("IP address:  {}\n", ip));
        }
        if let Some(agent) = &context.user_agent {
            output.push_str(&format!("User agent:  {}\n", agent));
        }
    }

    if let Some(error) = &record.error_message {
        output.push_str(&format!("Error:       {}\n", error));
    }
    if let Some(ms) = record.duration_ms {
        output.push_str(&format!("Duration:    {} ms\n", ms));
    }

    output.push_str(&format!("\nChanges:\n{}", format_changes_capture(&record.changes)));
    output.push_str(&format!("\nBefore:\n{}", format_capture(&record.old_values)));
    output.push_str(&format!("\nAfter:\n{}", format_capture(&record.new_values)));

    output
}

/// Format a change-set as one `path: old -> new` line per change
pub fn format_change_set(changes: &ChangeSet) -> String {
    if changes.is_empty() {
        return "  (no changes)\n".to_string();
    }

    changes
        .iter()
        .map(|(path, change)| format!("  {}: {} -> {}\n", path, change.old, change.new))
        .collect()
}

fn format_changes_capture(capture: &Capture) -> String {
    match capture {
        Capture::Present(text) => match serde_json::from_str::<ChangeSet>(text) {
            Ok(changes) => format_change_set(&changes),
            Err(_) => format!("  {}\n", text),
        },
        other => format_capture(other),
    }
}

fn format_capture(capture: &Capture) -> String {
    match capture {
        Capture::Present(text) => match capture.parse_json() {
            Some(value) => {
                let pretty = serde_json::to_string_pretty(&value).unwrap_or_else(|_| text.clone());
                indent(&pretty)
            }
            None => format!("  {}\n", text),
        },
        Capture::Absent => "  (none)\n".to_string(),
        Capture::Unavailable { reason } => format!("  (unavailable: {})\n", reason),
    }
}

fn indent(text: &str) -> String {
    text.lines().map(|line| format!("  {}\n", line)).collect()
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
