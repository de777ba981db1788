//! Audit CLI commands
//!
//! Implements the `audit` subcommands: recording actions, querying the trail,
//! retention cleanup, diffing documents, and exporting.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;

use crate::audit::{diff_with_depth, AuditRecorder, DiffDepth, Snapshot};
use crate::config::Settings;
use crate::display::{format_change_set, format_record_details, format_record_page};
use crate::error::{AuditError, AuditResult};
use crate::export::{verify_export, write_export, AuditExport, ExportFormat};
use crate::models::{Action, Actor, AuditRecord, AuditStatus, RequestContext, ResourceRef};
use crate::services::AuditLogService;
use crate::storage::{AuditStore, PageRequest, SearchCriteria};

/// Who is acting, taken from flags or the environment
#[derive(Args, Debug, Clone)]
pub struct ActorArgs {
    /// Acting user's id
    #[arg(long, env = "ERP_AUDIT_USER_ID")]
    pub user_id: u64,
    /// Acting user's name
    #[arg(long, env = "ERP_AUDIT_USERNAME")]
    pub username: String,
}

impl ActorArgs {
    fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.username.clone())
    }
}

/// Search filters shared by `list` and `export`
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only records by this user id
    #[arg(long = "user")]
    pub user_id: Option<u64>,
    /// Username substring (case-insensitive)
    #[arg(long)]
    pub username: Option<String>,
    /// Action code (e.g. CREATE, UPDATE, DELETE)
    #[arg(short, long)]
    pub action: Option<String>,
    /// Resource type (exact)
    #[arg(short = 't', long)]
    pub resource_type: Option<String>,
    /// Resource id (exact)
    #[arg(long)]
    pub resource_id: Option<String>,
    /// Outcome (success, failed)
    #[arg(long)]
    pub status: Option<String>,
    /// Caller IP address (exact)
    #[arg(long)]
    pub ip: Option<String>,
    /// Earliest creation time (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<String>,
    /// Latest creation time (RFC 3339 or YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub until: Option<String>,
    /// Text in the description or request path (case-insensitive)
    #[arg(short, long)]
    pub search: Option<String>,
}

impl FilterArgs {
    /// Convert the flags into search criteria
    pub fn to_criteria(&self) -> AuditResult<SearchCriteria> {
        let status = self
            .status
            .as_deref()
            .map(|s| {
                AuditStatus::parse(s).ok_or_else(|| {
                    AuditError::Validation(format!(
                        "Invalid status: '{}'. Valid statuses: success, failed",
                        s
                    ))
                })
            })
            .transpose()?;

        Ok(SearchCriteria {
            user_id: self.user_id,
            username: self.username.clone(),
            action: self.action.as_deref().map(Action::parse),
            resource_type: self.resource_type.clone(),
            resource_id: self.resource_id.clone(),
            status,
            ip_address: self.ip.clone(),
            start: self.since.as_deref().map(|s| parse_time(s, false)).transpose()?,
            end: self.until.as_deref().map(|s| parse_time(s, true)).transpose()?,
            text: self.search.clone(),
        })
    }
}

/// Page selection
#[derive(Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// Page number, starting at 1
    #[arg(short, long)]
    pub page: Option<u32>,
    /// Records per page (clamped to the configured maximum)
    #[arg(long)]
    pub page_size: Option<u32>,
}

impl PageArgs {
    fn request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Audit subcommands
#[derive(Subcommand)]
pub enum AuditCommands {
    /// Record a successful action
    Record {
        #[command(flatten)]
        actor: ActorArgs,
        /// Action code (e.g. CREATE, UPDATE, POST_JOURNAL)
        action: String,
        /// Resource type (e.g. customer, invoice)
        resource_type: String,
        /// Resource id
        resource_id: String,
        /// Human-readable description (generated if omitted)
        #[arg(short, long, default_value = "")]
        description: String,
        /// State before the action, as JSON or @file
        #[arg(long)]
        before: Option<String>,
        /// State after the action, as JSON or @file
        #[arg(long)]
        after: Option<String>,
        /// Request method
        #[arg(long)]
        method: Option<String>,
        /// Request path
        #[arg(long)]
        path: Option<String>,
        /// Caller IP address
        #[arg(long)]
        ip: Option<String>,
        /// Caller user agent
        #[arg(long)]
        user_agent: Option<String>,
        /// Print the stored record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a failed action
    Fail {
        #[command(flatten)]
        actor: ActorArgs,
        /// Action code
        action: String,
        /// Resource type
        resource_type: String,
        /// Resource id
        resource_id: String,
        /// Error message
        #[arg(short, long)]
        error: String,
        /// How long the action ran before failing
        #[arg(long, default_value = "0")]
        duration_ms: u64,
        /// Print the stored record as JSON
        #[arg(long)]
        json: bool,
    },
    /// List audit records, newest first
    List {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        page: PageArgs,
        /// Print the page envelope as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one audit record
    Show {
        /// Record id (with or without the aud- prefix)
        id: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List everything one user did
    ByActor {
        /// User id
        user_id: u64,
        #[command(flatten)]
        page: PageArgs,
        /// Print the page envelope as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the history of one entity
    ByResource {
        /// Resource type
        resource_type: String,
        /// Resource id
        resource_id: String,
        #[command(flatten)]
        page: PageArgs,
        /// Print the page envelope as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete records older than a number of days
    Cleanup {
        /// Retention in days (defaults to the configured retention)
        #[arg(long, allow_negative_numbers = true)]
        days: Option<i64>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the changes between two JSON documents
    Diff {
        /// Before document, as JSON or @file
        before: String,
        /// After document, as JSON or @file
        after: String,
        /// Descend into nested objects and arrays
        #[arg(long)]
        deep: bool,
        /// Prefix for every reported path
        #[arg(long, default_value = "")]
        prefix: String,
        /// Print the change-set as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export matching records
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output format (json, yaml, csv)
        #[arg(short, long, default_value = "json")]
        format: String,
        /// Output file (stdout if omitted; the format's extension is added if missing)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Handle an audit command
pub fn handle_audit_command<S: AuditStore + ?Sized>(
    store: &S,
    settings: &Settings,
    cmd: AuditCommands,
) -> AuditResult<()> {
    let service = AuditLogService::new(store, settings);

    match cmd {
        AuditCommands::Record {
            actor,
            action,
            resource_type,
            resource_id,
            description,
            before,
            after,
            method,
            path,
            ip,
            user_agent,
            json,
        } => {
            let before = snapshot_arg(before.as_deref())?;
            let after = snapshot_arg(after.as_deref())?;
            let context = RequestContext {
                method,
                path,
                ip_address: ip,
                user_agent,
            };

            let recorder = AuditRecorder::from_settings(store, settings);
            let record = recorder.log_action_with_context(
                &actor.actor(),
                Action::parse(&action),
                &ResourceRef::new(resource_type, resource_id),
                &description,
                &before,
                &after,
                &context,
            )?;

            print_recorded(record, json)?;
        }

        AuditCommands::Fail {
            actor,
            action,
            resource_type,
            resource_id,
            error,
            duration_ms,
            json,
        } => {
            let recorder = AuditRecorder::from_settings(store, settings);
            let record = recorder.log_error(
                &actor.actor(),
                Action::parse(&action),
                &ResourceRef::new(resource_type, resource_id),
                &error,
                duration_ms,
            )?;

            print_recorded(record, json)?;
        }

        AuditCommands::List {
            filters,
            page,
            json,
        } => {
            let result = service.list(&filters.to_criteria()?, &page.request())?;
            if json {
                print_json(&result)?;
            } else {
                print!("{}", format_record_page(&result));
            }
        }

        AuditCommands::Show { id, json } => {
            let record = service.get_by_str(&id)?;
            if json {
                print_json(&record)?;
            } else {
                print!("{}", format_record_details(&record));
            }
        }

        AuditCommands::ByActor {
            user_id,
            page,
            json,
        } => {
            let result = service.by_actor(user_id, &page.request())?;
            if json {
                print_json(&result)?;
            } else {
                print!("{}", format_record_page(&result));
            }
        }

        AuditCommands::ByResource {
            resource_type,
            resource_id,
            page,
            json,
        } => {
            let result = service.by_resource(&resource_type, &resource_id, &page.request())?;
            if json {
                print_json(&result)?;
            } else {
                println!("History of {}/{}", resource_type, resource_id);
                print!("{}", format_record_page(&result));
            }
        }

        AuditCommands::Cleanup { days, json } => {
            let report = match days {
                Some(days) => service.cleanup(days)?,
                None => service.cleanup_default()?,
            };

            if json {
                print_json(&report)?;
            } else {
                println!(
                    "Deleted {} audit record(s) older than {} days (before {})",
                    report.deleted,
                    report.retention_days,
                    report.cutoff.format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
        }

        AuditCommands::Diff {
            before,
            after,
            deep,
            prefix,
            json,
        } => {
            let before = json_arg(&before)?;
            let after = json_arg(&after)?;
            let depth = if deep {
                DiffDepth::Deep
            } else {
                settings.diff_depth
            };

            let changes = diff_with_depth(&before, &after, &prefix, depth);
            if json {
                print_json(&changes)?;
            } else {
                print!("{}", format_change_set(&changes));
            }
        }

        AuditCommands::Export {
            filters,
            format,
            output,
        } => {
            let format = ExportFormat::parse(&format).ok_or_else(|| {
                AuditError::Validation(format!(
                    "Invalid export format: '{}'. Valid formats: json, yaml, csv",
                    format
                ))
            })?;

            let criteria = filters.to_criteria()?;
            let records = service.collect_all(&criteria)?;
            let export = AuditExport::new(records, criteria);

            match output {
                Some(path) => {
                    let path = format.output_path(&path);
                    let file = File::create(&path).map_err(|e| {
                        AuditError::Export(format!("Failed to create {}: {}", path.display(), e))
                    })?;
                    let mut writer = BufWriter::new(file);
                    write_export(&export, format, &mut writer)?;
                    writer
                        .flush()
                        .map_err(|e| AuditError::Export(e.to_string()))?;
                    drop(writer);

                    let verified = verify_export(&path, format)?;
                    if let Some(count) = verified {
                        if count != export.record_count {
                            return Err(AuditError::Export(format!(
                                "{} holds {} records, expected {}",
                                path.display(),
                                count,
                                export.record_count
                            )));
                        }
                    }

                    println!(
                        "Exported {} audit record(s) to {}{}",
                        export.record_count,
                        path.display(),
                        if verified.is_some() { " (verified)" } else { "" }
                    );
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut handle = stdout.lock();
                    write_export(&export, format, &mut handle)?;
                }
            }
        }
    }

    Ok(())
}

fn print_recorded(record: Option<AuditRecord>, json: bool) -> AuditResult<()> {
    match record {
        Some(record) if json => print_json(&record),
        Some(record) => {
            println!("Recorded audit record: {}", record.id);
            println!("  {}", record.format_human_readable());
            Ok(())
        }
        None => {
            eprintln!("Warning: the audit record could not be stored and was dropped");
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> AuditResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Read a JSON argument given inline or as `@path`
fn json_arg(arg: &str) -> AuditResult<Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| AuditError::Io(format!("Failed to read {}: {}", path, e)))?,
        None => arg.to_string(),
    };

    serde_json::from_str(&text)
        .map_err(|e| AuditError::Validation(format!("Invalid JSON document: {}", e)))
}

fn snapshot_arg(arg: Option<&str>) -> AuditResult<Snapshot> {
    match arg {
        Some(arg) => Ok(Snapshot::from_value(json_arg(arg)?)),
        None => Ok(Snapshot::none()),
    }
}

/// Parse a timestamp; bare dates cover the whole day
fn parse_time(value: &str, end_of_day: bool) -> AuditResult<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    let invalid = || {
        AuditError::Validation(format!(
            "Invalid time: '{}'. Use RFC 3339 (2024-01-31T12:00:00Z) or YYYY-MM-DD",
            value
        ))
    };

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    let naive = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
    .ok_or_else(invalid)?;

    Ok(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn test_parse_time_formats() {
        let start = parse_time("2024-03-01", false).unwrap();
        assert_eq!((start.year(), start.month(), start.day()), (2024, 3, 1));
        assert_eq!(start.hour(), 0);

        let end = parse_time("2024-03-01", true).unwrap();
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));

        let exact = parse_time("2024-03-01T10:30:00+02:00", false).unwrap();
        assert_eq!(exact.hour(), 8);

        assert!(parse_time("yesterday", false).unwrap_err().is_validation());
    }

    #[test]
    fn test_filter_conversion() {
        let filters = FilterArgs {
            action: Some("delete".into()),
            resource_type: Some("USER".into()),
            status: Some("failed".into()),
            since: Some("2024-01-01".into()),
            ..FilterArgs::default()
        };

        let criteria = filters.to_criteria().unwrap();
        assert_eq!(criteria.action, Some(Action::Delete));
        assert_eq!(criteria.resource_type.as_deref(), Some("USER"));
        assert_eq!(criteria.status, Some(AuditStatus::Failed));
        assert!(criteria.start.is_some());
        assert!(criteria.end.is_none());
    }

    #[test]
    fn test_invalid_status_rejected() {
        let filters = FilterArgs {
            status: Some("pending".into()),
            ..FilterArgs::default()
        };
        assert!(filters.to_criteria().unwrap_err().is_validation());
    }

    #[test]
    fn test_json_arg_inline_and_file() {
        assert_eq!(json_arg(r#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert!(json_arg("{not json").unwrap_err().is_validation());

        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("before.json");
        std::fs::write(&path, r#"[1, 2]"#).unwrap();
        assert_eq!(
            json_arg(&format!("@{}", path.display())).unwrap(),
            json!([1, 2])
        );
    }

    #[test]
    fn test_snapshot_arg() {
        assert_eq!(snapshot_arg(None).unwrap(), Snapshot::none());
        assert_eq!(
            snapshot_arg(Some("3")).unwrap(),
            Snapshot::from_value(json!(3))
        );
    }
}
