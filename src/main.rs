use anyhow::Result;
use clap::{Parser, Subcommand};

use erp_audit::cli::{handle_audit_command, AuditCommands};
use erp_audit::config::{AuditPaths, Settings};
use erp_audit::logging::init_logging;
use erp_audit::storage::{AuditStore, JsonAuditStore};

#[derive(Parser)]
#[command(
    name = "erp-audit",
    version,
    about = "Audit and change-tracking engine for ERP back-ends",
    long_about = "erp-audit records who did what to which business entity, \
                  with before/after state and the exact fields that changed, \
                  and answers questions about that trail."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record, query, clean up, and export the audit trail
    #[command(subcommand)]
    Audit(AuditCommands),

    /// Write default settings and create the data directory
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    let paths = AuditPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Some(Commands::Audit(cmd)) => {
            let store = JsonAuditStore::open(paths.audit_log(), settings.pagination.clone())?;
            handle_audit_command(&store, &settings, cmd)?;
        }
        Some(Commands::Init) => {
            println!("Initializing erp-audit at: {}", paths.base_dir().display());
            settings.save(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Settings written to {}", paths.settings_file().display());
            println!("Audit log:          {}", paths.audit_log().display());
        }
        Some(Commands::Config) => {
            let store = JsonAuditStore::open(paths.audit_log(), settings.pagination.clone())?;

            println!("erp-audit Configuration");
            println!("=======================");
            println!("Base directory: {}", paths.base_dir().display());
            println!("Settings file:  {}", paths.settings_file().display());
            println!("Audit log:      {}", paths.audit_log().display());
            println!("Initialized:    {}", paths.is_initialized());
            println!("Records stored: {}", store.count()?);
            println!();
            println!("Settings:");
            println!(
                "  Page size:        {} (max {})",
                settings.pagination.default_page_size, settings.pagination.max_page_size
            );
            println!("  Retention:        {} days", settings.retention.default_days);
            println!("  Failure policy:   {:?}", settings.failure_policy);
            println!("  Diff depth:       {:?}", settings.diff_depth);
        }
        None => {
            println!("erp-audit - Audit and change-tracking engine");
            println!();
            println!("Run 'erp-audit --help' for usage information.");
        }
    }

    Ok(())
}
