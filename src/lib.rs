//! erp-audit - Audit and change-tracking engine for ERP back-ends
//!
//! Records who performed which action on which business entity, with the
//! entity's state before and after and the exact fields that changed, and
//! answers questions about that trail later.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `audit`: Diff engine, entity snapshots, and the audit recorder
//! - `storage`: The `AuditStore` trait and its JSON Lines backend
//! - `services`: Query and retention service over a store
//! - `models`: Audit records, actors, resources, and action codes
//! - `config`: Path resolution and engine settings
//! - `error`: Custom error types
//! - `export`: JSON, YAML, and CSV exports
//! - `display`: Terminal formatting
//! - `cli`: Command handlers for the `erp-audit` binary
//! - `logging`: `tracing` subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use erp_audit::audit::{AuditRecorder, Snapshot};
//! use erp_audit::config::{AuditPaths, Settings};
//! use erp_audit::models::{Action, Actor, ResourceRef};
//! use erp_audit::storage::JsonAuditStore;
//!
//! let paths = AuditPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let store = JsonAuditStore::open(paths.audit_log(), settings.pagination.clone())?;
//!
//! let recorder = AuditRecorder::from_settings(&store, &settings);
//! recorder.log_action(
//!     &Actor::new(7, "alice"),
//!     Action::Delete,
//!     &ResourceRef::new("customer", "42"),
//!     "Removed duplicate customer",
//!     &Snapshot::of(&customer),
//!     &Snapshot::none(),
//! )?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{AuditError, AuditResult};
