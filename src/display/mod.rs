//! Display formatting for terminal output
//!
//! Provides utilities for formatting audit records for terminal display,
//! including tables and detail views.

pub mod audit;

pub use audit::{format_change_set, format_record_details, format_record_page};
