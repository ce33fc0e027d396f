//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Database setup and status, shared utilities (open_db)
//! - `employees` - Employee management commands
//! - `export` - CSV export, full backup export and restore
//! - `reports` - Aggregates, forecast, summary report and dashboard
//! - `serve` - Web server command
//! - `transactions` - Transaction commands (add, list, delete, rebuild)

pub mod core;
pub mod employees;
pub mod export;
pub mod reports;
pub mod serve;
pub mod transactions;

// Re-export command functions for main.rs
pub use core::*;
pub use employees::*;
pub use export::*;
pub use reports::*;
pub use serve::*;
pub use transactions::*;

use anyhow::{Context, Result};
use chrono::NaiveDate;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Parse an optional `--flag YYYY-MM-DD` argument
pub fn parse_date_arg(value: Option<&str>, flag: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .with_context(|| format!("Invalid --{} date format (use YYYY-MM-DD)", flag))
}
