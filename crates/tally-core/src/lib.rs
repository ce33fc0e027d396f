//! Tally Core Library
//!
//! Shared functionality for the Tally bookkeeping service:
//! - Domain models (transactions, monthly aggregates, forecasts, employees)
//! - Monthly aggregation of transactions per business
//! - Naive average-growth forecasting
//! - Dashboard and summary reports over stored aggregates
//! - Database access and migrations
//! - Master password gate and session tokens
//! - CSV export and full JSON backups

pub mod aggregate;
pub mod auth;
pub mod db;
pub mod error;
pub mod export;
pub mod forecast;
pub mod models;
pub mod reports;

pub use aggregate::aggregate;
pub use auth::PasswordGate;
pub use db::{AuditEntry, Database, TransactionAddResult};
pub use error::{Error, Result};
pub use export::{FullBackup, ImportStats};
pub use forecast::forecast;
pub use models::{
    Confidence, Employee, ForecastResult, MonthlyAggregate, NewEmployee, NewTransaction,
    Transaction, TransactionType,
};
pub use reports::{BusinessTotals, Dashboard, ReportPeriod, SummaryReport};
