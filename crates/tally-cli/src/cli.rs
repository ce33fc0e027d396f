//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Bookkeeping for small businesses
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Self-hosted bookkeeping with monthly aggregates and forecasts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Show database status (encryption, record counts)
    Status,

    /// Record a transaction and refresh monthly aggregates
    Add {
        /// Business the transaction belongs to (e.g. courses, abayat_shop)
        #[arg(short, long)]
        business: String,

        /// Transaction type: revenue or expense
        #[arg(short = 't', long = "type")]
        tx_type: String,

        /// Amount (must be positive)
        #[arg(short, long)]
        amount: f64,

        /// Date (YYYY-MM-DD or YYYY-MM-DDTHH:MM, defaults to now)
        #[arg(short, long)]
        date: Option<String>,

        /// Cost attached to the transaction, always counted as an expense
        #[arg(long)]
        cost: Option<f64>,

        /// Number of students (revenue only)
        #[arg(long)]
        students: Option<u32>,

        /// Number of clients (revenue only)
        #[arg(long)]
        clients: Option<u32>,

        /// Free-form category
        #[arg(short, long)]
        category: Option<String>,

        /// Notes
        #[arg(long)]
        notes: Option<String>,

        /// Payment method (cash, card, transfer...)
        #[arg(long)]
        payment_method: Option<String>,
    },

    /// List recent transactions
    Transactions {
        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Filter by business
        #[arg(short, long)]
        business: Option<String>,

        /// Filter by type: revenue or expense
        #[arg(short = 't', long = "type")]
        tx_type: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Delete a transaction and refresh monthly aggregates
    Delete {
        /// Transaction ID
        id: i64,
    },

    /// Show stored monthly aggregates
    Aggregates {
        /// Only show one business
        #[arg(short, long)]
        business: Option<String>,
    },

    /// Project next month's revenue and profit
    Forecast,

    /// Summary report grouped by month, quarter or year
    Report {
        /// Grouping: monthly, quarterly, yearly
        #[arg(short, long, default_value = "monthly")]
        period: String,

        /// Only report on one business
        #[arg(short, long)]
        business: Option<String>,
    },

    /// Current month KPIs compared with the previous month
    Dashboard {
        /// Reference day (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Manage employees
    Employees {
        #[command(subcommand)]
        action: Option<EmployeesAction>,
    },

    /// Export transactions (csv) or a full backup (json)
    Export {
        /// Output format: csv (transactions) or json (full backup)
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Filter CSV export by business
        #[arg(short, long)]
        business: Option<String>,

        /// CSV start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// CSV end date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Restore a full JSON backup, replacing all existing data
    ImportBackup {
        /// Backup file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Recompute every monthly aggregate from the stored transactions
    Rebuild,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires a session obtained with the master
        /// password from TALLY_MASTER_PASSWORD.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Comma-separated CORS origins allowed to call the API
        #[arg(long, env = "TALLY_ALLOWED_ORIGINS", value_delimiter = ',')]
        allowed_origins: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum EmployeesAction {
    /// List employees
    List,

    /// Add an employee
    Add {
        /// Full name
        name: String,

        /// Role or job title
        #[arg(short, long)]
        role: Option<String>,

        /// Business the employee works for
        #[arg(short, long)]
        business: Option<String>,

        /// Monthly salary
        #[arg(short, long)]
        salary: Option<f64>,

        /// Hire date (YYYY-MM-DD)
        #[arg(long)]
        hired: Option<String>,
    },

    /// Remove an employee
    Remove {
        /// Employee ID
        id: i64,
    },
}
