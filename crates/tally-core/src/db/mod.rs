//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `transactions` - Transaction storage and the add/recompute flow
//! - `aggregates` - Stored monthly aggregate snapshot
//! - `employees` - Employee CRUD
//! - `sessions` - Login sessions for the master password gate
//! - `audit` - Audit log

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};

mod aggregates;
mod audit;
mod employees;
mod sessions;
mod transaction_filter;
mod transactions;

pub use sessions::NewSession;
pub use transaction_filter::{FilterResult, TransactionFilter};
pub use transactions::TransactionAddResult;

pub(crate) use employees::insert_employee_row;
pub(crate) use transactions::insert_transaction_row;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "TALLY_DB_KEY";

/// Format used for every timestamp column (matches SQLite's CURRENT_TIMESTAMP)
pub(crate) const SQL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"tally-salt-v1-ab";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(s, SQL_DATETIME_FORMAT)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(SQL_DATETIME_FORMAT).to_string()
}

/// Database wrapper with connection pooling
///
/// Clones share the pool and the write lock.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
    /// Held across append, reload, aggregate and replace so concurrent
    /// writers never interleave their recomputes
    write_lock: Arc<Mutex<()>>,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `TALLY_DB_KEY` environment variable to be set.
    /// Use `new_unencrypted()` for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key = derive_key(pass)?;
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", key);

            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&key_pragma)?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
            write_lock: Arc::new(Mutex::new(())),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because every pooled
    /// connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "tally_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Take the write lock
    ///
    /// A panic while holding the lock leaves no partial state behind (every
    /// write is its own SQLite transaction), so a poisoned lock is reused.
    pub(crate) fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Row counts for status output
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<i64> {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?)
        };

        Ok(DatabaseStats {
            transactions: count("transactions")?,
            aggregates: count("monthly_aggregates")?,
            employees: count("employees")?,
            active_sessions: conn.query_row(
                "SELECT COUNT(*) FROM sessions WHERE expires_at > datetime('now')",
                [],
                |row| row.get(0),
            )?,
        })
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- WAL mode: readers don't block the aggregate rewrite
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Raw transactions (source of truth for aggregates)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                business_id TEXT NOT NULL,
                type TEXT NOT NULL,                        -- revenue, expense
                category TEXT,
                amount REAL NOT NULL,
                cost REAL,
                students INTEGER,
                clients INTEGER,
                date TEXT NOT NULL,                        -- YYYY-MM-DDTHH:MM:SS
                notes TEXT,
                payment_method TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_business ON transactions(business_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);

            -- Derived monthly aggregates, rewritten wholesale on every recompute
            CREATE TABLE IF NOT EXISTS monthly_aggregates (
                position INTEGER NOT NULL,                  -- order in the aggregate sequence
                business_id TEXT NOT NULL,
                year INTEGER NOT NULL,
                month INTEGER NOT NULL,
                total_revenue REAL NOT NULL,
                total_expenses REAL NOT NULL,
                net_profit REAL NOT NULL,
                students_count INTEGER NOT NULL,
                clients_count INTEGER NOT NULL,
                transactions_count INTEGER NOT NULL,
                avg_ticket REAL NOT NULL,
                growth_vs_prev REAL,
                business_growth_vs_prev REAL,
                computed_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (business_id, year, month)
            );

            CREATE INDEX IF NOT EXISTS idx_monthly_aggregates_position ON monthly_aggregates(position);

            -- Employees
            CREATE TABLE IF NOT EXISTS employees (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                role TEXT,
                business_id TEXT,
                monthly_salary REAL,
                hired_at DATE,
                notes TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Login sessions (only the SHA-256 of the token is stored)
            CREATE TABLE IF NOT EXISTS sessions (
                token_hash TEXT PRIMARY KEY,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                expires_at DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);

            -- Audit log
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                actor TEXT NOT NULL,
                action TEXT NOT NULL,
                entity_type TEXT,
                entity_id INTEGER,
                details TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp);
            "#,
        )?;

        info!("Database migrations complete");
        Ok(())
    }
}

/// Row counts across the main tables
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub transactions: i64,
    pub aggregates: i64,
    pub employees: i64,
    pub active_sessions: i64,
}

/// Audit log entry
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub actor: String,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
}
