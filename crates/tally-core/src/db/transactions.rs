//! Transaction operations
//!
//! Every write that changes the transaction set goes through the write lock
//! and ends with a full aggregate recompute.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{info, warn};

use super::transaction_filter::TransactionFilter;
use super::{parse_datetime, Database};
use crate::aggregate::aggregate;
use crate::error::Result;
use crate::models::{MonthlyAggregate, NewTransaction, Transaction};

/// Storage format for transaction dates; sorts lexically
pub(crate) const TX_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const TRANSACTION_COLUMNS: &str = "id, business_id, type, category, amount, cost, students, \
     clients, date, notes, payment_method, created_at";

/// Outcome of recording a transaction
#[derive(Debug, Clone, Serialize)]
pub struct TransactionAddResult {
    pub transaction: Transaction,
    /// False when the transaction was stored but the aggregate recompute
    /// failed; the previous aggregates are still in place
    pub aggregates_refreshed: bool,
}

/// Raw column values, converted after the row is read so that one bad row
/// does not fail the whole query
struct TransactionRow {
    id: i64,
    business_id: String,
    tx_type: String,
    category: Option<String>,
    amount: f64,
    cost: Option<f64>,
    students: Option<i64>,
    clients: Option<i64>,
    date: String,
    notes: Option<String>,
    payment_method: Option<String>,
    created_at: String,
}

impl TransactionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            business_id: row.get(1)?,
            tx_type: row.get(2)?,
            category: row.get(3)?,
            amount: row.get(4)?,
            cost: row.get(5)?,
            students: row.get(6)?,
            clients: row.get(7)?,
            date: row.get(8)?,
            notes: row.get(9)?,
            payment_method: row.get(10)?,
            created_at: row.get(11)?,
        })
    }

    fn into_transaction(self) -> Option<Transaction> {
        let date = match NaiveDateTime::parse_from_str(&self.date, TX_DATE_FORMAT) {
            Ok(date) => date,
            Err(_) => {
                warn!(transaction_id = self.id, date = %self.date, "Skipping transaction with unreadable date");
                return None;
            }
        };
        let tx_type = match self.tx_type.parse() {
            Ok(t) => t,
            Err(_) => {
                warn!(transaction_id = self.id, tx_type = %self.tx_type, "Skipping transaction with unknown type");
                return None;
            }
        };

        Some(Transaction {
            id: self.id,
            business_id: self.business_id,
            tx_type,
            category: self.category,
            amount: self.amount,
            cost: self.cost,
            students: self.students.and_then(|n| u32::try_from(n).ok()),
            clients: self.clients.and_then(|n| u32::try_from(n).ok()),
            date,
            notes: self.notes,
            payment_method: self.payment_method,
            created_at: parse_datetime(&self.created_at),
        })
    }
}

/// Insert on an existing connection (shared with backup restore)
pub(crate) fn insert_transaction_row(
    conn: &Connection,
    id: Option<i64>,
    tx: &NewTransaction,
    created_at: Option<&str>,
) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO transactions (id, business_id, type, category, amount, cost, students, clients, date, notes, payment_method, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP))
        "#,
        params![
            id,
            tx.business_id.trim(),
            tx.tx_type.as_str(),
            tx.category,
            tx.amount,
            tx.cost,
            tx.students,
            tx.clients,
            tx.date.format(TX_DATE_FORMAT).to_string(),
            tx.notes,
            tx.payment_method,
            created_at,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Record a transaction and rebuild the aggregates from scratch
    ///
    /// Validation errors are returned before anything is written. Once the
    /// raw record is stored the call succeeds; a failed recompute is logged
    /// and reported through `aggregates_refreshed`.
    pub fn add_transaction(&self, tx: &NewTransaction) -> Result<TransactionAddResult> {
        tx.validate()?;

        let _guard = self.lock_writes();

        let id = {
            let conn = self.conn()?;
            insert_transaction_row(&conn, None, tx, None)?
        };

        let aggregates_refreshed = match self.refresh_aggregates_locked() {
            Ok(_) => true,
            Err(e) => {
                warn!(transaction_id = id, error = %e, "Aggregate recompute failed, keeping previous aggregates");
                false
            }
        };

        let transaction = self.get_transaction(id)?.ok_or_else(|| {
            crate::error::Error::NotFound(format!("Transaction {} vanished after insert", id))
        })?;

        info!(
            transaction_id = id,
            business_id = %transaction.business_id,
            tx_type = %transaction.tx_type,
            aggregates_refreshed,
            "Recorded transaction"
        );

        Ok(TransactionAddResult {
            transaction,
            aggregates_refreshed,
        })
    }

    /// Get a transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                &format!("SELECT {} FROM transactions WHERE id = ?", TRANSACTION_COLUMNS),
                params![id],
                TransactionRow::from_row,
            )
            .optional()?;

        Ok(row.and_then(TransactionRow::into_transaction))
    }

    /// List transactions matching a filter, newest first
    pub fn list_transactions(&self, filter: &TransactionFilter<'_>) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let built = filter.build();

        let sql = format!(
            "SELECT {} FROM transactions {} ORDER BY date DESC, id DESC {}",
            TRANSACTION_COLUMNS, built.where_clause, built.page_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            built.params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), TransactionRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(TransactionRow::into_transaction)
            .collect())
    }

    /// Count transactions matching a filter (paging is ignored)
    pub fn count_transactions(&self, filter: &TransactionFilter<'_>) -> Result<i64> {
        let conn = self.conn()?;
        let built = filter.page(None, None).build();

        let sql = format!("SELECT COUNT(*) FROM transactions {}", built.where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            built.params.iter().map(|p| p.as_ref()).collect();

        Ok(conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))?)
    }

    /// Every readable transaction in insertion order
    pub fn all_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions ORDER BY id",
            TRANSACTION_COLUMNS
        ))?;

        let rows = stmt
            .query_map([], TransactionRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(TransactionRow::into_transaction)
            .collect())
    }

    /// Delete a transaction and rebuild aggregates
    ///
    /// Returns false when no such transaction exists.
    pub fn delete_transaction(&self, id: i64) -> Result<bool> {
        let _guard = self.lock_writes();

        let deleted = {
            let conn = self.conn()?;
            conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?
        };

        if deleted == 0 {
            return Ok(false);
        }

        if let Err(e) = self.refresh_aggregates_locked() {
            warn!(transaction_id = id, error = %e, "Aggregate recompute failed after delete, keeping previous aggregates");
        }

        info!(transaction_id = id, "Deleted transaction");
        Ok(true)
    }

    /// Rebuild the aggregate snapshot from every stored transaction
    pub fn recompute_aggregates(&self) -> Result<Vec<MonthlyAggregate>> {
        let _guard = self.lock_writes();
        self.refresh_aggregates_locked()
    }

    /// Reload, aggregate and replace; the caller must hold the write lock
    pub(crate) fn refresh_aggregates_locked(&self) -> Result<Vec<MonthlyAggregate>> {
        let transactions = self.all_transactions()?;
        let aggregates = aggregate(&transactions);
        self.replace_aggregates(&aggregates)?;
        Ok(aggregates)
    }
}
