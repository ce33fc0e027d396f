//! Export functionality for transactions and full backups
//!
//! Supports:
//! - Transaction CSV export with the same filters as the transaction list
//! - Full JSON backup of transactions and employees, and restore

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{format_datetime, insert_employee_row, insert_transaction_row, Database, TransactionFilter};
use crate::error::{Error, Result};
use crate::models::{Employee, NewEmployee, NewTransaction, Transaction};

/// Backup format version written into every backup
pub const BACKUP_VERSION: &str = "1";

/// Export format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

/// One CSV line
#[derive(Serialize)]
struct CsvRow<'a> {
    date: String,
    #[serde(rename = "businessId")]
    business_id: &'a str,
    #[serde(rename = "type")]
    tx_type: &'static str,
    category: Option<&'a str>,
    amount: f64,
    cost: Option<f64>,
    students: Option<u32>,
    clients: Option<u32>,
    notes: Option<&'a str>,
}

/// Write transactions as CSV with a header row
pub fn write_transactions_csv<W: Write>(transactions: &[Transaction], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for tx in transactions {
        wtr.serialize(CsvRow {
            date: tx.date.format("%Y-%m-%d").to_string(),
            business_id: &tx.business_id,
            tx_type: tx.tx_type.as_str(),
            category: tx.category.as_deref(),
            amount: tx.amount,
            cost: tx.cost,
            students: tx.students,
            clients: tx.clients,
            notes: tx.notes.as_deref(),
        })?;
    }

    // serialize() only writes the header alongside the first record
    if transactions.is_empty() {
        wtr.write_record([
            "date",
            "businessId",
            "type",
            "category",
            "amount",
            "cost",
            "students",
            "clients",
            "notes",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Full backup structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullBackup {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub transactions: Vec<Transaction>,
    pub employees: Vec<Employee>,
}

/// Import statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportStats {
    pub transactions: usize,
    pub employees: usize,
    pub aggregates: usize,
}

impl Database {
    /// Export filtered transactions to CSV, oldest first
    pub fn export_transactions_csv(&self, filter: &TransactionFilter<'_>) -> Result<String> {
        let mut transactions = self.list_transactions(filter)?;
        transactions.reverse();

        let mut buf = Vec::new();
        write_transactions_csv(&transactions, &mut buf)?;

        String::from_utf8(buf).map_err(|e| Error::InvalidData(format!("CSV is not UTF-8: {}", e)))
    }

    /// Export full database backup
    pub fn export_full_backup(&self) -> Result<FullBackup> {
        Ok(FullBackup {
            version: BACKUP_VERSION.to_string(),
            exported_at: Utc::now(),
            transactions: self.all_transactions()?,
            employees: self.list_employees()?,
        })
    }

    /// Restore a full backup, replacing every transaction and employee
    ///
    /// Runs under the write lock: the data swap is one SQLite transaction and
    /// the aggregates are rebuilt before the lock is released. Aggregates are
    /// never read from the backup.
    pub fn import_full_backup(&self, backup: &FullBackup) -> Result<ImportStats> {
        if backup.version != BACKUP_VERSION {
            return Err(Error::InvalidData(format!(
                "Unsupported backup version: {}",
                backup.version
            )));
        }

        let _guard = self.lock_writes();
        let mut stats = ImportStats::default();

        {
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;

            tx.execute_batch(
                r#"
                DELETE FROM transactions;
                DELETE FROM employees;
                "#,
            )?;

            for t in &backup.transactions {
                let new = NewTransaction {
                    business_id: t.business_id.clone(),
                    tx_type: t.tx_type,
                    category: t.category.clone(),
                    amount: t.amount,
                    cost: t.cost,
                    students: t.students,
                    clients: t.clients,
                    date: t.date,
                    notes: t.notes.clone(),
                    payment_method: t.payment_method.clone(),
                };
                new.validate().map_err(|e| {
                    Error::InvalidData(format!("Transaction {} in backup: {}", t.id, e))
                })?;
                let created_at = format_datetime(&t.created_at);
                insert_transaction_row(&tx, Some(t.id), &new, Some(&created_at))?;
                stats.transactions += 1;
            }

            for e in &backup.employees {
                let new = NewEmployee {
                    name: e.name.clone(),
                    role: e.role.clone(),
                    business_id: e.business_id.clone(),
                    monthly_salary: e.monthly_salary,
                    hired_at: e.hired_at,
                    notes: e.notes.clone(),
                };
                new.validate()?;
                let created_at = format_datetime(&e.created_at);
                insert_employee_row(&tx, Some(e.id), &new, Some(&created_at))?;
                stats.employees += 1;
            }

            tx.commit()?;
        }

        stats.aggregates = self.refresh_aggregates_locked()?.len();

        info!(
            transactions = stats.transactions,
            employees = stats.employees,
            aggregates = stats.aggregates,
            "Restored full backup"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_csv_header_and_quoting() {
        let db = Database::in_memory().unwrap();
        let mut tx = NewTransaction::new("abayat_shop", TransactionType::Revenue, 250.0, day(2024, 1, 15))
            .with_cost(40.0);
        tx.notes = Some("black, size M".to_string());
        db.add_transaction(&tx).unwrap();

        let csv = db.export_transactions_csv(&TransactionFilter::new()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,businessId,type,category,amount,cost,students,clients,notes"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-01-15,abayat_shop,revenue,,250.0,40.0,,,\"black, size M\""
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_empty_has_header() {
        let mut buf = Vec::new();
        write_transactions_csv(&[], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("date,businessId,type"));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_csv_respects_filter() {
        let db = Database::in_memory().unwrap();
        db.add_transaction(&NewTransaction::new("a", TransactionType::Revenue, 1.0, day(2024, 1, 1)))
            .unwrap();
        db.add_transaction(&NewTransaction::new("b", TransactionType::Revenue, 2.0, day(2024, 1, 2)))
            .unwrap();

        let csv = db
            .export_transactions_csv(&TransactionFilter::new().business_id(Some("b")))
            .unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains(",b,"));
    }

    #[test]
    fn test_full_backup_restore() {
        let source = Database::in_memory().unwrap();
        source
            .add_transaction(&NewTransaction::new("A", TransactionType::Revenue, 1000.0, day(2024, 1, 15)))
            .unwrap();
        source
            .add_transaction(&NewTransaction::new("A", TransactionType::Expense, 400.0, day(2024, 1, 20)))
            .unwrap();
        source
            .create_employee(&NewEmployee {
                name: "Sara".to_string(),
                monthly_salary: Some(3000.0),
                ..Default::default()
            })
            .unwrap();

        let backup = source.export_full_backup().unwrap();
        let json = serde_json::to_string(&backup).unwrap();
        let parsed: FullBackup = serde_json::from_str(&json).unwrap();

        let target = Database::in_memory().unwrap();
        target
            .add_transaction(&NewTransaction::new("stale", TransactionType::Revenue, 5.0, day(2023, 5, 1)))
            .unwrap();

        let stats = target.import_full_backup(&parsed).unwrap();
        assert_eq!(stats.transactions, 2);
        assert_eq!(stats.employees, 1);
        assert_eq!(stats.aggregates, 1);

        let restored = target.all_transactions().unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].id, backup.transactions[0].id);
        assert!(restored.iter().all(|t| t.business_id == "A"));

        let aggs = target.list_aggregates().unwrap();
        assert_eq!(aggs.len(), 1);
        assert_eq!(aggs[0].net_profit, 600.0);

        assert_eq!(target.list_employees().unwrap()[0].name, "Sara");
    }

    #[test]
    fn test_restore_rejects_unknown_version() {
        let db = Database::in_memory().unwrap();
        let mut backup = db.export_full_backup().unwrap();
        backup.version = "99".to_string();
        assert!(matches!(db.import_full_backup(&backup), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_restore_invalid_backup_keeps_data() {
        let db = Database::in_memory().unwrap();
        db.add_transaction(&NewTransaction::new("A", TransactionType::Revenue, 10.0, day(2024, 1, 1)))
            .unwrap();

        let mut backup = db.export_full_backup().unwrap();
        backup.transactions[0].amount = -1.0;

        assert!(db.import_full_backup(&backup).is_err());
        // The delete was rolled back with the failed insert
        assert_eq!(db.all_transactions().unwrap().len(), 1);
        assert_eq!(db.list_aggregates().unwrap().len(), 1);
    }
}
