//! Transaction command implementations

use anyhow::{Context, Result};
use chrono::Utc;
use tally_core::db::{Database, TransactionFilter};
use tally_core::models::{parse_transaction_date, NewTransaction, Transaction, TransactionType};

use super::{parse_date_arg, truncate};

/// Arguments for `tally add`
#[derive(Debug, Default)]
pub struct AddArgs {
    pub business: String,
    pub tx_type: String,
    pub amount: f64,
    pub date: Option<String>,
    pub cost: Option<f64>,
    pub students: Option<u32>,
    pub clients: Option<u32>,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
}

fn format_amount(tx: &Transaction) -> String {
    match tx.tx_type {
        TransactionType::Revenue => format!("\x1b[32m+{:.2}\x1b[0m", tx.amount), // Green for revenue
        TransactionType::Expense => format!("\x1b[31m-{:.2}\x1b[0m", tx.amount), // Red for expenses
    }
}

pub fn cmd_add(db: &Database, args: AddArgs) -> Result<Transaction> {
    let tx_type: TransactionType = args
        .tx_type
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let date = match args.date.as_deref() {
        Some(s) => parse_transaction_date(s)?,
        None => Utc::now().naive_utc(),
    };

    let new_tx = NewTransaction {
        business_id: args.business,
        tx_type,
        category: args.category,
        amount: args.amount,
        cost: args.cost,
        students: args.students,
        clients: args.clients,
        date,
        notes: args.notes,
        payment_method: args.payment_method,
    };

    let result = db
        .add_transaction(&new_tx)
        .context("Failed to record transaction")?;
    db.log_audit(
        "cli",
        "create",
        Some("transaction"),
        Some(result.transaction.id),
        None,
    )?;

    let tx = result.transaction;
    println!(
        "✅ Recorded transaction {}: {} │ {} │ {} │ {}",
        tx.id,
        tx.date.format("%Y-%m-%d"),
        tx.business_id,
        tx.tx_type,
        format_amount(&tx)
    );
    if let Some(cost) = tx.cost {
        println!("   Cost: {:.2} (counted as expense)", cost);
    }

    if !result.aggregates_refreshed {
        println!("   ⚠️  Monthly aggregates could not be refreshed. Run 'tally rebuild'.");
    }

    Ok(tx)
}

pub fn cmd_transactions_list(
    db: &Database,
    limit: i64,
    business: Option<&str>,
    tx_type: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    let tx_type = tx_type
        .map(|s| s.parse::<TransactionType>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;
    let start = parse_date_arg(from, "from")?;
    let end = parse_date_arg(to, "to")?;

    let filter = TransactionFilter::new()
        .business_id(business)
        .tx_type(tx_type)
        .date_range(start, end);

    let transactions = db.list_transactions(&filter.page(Some(limit.max(1)), None))?;

    if transactions.is_empty() {
        println!("No transactions found. Record one with:");
        println!("  tally add --business courses --type revenue --amount 1200");
        return Ok(());
    }

    let total = db.count_transactions(&filter)?;

    println!();
    println!("📝 Recent Transactions ({} of {})", transactions.len(), total);
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        println!(
            "   [{}] {} │ {:<14} │ {:>10} │ {}",
            tx.id,
            tx.date.format("%Y-%m-%d"),
            truncate(&tx.business_id, 14),
            format_amount(&tx),
            truncate(tx.category.as_deref().unwrap_or(""), 30)
        );
    }

    Ok(())
}

pub fn cmd_delete(db: &Database, id: i64) -> Result<()> {
    let tx = db
        .get_transaction(id)?
        .ok_or_else(|| anyhow::anyhow!("Transaction {} not found", id))?;

    db.delete_transaction(id)?;
    db.log_audit("cli", "delete", Some("transaction"), Some(id), None)?;

    println!("✅ Deleted transaction {}:", id);
    println!(
        "   {} │ {} │ {}",
        tx.date.format("%Y-%m-%d"),
        tx.business_id,
        format_amount(&tx)
    );
    println!("   Monthly aggregates refreshed.");

    Ok(())
}

pub fn cmd_rebuild(db: &Database) -> Result<()> {
    println!("🔄 Recomputing monthly aggregates...");

    let aggregates = db
        .recompute_aggregates()
        .context("Failed to recompute aggregates")?;
    db.log_audit(
        "cli",
        "rebuild",
        Some("monthly_aggregates"),
        None,
        Some(&format!("buckets={}", aggregates.len())),
    )?;

    println!("✅ Rebuilt {} monthly bucket(s)", aggregates.len());

    Ok(())
}
