//! Export and backup restore commands

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tally_core::db::{Database, TransactionFilter};
use tally_core::export::ExportFormat;
use tally_core::FullBackup;

use super::parse_date_arg;

/// Export transactions as CSV, or the whole database as a JSON backup
pub fn cmd_export(
    db: &Database,
    format: &str,
    output: Option<&Path>,
    business: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    let format: ExportFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    match format {
        ExportFormat::Csv => {
            let filter = TransactionFilter::new()
                .business_id(business)
                .date_range(parse_date_arg(from, "from")?, parse_date_arg(to, "to")?);
            let csv = db.export_transactions_csv(&filter)?;
            db.log_audit(
                "cli",
                "export_transactions",
                Some("transaction"),
                None,
                Some(&format!("format=csv, business={:?}", business)),
            )?;

            match output {
                Some(path) => {
                    write_file(path, &csv)?;
                    let lines = csv.lines().count().saturating_sub(1); // Subtract header
                    println!("✅ Exported {} transactions to {}", lines, path.display());
                }
                None => print!("{}", csv),
            }
        }
        ExportFormat::Json => {
            let backup = db.export_full_backup()?;
            let json = serde_json::to_string_pretty(&backup)
                .context("Failed to serialize backup to JSON")?;
            db.log_audit(
                "cli",
                "export_full",
                None,
                None,
                Some(&format!(
                    "transactions={}, employees={}",
                    backup.transactions.len(),
                    backup.employees.len()
                )),
            )?;

            match output {
                Some(path) => {
                    if path.exists() {
                        anyhow::bail!(
                            "Output file already exists: {}\nUse a different filename or remove the existing file.",
                            path.display()
                        );
                    }
                    write_file(path, &json)?;
                    println!("✅ Full backup exported to: {}", path.display());
                    println!("   Version: {}", backup.version);
                    println!("   Transactions: {}", backup.transactions.len());
                    println!("   Employees: {}", backup.employees.len());
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

/// Restore a full JSON backup, replacing all data
pub fn cmd_import_backup(db: &Database, input: &Path, yes: bool) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Backup file not found: {}", input.display());
    }

    let mut file = File::open(input)
        .with_context(|| format!("Failed to open backup file: {}", input.display()))?;
    let mut json = String::new();
    file.read_to_string(&mut json)
        .context("Failed to read backup file")?;

    let backup: FullBackup =
        serde_json::from_str(&json).context("Failed to parse backup file as JSON")?;

    println!("📦 Importing full backup from: {}", input.display());
    println!("   Version: {}", backup.version);
    println!("   Exported: {}", backup.exported_at);
    println!();

    if !yes {
        let stats = db.get_stats()?;
        println!("⚠️  This will DELETE all existing data before importing.");
        println!(
            "   Transactions: {} → {}",
            stats.transactions,
            backup.transactions.len()
        );
        println!("   Employees: {} → {}", stats.employees, backup.employees.len());
        print!("\nAre you sure? [y/N] ");
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let stats = db
        .import_full_backup(&backup)
        .context("Failed to import backup")?;
    db.log_audit(
        "cli",
        "import_full",
        None,
        None,
        Some(&format!(
            "transactions={}, employees={}",
            stats.transactions, stats.employees
        )),
    )?;

    println!();
    println!("✅ Import complete!");
    println!("   Transactions: {}", stats.transactions);
    println!("   Employees: {}", stats.employees);
    println!("   Monthly buckets: {}", stats.aggregates);

    Ok(())
}
