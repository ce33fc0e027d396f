//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_status` - Show encryption and record counts

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::db::{Database, DB_KEY_ENV};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let stats = db.get_stats()?;
    println!("   Tables ready ({} transactions)", stats.transactions);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Record a sale: tally add --business courses --type revenue --amount 1200");
    println!("  2. Start web UI: tally serve");

    Ok(())
}

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!();
    println!("📊 Tally Status");
    println!("   ─────────────────────────────");
    println!("   Database: {}", db_path.display());

    if !db_path.exists() {
        println!("   ❌ Database not found. Run 'tally init' first.");
        return Ok(());
    }

    let size = std::fs::metadata(db_path)
        .map(|m| m.len())
        .with_context(|| format!("Failed to read {}", db_path.display()))?;
    println!("   Size: {:.1} KB", size as f64 / 1024.0);

    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({} set)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: {} not set", DB_KEY_ENV);
    }

    match open_db(db_path, no_encrypt) {
        Ok(db) => {
            let stats = db.get_stats()?;
            println!();
            println!("   Transactions:     {}", stats.transactions);
            println!("   Monthly buckets:  {}", stats.aggregates);
            println!("   Employees:        {}", stats.employees);
            println!("   Active sessions:  {}", stats.active_sessions);
        }
        Err(e) => {
            println!("   ❌ Cannot open database: {}", e);
            if !no_encrypt && has_key {
                println!("      (Check if {} is correct)", DB_KEY_ENV);
            }
        }
    }

    println!();
    Ok(())
}
