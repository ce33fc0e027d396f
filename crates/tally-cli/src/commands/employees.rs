//! Employee command implementations

use anyhow::{Context, Result};
use tally_core::db::Database;
use tally_core::NewEmployee;

use super::{parse_date_arg, truncate};

pub fn cmd_employees_list(db: &Database) -> Result<()> {
    let employees = db.list_employees()?;

    if employees.is_empty() {
        println!("No employees yet. Add one with:");
        println!("  tally employees add \"Mariam\" --role Tailor --business abayat_shop");
        return Ok(());
    }

    println!();
    println!("👥 Employees");
    println!("   ─────────────────────────────────────────────────────────────");

    for e in employees {
        let salary = e
            .monthly_salary
            .map(|s| format!("{:.2}/mo", s))
            .unwrap_or_default();
        println!(
            "   [{}] {:<24} │ {:<16} │ {:<14} │ {}",
            e.id,
            truncate(&e.name, 24),
            truncate(e.role.as_deref().unwrap_or("-"), 16),
            truncate(e.business_id.as_deref().unwrap_or("-"), 14),
            salary
        );
    }

    Ok(())
}

pub fn cmd_employees_add(
    db: &Database,
    name: &str,
    role: Option<&str>,
    business: Option<&str>,
    salary: Option<f64>,
    hired: Option<&str>,
) -> Result<i64> {
    let employee = NewEmployee {
        name: name.to_string(),
        role: role.map(str::to_string),
        business_id: business.map(str::to_string),
        monthly_salary: salary,
        hired_at: parse_date_arg(hired, "hired")?,
        notes: None,
    };

    let id = db
        .create_employee(&employee)
        .context("Failed to add employee")?;
    db.log_audit(
        "cli",
        "create",
        Some("employee"),
        Some(id),
        Some(&format!("name={}", name)),
    )?;

    println!("✅ Added employee {} (ID: {})", name, id);

    Ok(id)
}

pub fn cmd_employees_remove(db: &Database, id: i64) -> Result<()> {
    let employee = db
        .get_employee(id)?
        .ok_or_else(|| anyhow::anyhow!("Employee {} not found", id))?;

    db.delete_employee(id)?;
    db.log_audit("cli", "delete", Some("employee"), Some(id), None)?;

    println!("✅ Removed employee {} ({})", employee.name, id);

    Ok(())
}
