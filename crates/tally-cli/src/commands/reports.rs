//! Report command implementations

use anyhow::Result;
use chrono::Utc;
use tally_core::db::Database;
use tally_core::reports::{dashboard, revenue_by_business, summary_report, Kpi};
use tally_core::{Confidence, ReportPeriod};

use super::{parse_date_arg, truncate};

fn format_growth(growth: Option<f64>) -> String {
    match growth {
        Some(g) if g >= 0.0 => format!("\x1b[32m+{:.1}%\x1b[0m", g * 100.0),
        Some(g) => format!("\x1b[31m{:.1}%\x1b[0m", g * 100.0),
        None => "—".to_string(),
    }
}

fn format_kpi(kpi: &Kpi) -> String {
    let arrow = if kpi.change_percent > 0.0 {
        "↑"
    } else if kpi.change_percent < 0.0 {
        "↓"
    } else {
        "→"
    };
    format!(
        "{:>12.2}  (prev {:.2}, {} {:.1}%)",
        kpi.current,
        kpi.previous,
        arrow,
        kpi.change_percent.abs()
    )
}

pub fn cmd_aggregates(db: &Database, business: Option<&str>) -> Result<()> {
    let aggregates = match business {
        Some(b) => db.list_business_aggregates(b)?,
        None => db.list_aggregates()?,
    };

    if aggregates.is_empty() {
        println!("No monthly aggregates yet. Record transactions with 'tally add'.");
        return Ok(());
    }

    println!();
    println!("📅 Monthly Aggregates");
    println!("   ───────────────────────────────────────────────────────────────────────────");
    println!(
        "   {:<8} {:<14} {:>11} {:>11} {:>11} {:>8} {:>9}",
        "Month", "Business", "Revenue", "Expenses", "Profit", "Students", "Growth"
    );

    for agg in &aggregates {
        let growth = if business.is_some() {
            agg.business_growth_vs_prev
        } else {
            agg.growth_vs_prev
        };
        println!(
            "   {:<8} {:<14} {:>11.2} {:>11.2} {:>11.2} {:>8} {:>9}",
            agg.label(),
            truncate(&agg.business_id, 14),
            agg.total_revenue,
            agg.total_expenses,
            agg.net_profit,
            agg.students_count,
            format_growth(growth)
        );
    }

    Ok(())
}

pub fn cmd_forecast(db: &Database) -> Result<()> {
    let forecast = db.forecast()?;

    println!();
    println!("🔮 Next Month Forecast");
    println!("   ─────────────────────────────");
    println!("   Revenue:     {:.2}", forecast.forecast_revenue);
    println!("   Profit:      {:.2}", forecast.forecast_profit);
    if let Some(rate) = forecast.avg_growth_rate {
        println!("   Avg growth:  {}", format_growth(Some(rate)));
    }
    if let Some(months) = forecast.based_on_months {
        println!("   Based on:    {} month(s)", months);
    }
    println!("   Confidence:  {}", forecast.confidence);

    if forecast.confidence == Confidence::Low {
        println!();
        println!("   Not enough history yet. Record at least two months of transactions.");
    }

    Ok(())
}

pub fn cmd_report(db: &Database, period: &str, business: Option<&str>) -> Result<()> {
    let period: ReportPeriod = period.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let aggregates = db.list_aggregates()?;
    let report = summary_report(&aggregates, period, business);

    println!();
    match business {
        Some(b) => println!("📊 {} Report: {}", capitalize(period.as_str()), b),
        None => println!("📊 {} Report", capitalize(period.as_str())),
    }
    println!("   ─────────────────────────────────────────────────────────────");

    if report.rows.is_empty() {
        println!("   No data for this selection.");
        return Ok(());
    }

    for row in &report.rows {
        let label = match &row.business_id {
            Some(b) => format!("{} {}", row.label, truncate(b, 14)),
            None => row.label.clone(),
        };
        println!(
            "   {:<24} rev {:>11.2}  exp {:>11.2}  profit {:>11.2}  {}",
            label,
            row.total_revenue,
            row.total_expenses,
            row.net_profit,
            format_growth(row.growth_vs_prev)
        );
    }

    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Total revenue:    {:>12.2}", report.total_revenue);
    println!("   Total expenses:   {:>12.2}", report.total_expenses);
    println!("   Net profit:       {:>12.2}", report.net_profit);
    println!("   Students:         {:>12}", report.total_students);
    if report.total_students > 0 {
        println!("   Revenue/student:  {:>12.2}", report.avg_revenue_per_student);
    }

    if business.is_none() {
        let by_business = revenue_by_business(&aggregates);
        if by_business.len() > 1 {
            println!();
            println!("   By business:");
            for b in by_business {
                println!(
                    "   {:<16} {:>12.2} revenue  {:>12.2} profit  ({} months)",
                    truncate(&b.business_id, 16),
                    b.total_revenue,
                    b.net_profit,
                    b.months
                );
            }
        }
    }

    Ok(())
}

pub fn cmd_dashboard(db: &Database, date: Option<&str>) -> Result<()> {
    let today = parse_date_arg(date, "date")?.unwrap_or_else(|| Utc::now().date_naive());

    let aggregates = db.list_aggregates()?;
    let forecast = tally_core::forecast(&aggregates);
    let dash = dashboard(&aggregates, &forecast, today);

    println!();
    println!("╭─────────────────────────────────────────╮");
    println!("│           💰 Tally Dashboard            │");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Month:     {}/{}", dash.year, dash.month);
    println!("  Revenue:   {}", format_kpi(&dash.revenue));
    println!("  Profit:    {}", format_kpi(&dash.profit));
    println!("  Students:  {}", format_kpi(&dash.students));
    println!();
    println!(
        "  🔮 Forecast profit: {:.2} ({} confidence)",
        dash.forecast_profit, dash.forecast_confidence
    );
    println!();

    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
