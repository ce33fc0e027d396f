//! Stored monthly aggregate snapshot

use rusqlite::params;
use tracing::debug;

use super::Database;
use crate::error::Result;
use crate::forecast::forecast;
use crate::models::{ForecastResult, MonthlyAggregate};

const AGGREGATE_COLUMNS: &str = "business_id, year, month, total_revenue, total_expenses, \
     net_profit, students_count, clients_count, transactions_count, avg_ticket, growth_vs_prev, \
     business_growth_vs_prev";

fn row_to_aggregate(row: &rusqlite::Row<'_>) -> rusqlite::Result<MonthlyAggregate> {
    Ok(MonthlyAggregate {
        business_id: row.get(0)?,
        year: row.get(1)?,
        month: row.get(2)?,
        total_revenue: row.get(3)?,
        total_expenses: row.get(4)?,
        net_profit: row.get(5)?,
        students_count: row.get(6)?,
        clients_count: row.get(7)?,
        transactions_count: row.get(8)?,
        avg_ticket: row.get(9)?,
        growth_vs_prev: row.get(10)?,
        business_growth_vs_prev: row.get(11)?,
    })
}

impl Database {
    /// Swap the stored aggregates for a new set
    ///
    /// Runs in one SQLite transaction: on any error the previous snapshot
    /// stays untouched.
    pub fn replace_aggregates(&self, aggregates: &[MonthlyAggregate]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM monthly_aggregates", [])?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO monthly_aggregates (
                    position, business_id, year, month, total_revenue, total_expenses,
                    net_profit, students_count, clients_count, transactions_count,
                    avg_ticket, growth_vs_prev, business_growth_vs_prev
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for (position, agg) in aggregates.iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    agg.business_id,
                    agg.year,
                    agg.month,
                    agg.total_revenue,
                    agg.total_expenses,
                    agg.net_profit,
                    agg.students_count,
                    agg.clients_count,
                    agg.transactions_count,
                    agg.avg_ticket,
                    agg.growth_vs_prev,
                    agg.business_growth_vs_prev,
                ])?;
            }
        }

        tx.commit()?;

        debug!(count = aggregates.len(), "Replaced monthly aggregates");
        Ok(())
    }

    /// The last computed aggregate sequence, in sequence order
    pub fn list_aggregates(&self) -> Result<Vec<MonthlyAggregate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM monthly_aggregates ORDER BY position",
            AGGREGATE_COLUMNS
        ))?;

        let aggregates = stmt
            .query_map([], row_to_aggregate)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(aggregates)
    }

    /// Stored aggregates of one business, in sequence order
    pub fn list_business_aggregates(&self, business_id: &str) -> Result<Vec<MonthlyAggregate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM monthly_aggregates WHERE business_id = ? ORDER BY position",
            AGGREGATE_COLUMNS
        ))?;

        let aggregates = stmt
            .query_map(params![business_id], row_to_aggregate)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(aggregates)
    }

    /// Forecast over the stored aggregates (recomputed on every call)
    pub fn forecast(&self) -> Result<ForecastResult> {
        Ok(forecast(&self.list_aggregates()?))
    }
}
