//! Monthly aggregation of transactions
//!
//! Folds raw transactions into one bucket per business per calendar month and
//! orders the buckets by period. The aggregate set is always rebuilt from the
//! full transaction collection; nothing here updates buckets incrementally.
//!
//! Ordering quirk: buckets of different businesses interleave by period, and
//! `growth_vs_prev` compares each bucket with the entry right before it in
//! that interleaved sequence, not with the same business's previous month.
//! The forecaster reads the same sequence, so the behaviour is kept. The
//! per-business comparison is reported separately as
//! `business_growth_vs_prev`.

use std::collections::HashMap;

use chrono::Datelike;
use tracing::{debug, warn};

use crate::models::{MonthlyAggregate, Transaction, TransactionType};

/// Relative change from `previous` to `current`, 0 when `previous` is 0
pub(crate) fn growth_rate(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    let rate = (current - previous) / previous.abs();
    if rate.is_finite() {
        rate
    } else {
        0.0
    }
}

/// Build the ordered monthly aggregate sequence from a transaction collection
///
/// Records with an empty business id or a non-finite amount are skipped with
/// a warning; the rest of the collection is still aggregated. A bucket whose
/// totals overflow to a non-finite value is dropped the same way.
pub fn aggregate(transactions: &[Transaction]) -> Vec<MonthlyAggregate> {
    let mut buckets: HashMap<(String, i32, u32), MonthlyAggregate> = HashMap::new();
    let mut skipped = 0usize;

    for tx in transactions {
        if tx.business_id.trim().is_empty() || !tx.amount.is_finite() {
            warn!(
                transaction_id = tx.id,
                "Skipping malformed transaction during aggregation"
            );
            skipped += 1;
            continue;
        }

        let (year, month) = (tx.date.year(), tx.date.month());
        let bucket = buckets
            .entry((tx.business_id.clone(), year, month))
            .or_insert_with(|| MonthlyAggregate::new(tx.business_id.clone(), year, month));

        bucket.transactions_count += 1;

        match tx.tx_type {
            TransactionType::Revenue => {
                bucket.total_revenue += tx.amount;
                bucket.students_count += i64::from(tx.students.unwrap_or(0));
                bucket.clients_count += i64::from(tx.clients.unwrap_or(0));
            }
            TransactionType::Expense => {
                bucket.total_expenses += tx.amount;
            }
        }

        // Cost counts as an expense even on revenue transactions
        if let Some(cost) = tx.cost.filter(|c| c.is_finite()) {
            bucket.total_expenses += cost;
        }
    }

    let mut aggregates: Vec<MonthlyAggregate> = Vec::with_capacity(buckets.len());

    for mut agg in buckets.into_values() {
        agg.net_profit = agg.total_revenue - agg.total_expenses;
        agg.avg_ticket = if agg.students_count > 0 {
            agg.total_revenue / agg.students_count as f64
        } else {
            0.0
        };

        // Totals that overflowed can't be stored or forecast from
        if !agg.is_finite() {
            warn!(
                business_id = %agg.business_id,
                year = agg.year,
                month = agg.month,
                "Dropping monthly bucket with overflowing totals"
            );
            continue;
        }
        aggregates.push(agg);
    }

    aggregates.sort_by(|a, b| {
        a.period_key()
            .cmp(&b.period_key())
            .then_with(|| a.business_id.cmp(&b.business_id))
    });

    apply_growth(&mut aggregates);

    debug!(
        transactions = transactions.len(),
        skipped,
        buckets = aggregates.len(),
        "Aggregated transactions"
    );

    aggregates
}

/// Fill `growth_vs_prev` and `business_growth_vs_prev` on a sorted sequence
fn apply_growth(aggregates: &mut [MonthlyAggregate]) {
    let mut last_profit_by_business: HashMap<String, f64> = HashMap::new();
    let mut previous_profit: Option<f64> = None;

    for agg in aggregates.iter_mut() {
        agg.growth_vs_prev = previous_profit.map(|prev| growth_rate(prev, agg.net_profit));
        agg.business_growth_vs_prev = last_profit_by_business
            .get(&agg.business_id)
            .map(|prev| growth_rate(*prev, agg.net_profit));

        previous_profit = Some(agg.net_profit);
        last_profit_by_business.insert(agg.business_id.clone(), agg.net_profit);
    }
}
