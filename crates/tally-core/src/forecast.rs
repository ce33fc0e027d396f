//! Next-period revenue and profit projection
//!
//! A naive average-growth extrapolation: take the trailing window of the
//! aggregate sequence, average the period-over-period profit growth and
//! apply it to the latest period. The input is trusted to be in the order
//! produced by [`crate::aggregate::aggregate`]; it is not re-sorted here.

use tracing::{debug, warn};

use crate::models::{Confidence, ForecastResult, MonthlyAggregate};

/// Number of trailing periods the projection looks at
pub const FORECAST_WINDOW: usize = 6;

/// Window size at which the projection is labelled high confidence
const HIGH_CONFIDENCE_PERIODS: usize = 4;

/// Project the next period from the stored aggregate sequence
///
/// Never fails: short histories and malformed aggregates yield the zero,
/// low-confidence result.
pub fn forecast(aggregates: &[MonthlyAggregate]) -> ForecastResult {
    if aggregates.len() < 2 {
        return ForecastResult::low_confidence();
    }

    let recent = &aggregates[aggregates.len().saturating_sub(FORECAST_WINDOW)..];

    // Pairs with a zero-profit predecessor are left out, not counted as 0
    let growth_rates: Vec<f64> = recent
        .windows(2)
        .filter(|pair| pair[0].net_profit != 0.0)
        .map(|pair| (pair[1].net_profit - pair[0].net_profit) / pair[0].net_profit.abs())
        .collect();

    if growth_rates.is_empty() {
        return ForecastResult::low_confidence();
    }

    let avg_growth = growth_rates.iter().sum::<f64>() / growth_rates.len() as f64;

    let Some(last) = recent.last() else {
        return ForecastResult::low_confidence();
    };

    let forecast_profit = (last.net_profit * (1.0 + avg_growth)).max(0.0);
    let forecast_revenue = (last.total_revenue * (1.0 + avg_growth)).max(0.0);

    if !avg_growth.is_finite() || !forecast_profit.is_finite() || !forecast_revenue.is_finite() {
        warn!(
            periods = recent.len(),
            "Non-finite value while forecasting, returning empty projection"
        );
        return ForecastResult::low_confidence();
    }

    let confidence = if recent.len() >= HIGH_CONFIDENCE_PERIODS {
        Confidence::High
    } else {
        Confidence::Medium
    };

    debug!(
        periods = recent.len(),
        rates = growth_rates.len(),
        avg_growth,
        %confidence,
        "Computed forecast"
    );

    ForecastResult {
        forecast_revenue,
        forecast_profit,
        avg_growth_rate: Some(avg_growth),
        confidence,
        based_on_months: Some(recent.len()),
    }
}
