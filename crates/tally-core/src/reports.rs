//! Reports over stored monthly aggregates
//!
//! Everything here reads an aggregate sequence that has already been
//! computed; nothing touches raw transactions or the clock.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::aggregate::growth_rate;
use crate::models::{Confidence, ForecastResult, MonthlyAggregate};

/// Grouping used by the summary report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPeriod {
    #[default]
    Monthly,
    Quarterly,
    Yearly,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for ReportPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" | "month" => Ok(Self::Monthly),
            "quarterly" | "quarter" => Ok(Self::Quarterly),
            "yearly" | "year" | "annual" => Ok(Self::Yearly),
            _ => Err(format!("Unknown report period: {}", s)),
        }
    }
}

impl std::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of a summary report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// `2024/3`, `2024-Q1` or `2024`
    pub label: String,
    /// Only set on monthly rows
    #[serde(rename = "businessId", default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_profit: f64,
    pub students_count: i64,
    pub transactions_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_vs_prev: Option<f64>,
}

/// Totals plus per-period rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub period: ReportPeriod,
    #[serde(rename = "businessId", default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_profit: f64,
    pub total_students: i64,
    pub avg_revenue_per_student: f64,
    pub rows: Vec<ReportRow>,
}

/// Build a summary report, optionally restricted to one business
///
/// Monthly rows are the aggregates themselves and keep their stored
/// `growth_vs_prev`. Quarterly and yearly rows sum every matching bucket in
/// the period and compare net profit with the previous row.
pub fn summary_report(
    aggregates: &[MonthlyAggregate],
    period: ReportPeriod,
    business: Option<&str>,
) -> SummaryReport {
    let selected: Vec<&MonthlyAggregate> = aggregates
        .iter()
        .filter(|a| business.map_or(true, |b| a.business_id == b))
        .collect();

    let total_revenue: f64 = selected.iter().map(|a| a.total_revenue).sum();
    let total_expenses: f64 = selected.iter().map(|a| a.total_expenses).sum();
    let total_students: i64 = selected.iter().map(|a| a.students_count).sum();

    let rows = match period {
        ReportPeriod::Monthly => selected
            .iter()
            .map(|a| ReportRow {
                label: a.label(),
                business_id: Some(a.business_id.clone()),
                total_revenue: a.total_revenue,
                total_expenses: a.total_expenses,
                net_profit: a.net_profit,
                students_count: a.students_count,
                transactions_count: a.transactions_count,
                growth_vs_prev: a.growth_vs_prev,
            })
            .collect(),
        ReportPeriod::Quarterly => grouped_rows(&selected, |a| {
            let quarter = (a.month + 2) / 3;
            ((a.year, quarter), format!("{}-Q{}", a.year, quarter))
        }),
        ReportPeriod::Yearly => grouped_rows(&selected, |a| ((a.year, 0), a.year.to_string())),
    };

    SummaryReport {
        period,
        business_id: business.map(str::to_string),
        total_revenue,
        total_expenses,
        net_profit: total_revenue - total_expenses,
        total_students,
        avg_revenue_per_student: if total_students > 0 {
            total_revenue / total_students as f64
        } else {
            0.0
        },
        rows,
    }
}

fn grouped_rows<F>(aggregates: &[&MonthlyAggregate], key: F) -> Vec<ReportRow>
where
    F: Fn(&MonthlyAggregate) -> ((i32, u32), String),
{
    let mut groups: BTreeMap<(i32, u32), ReportRow> = BTreeMap::new();

    for agg in aggregates {
        let (sort_key, label) = key(*agg);
        let row = groups.entry(sort_key).or_insert_with(|| ReportRow {
            label,
            business_id: None,
            total_revenue: 0.0,
            total_expenses: 0.0,
            net_profit: 0.0,
            students_count: 0,
            transactions_count: 0,
            growth_vs_prev: None,
        });
        row.total_revenue += agg.total_revenue;
        row.total_expenses += agg.total_expenses;
        row.students_count += agg.students_count;
        row.transactions_count += agg.transactions_count;
    }

    let mut rows: Vec<ReportRow> = groups.into_values().collect();
    let mut previous: Option<f64> = None;
    for row in &mut rows {
        row.net_profit = row.total_revenue - row.total_expenses;
        row.growth_vs_prev = previous.map(|prev| growth_rate(prev, row.net_profit));
        previous = Some(row.net_profit);
    }
    rows
}

/// Current value, previous month's value and the percent change between them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub current: f64,
    pub previous: f64,
    /// Percent, 0 when the previous value is not positive
    pub change_percent: f64,
}

impl Kpi {
    fn new(current: f64, previous: f64) -> Self {
        let change_percent = if previous > 0.0 {
            (current - previous) / previous * 100.0
        } else {
            0.0
        };
        Self {
            current,
            previous,
            change_percent,
        }
    }
}

/// Headline numbers for the month containing `today`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub year: i32,
    pub month: u32,
    pub revenue: Kpi,
    pub profit: Kpi,
    pub students: Kpi,
    pub forecast_profit: f64,
    pub forecast_confidence: Confidence,
}

/// Compare the month containing `today` with the month before it
///
/// Values are summed across every business with a bucket in that month.
pub fn dashboard(
    aggregates: &[MonthlyAggregate],
    forecast: &ForecastResult,
    today: NaiveDate,
) -> Dashboard {
    let (year, month) = (today.year(), today.month());
    let (prev_year, prev_month) = if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    };

    let totals = |y: i32, m: u32| {
        aggregates
            .iter()
            .filter(|a| a.year == y && a.month == m)
            .fold((0.0, 0.0, 0i64), |(rev, profit, students), a| {
                (
                    rev + a.total_revenue,
                    profit + a.net_profit,
                    students + a.students_count,
                )
            })
    };

    let (cur_revenue, cur_profit, cur_students) = totals(year, month);
    let (prev_revenue, prev_profit, prev_students) = totals(prev_year, prev_month);

    Dashboard {
        year,
        month,
        revenue: Kpi::new(cur_revenue, prev_revenue),
        profit: Kpi::new(cur_profit, prev_profit),
        students: Kpi::new(cur_students as f64, prev_students as f64),
        forecast_profit: forecast.forecast_profit,
        forecast_confidence: forecast.confidence,
    }
}

/// All-time totals for one business
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessTotals {
    #[serde(rename = "businessId")]
    pub business_id: String,
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_profit: f64,
    pub students_count: i64,
    pub months: usize,
}

/// Per-business totals, highest revenue first
pub fn revenue_by_business(aggregates: &[MonthlyAggregate]) -> Vec<BusinessTotals> {
    let mut by_business: HashMap<&str, BusinessTotals> = HashMap::new();

    for agg in aggregates {
        let totals = by_business
            .entry(agg.business_id.as_str())
            .or_insert_with(|| BusinessTotals {
                business_id: agg.business_id.clone(),
                total_revenue: 0.0,
                total_expenses: 0.0,
                net_profit: 0.0,
                students_count: 0,
                months: 0,
            });
        totals.total_revenue += agg.total_revenue;
        totals.total_expenses += agg.total_expenses;
        totals.students_count += agg.students_count;
        totals.months += 1;
    }

    let mut result: Vec<BusinessTotals> = by_business
        .into_values()
        .map(|mut t| {
            t.net_profit = t.total_revenue - t.total_expenses;
            t
        })
        .collect();

    result.sort_by(|a, b| {
        b.total_revenue
            .total_cmp(&a.total_revenue)
            .then_with(|| a.business_id.cmp(&b.business_id))
    });
    result
}
