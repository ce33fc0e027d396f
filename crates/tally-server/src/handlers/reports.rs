//! Report handlers

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::parse_query_date;
use crate::{get_actor, AppError, AppState};
use tally_core::reports::{dashboard, revenue_by_business, summary_report};
use tally_core::{BusinessTotals, Dashboard, ReportPeriod, SummaryReport};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummaryQuery {
    /// monthly, quarterly or yearly (default: monthly)
    pub period: Option<String>,
    /// Restrict the report to one business
    pub business_id: Option<String>,
}

/// GET /api/reports/summary - Totals grouped by month, quarter or year
pub async fn report_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportSummaryQuery>,
    request: Request,
) -> Result<Json<SummaryReport>, AppError> {
    let actor = get_actor(request.headers());

    let period = match params.period.as_deref().filter(|s| !s.is_empty()) {
        Some(p) => p.parse::<ReportPeriod>().map_err(|e| AppError::bad_request(&e))?,
        None => ReportPeriod::default(),
    };
    let business = params.business_id.as_deref().filter(|s| !s.is_empty());

    let aggregates = state.db.list_aggregates()?;
    let report = summary_report(&aggregates, period, business);

    state.db.log_audit(
        &actor,
        "report",
        Some("summary"),
        None,
        Some(&format!(
            "period={}, businessId={:?}, rows={}",
            period,
            business,
            report.rows.len()
        )),
    )?;

    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Reference day (YYYY-MM-DD), defaults to today
    pub date: Option<String>,
}

/// GET /api/reports/dashboard - Current month KPIs and the forecast
pub async fn report_dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<Dashboard>, AppError> {
    let today = parse_query_date(params.date.as_deref(), "date")?
        .unwrap_or_else(|| Utc::now().date_naive());

    let aggregates = state.db.list_aggregates()?;
    let forecast = tally_core::forecast(&aggregates);

    Ok(Json(dashboard(&aggregates, &forecast, today)))
}

/// GET /api/reports/by-business - All-time totals per business
pub async fn report_by_business(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BusinessTotals>>, AppError> {
    let aggregates = state.db.list_aggregates()?;
    Ok(Json(revenue_by_business(&aggregates)))
}
