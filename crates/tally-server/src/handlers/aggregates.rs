//! Monthly aggregate and forecast handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState};
use tally_core::{ForecastResult, MonthlyAggregate};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateQuery {
    pub business_id: Option<String>,
}

/// GET /api/monthly-aggregates - Stored aggregates in sequence order
pub async fn list_monthly_aggregates(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AggregateQuery>,
) -> Result<Json<Vec<MonthlyAggregate>>, AppError> {
    let aggregates = match params.business_id.as_deref().filter(|s| !s.is_empty()) {
        Some(business_id) => state.db.list_business_aggregates(business_id)?,
        None => state.db.list_aggregates()?,
    };

    Ok(Json(aggregates))
}

/// GET /api/forecast - Next-month projection from the stored aggregates
pub async fn get_forecast(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ForecastResult>, AppError> {
    Ok(Json(state.db.forecast()?))
}
