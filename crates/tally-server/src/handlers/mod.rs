//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

use axum::extract::Request;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;

use crate::AppError;

pub mod aggregates;
pub mod audit;
pub mod auth;
pub mod employees;
pub mod export;
pub mod reports;
pub mod transactions;

// Re-export all handlers for use in router
pub use aggregates::*;
pub use audit::*;
pub use auth::*;
pub use employees::*;
pub use export::*;
pub use reports::*;
pub use transactions::*;

/// Maximum JSON body size for regular requests (64 KB)
const MAX_JSON_BODY: usize = 64 * 1024;

/// Read and parse a JSON request body, mapping failures to 400
pub(crate) async fn read_json<T: DeserializeOwned>(
    request: Request,
    limit: Option<usize>,
) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), limit.unwrap_or(MAX_JSON_BODY))
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes).map_err(|e| AppError::bad_request(&format!("Invalid JSON: {}", e)))
}

/// Parse an optional `YYYY-MM-DD` query parameter
pub(crate) fn parse_query_date(value: Option<&str>, name: &str) -> Result<Option<NaiveDate>, AppError> {
    value
        .filter(|s| !s.is_empty())
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| AppError::bad_request(&format!("Invalid {} date format (use YYYY-MM-DD)", name)))
}
