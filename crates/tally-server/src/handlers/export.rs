//! Export and full backup/import handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Response, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::parse_query_date;
use super::transactions::parse_type_filter;
use crate::{get_actor, AppError, AppState};
use tally_core::db::TransactionFilter;
use tally_core::export::ExportFormat;
use tally_core::{FullBackup, ImportStats};

/// Query parameters for transaction export
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionExportQuery {
    /// Output format (default: csv)
    #[serde(default = "default_format")]
    pub format: String,
    pub business_id: Option<String>,
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    /// Start date (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// End date (YYYY-MM-DD)
    pub end_date: Option<String>,
}

fn default_format() -> String {
    "csv".to_string()
}

fn attachment(content_type: &str, filename: &str, body: String) -> Result<Response<Body>, AppError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(body))
        .map_err(|e| AppError::internal(&e.to_string()))
}

/// GET /api/export/transactions - Export transactions to CSV or JSON
pub async fn export_transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<TransactionExportQuery>,
) -> Result<Response<Body>, AppError> {
    let actor = get_actor(&headers);

    let format: ExportFormat = params
        .format
        .parse()
        .map_err(|_| AppError::bad_request("Invalid format. Use 'csv' or 'json'"))?;
    let start = parse_query_date(params.start_date.as_deref(), "startDate")?;
    let end = parse_query_date(params.end_date.as_deref(), "endDate")?;
    let tx_type = parse_type_filter(params.tx_type.as_deref())?;

    let filter = TransactionFilter::new()
        .business_id(params.business_id.as_deref().filter(|s| !s.is_empty()))
        .tx_type(tx_type)
        .date_range(start, end);

    state.db.log_audit(
        &actor,
        "export_transactions",
        Some("transaction"),
        None,
        Some(&format!(
            "format={}, businessId={:?}, start={:?}, end={:?}",
            params.format, params.business_id, start, end
        )),
    )?;

    match format {
        ExportFormat::Csv => {
            let csv = state.db.export_transactions_csv(&filter)?;
            let lines = csv.lines().count().saturating_sub(1);
            info!("Exported {} transactions to CSV", lines);

            attachment("text/csv; charset=utf-8", "transactions.csv", csv)
        }
        ExportFormat::Json => {
            let transactions = state.db.list_transactions(&filter)?;
            let json = serde_json::to_string_pretty(&transactions)
                .map_err(|e| AppError::internal(&e.to_string()))?;
            info!("Exported {} transactions to JSON", transactions.len());

            attachment("application/json", "transactions.json", json)
        }
    }
}

/// GET /api/export/full - Export full database backup as JSON
pub async fn export_full(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response<Body>, AppError> {
    let actor = get_actor(&headers);

    info!("Exporting full database backup");
    let backup = state.db.export_full_backup()?;

    state.db.log_audit(
        &actor,
        "export_full",
        None,
        None,
        Some(&format!(
            "version={}, transactions={}, employees={}",
            backup.version,
            backup.transactions.len(),
            backup.employees.len()
        )),
    )?;

    let json =
        serde_json::to_string_pretty(&backup).map_err(|e| AppError::internal(&e.to_string()))?;

    attachment(
        "application/json",
        &format!("tally-backup-{}.json", backup.exported_at.format("%Y-%m-%d")),
        json,
    )
}

/// Query parameters for full import
#[derive(Debug, Deserialize)]
pub struct ImportFullQuery {
    /// Acknowledge that existing data is replaced (required)
    #[serde(default)]
    pub clear: bool,
}

/// Response for full import
#[derive(Serialize)]
pub struct ImportFullResponse {
    pub success: bool,
    pub stats: ImportStats,
}

/// POST /api/import/full - Replace all data with a full backup
pub async fn import_full(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ImportFullQuery>,
    body: String,
) -> Result<Json<ImportFullResponse>, AppError> {
    let actor = get_actor(&headers);

    if !params.clear {
        return Err(AppError::bad_request(
            "Import replaces all existing data; pass clear=true to confirm",
        ));
    }

    let backup: FullBackup = serde_json::from_str(&body)
        .map_err(|e| AppError::bad_request(&format!("Invalid JSON: {}", e)))?;

    info!(
        "Importing full backup: version={}, transactions={}, employees={}",
        backup.version,
        backup.transactions.len(),
        backup.employees.len()
    );

    let stats = state
        .db
        .import_full_backup(&backup)
        .map_err(AppError::from_core)?;

    state.db.log_audit(
        &actor,
        "import_full",
        None,
        None,
        Some(&format!(
            "transactions={}, employees={}, aggregates={}",
            stats.transactions, stats.employees, stats.aggregates
        )),
    )?;

    Ok(Json(ImportFullResponse {
        success: true,
        stats,
    }))
}
