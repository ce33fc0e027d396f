//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{parse_query_date, read_json};
use crate::{get_actor, AppError, AppState, SuccessResponse, MAX_PAGE_LIMIT};
use tally_core::db::TransactionFilter;
use tally_core::models::{parse_transaction_date, NewTransaction, Transaction, TransactionType};

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub business_id: Option<String>,
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    /// Inclusive start date (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Inclusive end date (YYYY-MM-DD)
    pub end_date: Option<String>,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub transactions: Vec<Transaction>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Request body for recording a transaction
///
/// `date` accepts plain dates, `datetime-local` values and RFC 3339.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub business_id: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub category: Option<String>,
    pub amount: f64,
    pub cost: Option<f64>,
    pub students: Option<u32>,
    pub clients: Option<u32>,
    pub date: String,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
}

impl CreateTransactionRequest {
    fn into_new_transaction(self) -> Result<NewTransaction, AppError> {
        let tx_type: TransactionType = self
            .tx_type
            .parse()
            .map_err(|e: String| AppError::bad_request(&e))?;
        let date = parse_transaction_date(&self.date).map_err(AppError::from_core)?;

        Ok(NewTransaction {
            business_id: self.business_id,
            tx_type,
            category: self.category.filter(|s| !s.trim().is_empty()),
            amount: self.amount,
            cost: self.cost,
            students: self.students,
            clients: self.clients,
            date,
            notes: self.notes.filter(|s| !s.trim().is_empty()),
            payment_method: self.payment_method.filter(|s| !s.trim().is_empty()),
        })
    }
}

#[derive(Serialize)]
pub struct CreateTransactionResponse {
    pub success: bool,
    pub transaction: Transaction,
    pub aggregates_refreshed: bool,
}

/// Parse the `type` query parameter
pub(crate) fn parse_type_filter(value: Option<&str>) -> Result<Option<TransactionType>, AppError> {
    value
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<TransactionType>())
        .transpose()
        .map_err(|e| AppError::bad_request(&e))
}

/// GET /api/transactions - List transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionQuery>,
) -> Result<Json<TransactionResponse>, AppError> {
    // Input validation: clamp pagination parameters
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    let offset = params.offset.max(0);

    let start = parse_query_date(params.start_date.as_deref(), "startDate")?;
    let end = parse_query_date(params.end_date.as_deref(), "endDate")?;
    let tx_type = parse_type_filter(params.tx_type.as_deref())?;

    let filter = TransactionFilter::new()
        .business_id(params.business_id.as_deref().filter(|s| !s.is_empty()))
        .tx_type(tx_type)
        .date_range(start, end);

    let transactions = state
        .db
        .list_transactions(&filter.page(Some(limit), Some(offset)))?;
    let total = state.db.count_transactions(&filter)?;

    Ok(Json(TransactionResponse {
        transactions,
        total,
        limit,
        offset,
    }))
}

/// POST /api/transactions - Record a transaction and refresh aggregates
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<CreateTransactionResponse>, AppError> {
    let actor = get_actor(request.headers());
    let req: CreateTransactionRequest = read_json(request, None).await?;
    let new_tx = req.into_new_transaction()?;

    let result = state.db.add_transaction(&new_tx).map_err(AppError::from_core)?;

    if !result.aggregates_refreshed {
        warn!(
            transaction_id = result.transaction.id,
            "Transaction stored but aggregates are stale"
        );
    }

    state.db.log_audit(
        &actor,
        "create",
        Some("transaction"),
        Some(result.transaction.id),
        Some(&format!(
            "business_id={}, type={}, amount={}",
            result.transaction.business_id, result.transaction.tx_type, result.transaction.amount
        )),
    )?;

    Ok(Json(CreateTransactionResponse {
        success: true,
        transaction: result.transaction,
        aggregates_refreshed: result.aggregates_refreshed,
    }))
}

/// GET /api/transactions/:id - Get a single transaction
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::not_found(&format!("Transaction {} not found", id)))?;

    Ok(Json(transaction))
}

/// DELETE /api/transactions/:id - Delete a transaction and refresh aggregates
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let actor = get_actor(request.headers());

    if !state.db.delete_transaction(id)? {
        return Err(AppError::not_found(&format!("Transaction {} not found", id)));
    }

    state
        .db
        .log_audit(&actor, "delete", Some("transaction"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
