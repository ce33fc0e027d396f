//! Employee handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Json,
};

use super::read_json;
use crate::{get_actor, AppError, AppState, SuccessResponse};
use tally_core::{Employee, NewEmployee};

/// GET /api/employees - List employees by name
pub async fn list_employees(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Employee>>, AppError> {
    Ok(Json(state.db.list_employees()?))
}

/// POST /api/employees - Create an employee
pub async fn create_employee(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Employee>, AppError> {
    let actor = get_actor(request.headers());
    let req: NewEmployee = read_json(request, None).await?;

    let id = state.db.create_employee(&req).map_err(AppError::from_core)?;

    state.db.log_audit(
        &actor,
        "create",
        Some("employee"),
        Some(id),
        Some(&format!("name={}", req.name)),
    )?;

    let employee = state
        .db
        .get_employee(id)?
        .ok_or_else(|| AppError::internal("Employee vanished after insert"))?;

    Ok(Json(employee))
}

/// GET /api/employees/:id - Get a single employee
pub async fn get_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Employee>, AppError> {
    let employee = state
        .db
        .get_employee(id)?
        .ok_or_else(|| AppError::not_found(&format!("Employee {} not found", id)))?;

    Ok(Json(employee))
}

/// PUT /api/employees/:id - Replace an employee's details
pub async fn update_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Employee>, AppError> {
    let actor = get_actor(request.headers());
    let req: NewEmployee = read_json(request, None).await?;

    if !state
        .db
        .update_employee(id, &req)
        .map_err(AppError::from_core)?
    {
        return Err(AppError::not_found(&format!("Employee {} not found", id)));
    }

    state.db.log_audit(
        &actor,
        "update",
        Some("employee"),
        Some(id),
        Some(&format!("name={}", req.name)),
    )?;

    let employee = state
        .db
        .get_employee(id)?
        .ok_or_else(|| AppError::not_found(&format!("Employee {} not found", id)))?;

    Ok(Json(employee))
}

/// DELETE /api/employees/:id - Delete an employee
pub async fn delete_employee(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let actor = get_actor(request.headers());

    if !state.db.delete_employee(id)? {
        return Err(AppError::not_found(&format!("Employee {} not found", id)));
    }

    state
        .db
        .log_audit(&actor, "delete", Some("employee"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
