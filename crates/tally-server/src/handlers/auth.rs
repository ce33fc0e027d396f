//! Authentication-related handlers

use std::sync::Arc;

use axum::extract::Request;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::read_json;
use crate::{get_actor, session_token, AppError, AppState, SuccessResponse, SESSION_COOKIE};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Response for the /api/me endpoint
#[derive(Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    /// How the caller was authenticated
    pub auth_method: String,
}

fn session_cookie(value: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        SESSION_COOKIE, value, max_age_secs
    )
}

/// POST /api/login - Exchange the master password for a session
pub async fn login(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<impl IntoResponse, AppError> {
    let gate = state
        .config
        .password_gate
        .clone()
        .ok_or_else(|| AppError::bad_request("Password login is not configured"))?;

    let req: LoginRequest = read_json(request, None).await?;

    // Argon2 is CPU-bound; keep it off the async workers
    let verified = tokio::task::spawn_blocking(move || gate.verify(&req.password)).await?;

    if !verified {
        warn!("Failed login attempt");
        state
            .db
            .log_audit("anonymous", "login_failed", Some("session"), None, None)?;
        return Err(AppError::unauthorized("Invalid password"));
    }

    let session = state.db.create_session(state.config.session_ttl)?;
    state.db.log_audit("anonymous", "login", Some("session"), None, None)?;
    info!(expires_at = %session.expires_at, "Session created");

    let cookie = session_cookie(&session.token, state.config.session_ttl.num_seconds());

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            success: true,
            token: session.token,
            expires_at: session.expires_at,
        }),
    ))
}

/// POST /api/logout - End the current session
pub async fn logout(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<impl IntoResponse, AppError> {
    let actor = get_actor(request.headers());

    if let Some(token) = session_token(request.headers()) {
        state.db.delete_session(&token)?;
        state.db.log_audit(&actor, "logout", Some("session"), None, None)?;
    }

    Ok((
        [(header::SET_COOKIE, session_cookie("", 0))],
        Json(SuccessResponse { success: true }),
    ))
}

/// GET /api/me - Describe the current caller
pub async fn get_me(State(state): State<Arc<AppState>>, request: Request) -> Json<MeResponse> {
    let auth_method = if !state.config.require_auth {
        "none"
    } else if session_token(request.headers()).is_some() {
        "session"
    } else {
        "unknown"
    };

    Json(MeResponse {
        authenticated: true,
        auth_method: auth_method.to_string(),
    })
}
