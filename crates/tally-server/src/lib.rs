//! Tally Web Server
//!
//! Axum-based REST API for the Tally bookkeeping service.
//!
//! Security features:
//! - Shared master password gate with server-side sessions (use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Input validation (pagination limits, strict transaction validation)
//! - Audit logging for writes, exports and logins
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use tally_core::auth::hash_token;
use tally_core::db::Database;
use tally_core::PasswordGate;

mod handlers;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "tally_session";

/// Environment variable overriding the session lifetime
pub const SESSION_TTL_ENV: &str = "TALLY_SESSION_TTL_HOURS";

const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Master password gate; required when `require_auth` is set
    pub password_gate: Option<PasswordGate>,
    /// Lifetime of a login session
    pub session_ttl: chrono::Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            password_gate: None,
            session_ttl: chrono::Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }
}

/// Session lifetime from `TALLY_SESSION_TTL_HOURS`, falling back to 24h
pub fn session_ttl_from_env() -> chrono::Duration {
    parse_session_ttl(std::env::var(SESSION_TTL_ENV).ok().as_deref())
}

/// Parse a session lifetime in hours, capped at one year
pub(crate) fn parse_session_ttl(value: Option<&str>) -> chrono::Duration {
    let hours = value
        .and_then(|v| match v.trim().parse::<i64>() {
            Ok(h) if h > MAX_SESSION_TTL_HOURS => {
                warn!(
                    value = %v,
                    max = MAX_SESSION_TTL_HOURS,
                    "Capping {}",
                    SESSION_TTL_ENV
                );
                Some(MAX_SESSION_TTL_HOURS)
            }
            Ok(h) if h > 0 => Some(h),
            _ => {
                warn!(value = %v, "Ignoring invalid {}", SESSION_TTL_ENV);
                None
            }
        })
        .unwrap_or(DEFAULT_SESSION_TTL_HOURS);
    chrono::Duration::hours(hours)
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
}

/// Extract the session token from `Authorization: Bearer` or the session cookie
pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Identifier recorded in the audit log for a request
///
/// Sessions are identified by a short prefix of the token digest, never the
/// token itself.
pub fn get_actor(headers: &HeaderMap) -> String {
    match session_token(headers) {
        Some(token) => format!("session:{}", &hash_token(&token)[..8]),
        None => "local-dev".to_string(),
    }
}

/// Authentication middleware - requires a live session unless auth is disabled
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    if let Some(token) = session_token(request.headers()) {
        match state.db.validate_session(&token) {
            Ok(true) => return next.run(request).await,
            Ok(false) => {
                warn!(path = %request.uri().path(), "Rejected expired or unknown session");
            }
            Err(e) => {
                error!(error = %e, "Session lookup failed");
                return AppError::internal("Session lookup failed").into_response();
            }
        }
    } else {
        warn!(path = %request.uri().path(), "Unauthorized request - no session");
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the API router
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
    });

    let protected_routes = Router::new()
        .route("/me", get(handlers::get_me))
        .route("/logout", post(handlers::logout))
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(handlers::get_transaction).delete(handlers::delete_transaction),
        )
        .route("/monthly-aggregates", get(handlers::list_monthly_aggregates))
        .route("/forecast", get(handlers::get_forecast))
        .route("/reports/summary", get(handlers::report_summary))
        .route("/reports/dashboard", get(handlers::report_dashboard))
        .route("/reports/by-business", get(handlers::report_by_business))
        .route(
            "/employees",
            get(handlers::list_employees).post(handlers::create_employee),
        )
        .route(
            "/employees/:id",
            get(handlers::get_employee)
                .put(handlers::update_employee)
                .delete(handlers::delete_employee),
        )
        .route("/export/transactions", get(handlers::export_transactions))
        .route("/export/full", get(handlers::export_full))
        .route("/import/full", post(handlers::import_full))
        .route("/audit", get(handlers::list_audit_log))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/login", post(handlers::login))
        .merge(protected_routes);

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true)
    };

    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'",
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server with default configuration
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    serve_with_config(db, host, port, static_dir, ServerConfig::default()).await
}

/// Start the server
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if config.require_auth && config.password_gate.is_none() {
        anyhow::bail!(
            "Authentication is enabled but no master password is configured. Set {} or use --no-auth.",
            tally_core::auth::MASTER_PASSWORD_ENV
        );
    }

    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }

    match db.purge_expired_sessions() {
        Ok(count) if count > 0 => info!("Removed {} expired session(s)", count),
        Ok(_) => {}
        Err(e) => warn!("Failed to purge expired sessions: {}", e),
    }

    let app = create_router(db, static_dir, config)
        .into_make_service_with_connect_info::<std::net::SocketAddr>();
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map core errors that are the caller's fault to 4xx, everything else to 500
    pub fn from_core(err: tally_core::Error) -> Self {
        match err {
            tally_core::Error::InvalidData(msg) => Self::bad_request(&msg),
            tally_core::Error::NotFound(msg) => Self::not_found(&msg),
            tally_core::Error::Auth(msg) => Self::unauthorized(&msg),
            other => other.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
