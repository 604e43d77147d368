//! Billsight Web Server
//!
//! Axum-based REST API for the Billsight bill analytics tool.
//!
//! Security features:
//! - Header or API key authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Every request scoped to the calling user
//! - Audit logging for all API access (reads and writes)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use billsight_core::db::Database;
use billsight_core::{AnalyticsConfig, AnalyticsEngine, Clock, SystemClock};

mod handlers;

/// Cloudflare Access header for authenticated user email
const CF_ACCESS_USER_HEADER: &str = "cf-access-authenticated-user-email";

/// Identity header set by a trusted reverse proxy
const USER_EMAIL_HEADER: &str = "x-user-email";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Environment variable with comma-separated API keys
pub const API_KEYS_ENV: &str = "BILLSIGHT_API_KEYS";

/// Identity used when authentication is disabled and no identity header is sent
pub const LOCAL_USER: &str = "local-dev";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// API keys for service authentication
    /// Format: "Bearer <key>" in Authorization header
    pub api_keys: Vec<String>,
    /// Period stepping and top vendor limit for analyses
    pub analytics: AnalyticsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
            analytics: AnalyticsConfig::default(),
        }
    }
}

/// Parse a comma-separated list of API keys
pub fn parse_api_keys(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// Source of "today" for period resolution
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Analytics engine over this server's database
    pub fn engine(&self) -> AnalyticsEngine<'_> {
        AnalyticsEngine::new(&self.db, self.clock.as_ref(), self.config.analytics)
    }

    /// Resolve the caller to (email, user id), creating the user on first contact
    pub fn current_user(&self, headers: &HeaderMap) -> Result<(String, i64), AppError> {
        let email = get_user_email(headers);
        let user_id = self.db.ensure_user(&email)?;
        Ok((email, user_id))
    }
}

/// Authentication middleware - validates identity headers or API keys
///
/// # Security Notes
///
/// **Identity headers**: `CF-Access-Authenticated-User-Email` (or `X-User-Email`)
/// is trusted as-is. This is safe behind Cloudflare Tunnel or a proxy that
/// strips/rewrites these headers, but can be spoofed if the server is exposed
/// directly to the internet.
///
/// **API keys**: Compared using constant-time comparison to prevent timing attacks.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    if let Some(email) = header_identity(request.headers()) {
        debug!(user = %email, path = %request.uri().path(), "Authenticated via identity header");
        return next.run(request).await;
    }

    // Check for API key in Authorization header (Bearer token)
    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        debug!(user = "api-key", path = %request.uri().path(), "Authenticated via API key");
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key against the configured keys using constant-time comparison
/// to prevent timing attacks.
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    for key in valid_keys {
        let key_bytes = key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        if provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes)) {
            return true;
        }
    }
    false
}

fn header_identity(headers: &HeaderMap) -> Option<String> {
    [CF_ACCESS_USER_HEADER, USER_EMAIL_HEADER]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

/// Extract the caller's identity from request headers
/// Returns the header email, "api-key" for API key auth, or "local-dev" for unauthenticated
pub fn get_user_email(headers: &HeaderMap) -> String {
    if let Some(email) = header_identity(headers) {
        return email;
    }

    if headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .is_some()
    {
        return "api-key".to_string();
    }

    LOCAL_USER.to_string()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    create_router_with_clock(db, config, Arc::new(SystemClock))
}

/// Create the application router with a custom clock (for testing)
pub fn create_router_with_clock(
    db: Database,
    config: ServerConfig,
    clock: Arc<dyn Clock>,
) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        clock,
    });

    let api_routes = Router::new()
        // Auth
        .route("/me", get(handlers::get_me))
        // Analytics
        .route("/analytics/weekly", get(handlers::weekly_analysis))
        .route("/analytics/monthly", get(handlers::monthly_analysis))
        .route("/analytics/dashboard", get(handlers::dashboard_summary))
        // Suggestions
        .route(
            "/analytics/suggestions",
            get(handlers::list_suggestions).post(handlers::create_suggestion),
        )
        .route("/analytics/suggestions/:id", get(handlers::get_suggestion))
        .route(
            "/analytics/suggestions/:id/mark_read",
            post(handlers::mark_suggestion_read),
        )
        .route(
            "/analytics/suggestions/:id/dismiss",
            post(handlers::dismiss_suggestion),
        )
        // Bills
        .route("/bills", get(handlers::list_bills).post(handlers::create_bill))
        .route("/bills/stats", get(handlers::bill_stats))
        .route(
            "/bills/:id",
            get(handlers::get_bill).delete(handlers::delete_bill),
        )
        .route("/bills/:id/correct", post(handlers::correct_bill))
        .route("/bills/:id/corrections", get(handlers::list_corrections))
        .route("/bills/:id/status", put(handlers::update_bill_status))
        // Audit log
        .route("/audit", get(handlers::list_audit_log));

    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        // Allow specified origins
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        // Health stays reachable without credentials
        .route("/api/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    } else if config.api_keys.is_empty() {
        info!(
            "No API keys configured ({} unset); only identity headers will authenticate",
            API_KEYS_ENV
        );
    }

    info!(
        month_stepping = config.analytics.month_stepping.as_str(),
        top_vendor_limit = config.analytics.top_vendor_limit,
        "Analytics configuration"
    );

    let app = create_router(db, config);
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

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
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

        // Caller mistakes surface with their message; everything else is opaque
        match err.downcast_ref::<billsight_core::Error>() {
            Some(billsight_core::Error::Validation(msg)) => {
                warn!(error = %msg, "Rejected request");
                return Self::bad_request(msg);
            }
            Some(billsight_core::Error::NotFound(msg)) => {
                return Self::not_found(&format!("Not found: {}", msg));
            }
            _ => {}
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
