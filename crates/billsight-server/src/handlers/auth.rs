//! Authentication-related handlers

use axum::http::HeaderMap;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{AppError, AppState, LOCAL_USER};

/// Response for the /api/me endpoint
#[derive(Serialize)]
pub struct MeResponse {
    /// The authenticated user's email or identifier
    pub user: String,
    /// Numeric id the user's records are stored under
    pub user_id: i64,
    /// How the user was authenticated
    pub auth_method: String,
}

/// GET /api/me - Get the currently authenticated user
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AppError> {
    let (user, user_id) = state.current_user(&headers)?;

    let auth_method = match user.as_str() {
        "api-key" => "api_key",
        LOCAL_USER => "none",
        _ => "header",
    };

    Ok(Json(MeResponse {
        user,
        user_id,
        auth_method: auth_method.to_string(),
    }))
}

/// Liveness response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /api/health - Liveness check (no auth)
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
