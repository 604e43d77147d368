//! Suggestion inbox handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState};
use billsight_core::models::{NewSuggestion, Suggestion};

/// Query params for listing suggestions
#[derive(Debug, Deserialize)]
pub struct ListSuggestionsQuery {
    /// Include dismissed suggestions
    #[serde(default)]
    pub include_dismissed: bool,
}

/// GET /api/analytics/suggestions - List the caller's suggestions
pub async fn list_suggestions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListSuggestionsQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<Suggestion>>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;

    let suggestions = state
        .db
        .list_suggestions(user_id, query.include_dismissed)?;

    state.db.log_audit(
        &user_email,
        "list",
        Some("suggestion"),
        None,
        Some(&format!("count={}", suggestions.len())),
    )?;

    Ok(Json(suggestions))
}

/// POST /api/analytics/suggestions - Create a suggestion
pub async fn create_suggestion(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewSuggestion>,
) -> Result<Json<Suggestion>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;

    let suggestion = state.db.create_suggestion(user_id, &body)?;

    state.db.log_audit(
        &user_email,
        "create",
        Some("suggestion"),
        Some(suggestion.id),
        Some(&format!("type={}", suggestion.suggestion_type)),
    )?;

    Ok(Json(suggestion))
}

/// GET /api/analytics/suggestions/:id - Get one suggestion
pub async fn get_suggestion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Suggestion>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;

    let suggestion = state
        .db
        .get_suggestion(user_id, id)?
        .ok_or_else(|| AppError::not_found("Suggestion not found"))?;

    state
        .db
        .log_audit(&user_email, "view", Some("suggestion"), Some(id), None)?;

    Ok(Json(suggestion))
}

/// POST /api/analytics/suggestions/:id/mark_read - Mark a suggestion as read
pub async fn mark_suggestion_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Suggestion>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;

    let suggestion = state.db.mark_suggestion_read(user_id, id)?;

    state
        .db
        .log_audit(&user_email, "mark_read", Some("suggestion"), Some(id), None)?;

    Ok(Json(suggestion))
}

/// POST /api/analytics/suggestions/:id/dismiss - Dismiss a suggestion
pub async fn dismiss_suggestion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Suggestion>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;

    let suggestion = state.db.dismiss_suggestion(user_id, id)?;

    state
        .db
        .log_audit(&user_email, "dismiss", Some("suggestion"), Some(id), None)?;

    Ok(Json(suggestion))
}
