//! Analytics handlers - weekly/monthly snapshots and the dashboard

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState};
use billsight_core::models::{DashboardSummary, MonthlyAnalysis, WeeklyAnalysis};
use billsight_core::period::parse_offset;

/// Query parameters for the weekly analysis
#[derive(Debug, Deserialize)]
pub struct WeeklyQuery {
    /// Weeks before the current one (kept as text so bad input is a 400)
    pub week_offset: Option<String>,
    /// "true" recomputes the cached snapshot
    pub refresh: Option<String>,
}

/// Query parameters for the monthly analysis
#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub month_offset: Option<String>,
    pub refresh: Option<String>,
}

fn offset_param(raw: Option<&str>) -> Result<u32, AppError> {
    match raw {
        Some(raw) => Ok(parse_offset(raw)?),
        None => Ok(0),
    }
}

fn refresh_param(raw: Option<&str>) -> bool {
    raw.map(|r| r.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// GET /api/analytics/weekly - Weekly analysis snapshot
pub async fn weekly_analysis(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WeeklyQuery>,
    headers: HeaderMap,
) -> Result<Json<WeeklyAnalysis>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;
    let offset = offset_param(params.week_offset.as_deref())?;
    let refresh = refresh_param(params.refresh.as_deref());

    let analysis = state.engine().weekly_analysis(user_id, offset, refresh)?;

    state.db.log_audit(
        &user_email,
        "weekly_analysis",
        Some("weekly_analysis"),
        Some(analysis.id),
        Some(&format!("offset={}, refresh={}", offset, refresh)),
    )?;

    Ok(Json(analysis))
}

/// GET /api/analytics/monthly - Monthly analysis snapshot
pub async fn monthly_analysis(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MonthlyQuery>,
    headers: HeaderMap,
) -> Result<Json<MonthlyAnalysis>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;
    let offset = offset_param(params.month_offset.as_deref())?;
    let refresh = refresh_param(params.refresh.as_deref());

    let analysis = state.engine().monthly_analysis(user_id, offset, refresh)?;

    state.db.log_audit(
        &user_email,
        "monthly_analysis",
        Some("monthly_analysis"),
        Some(analysis.id),
        Some(&format!("offset={}, refresh={}", offset, refresh)),
    )?;

    Ok(Json(analysis))
}

/// GET /api/analytics/dashboard - Live spend summary
pub async fn dashboard_summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardSummary>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;

    let summary = state.engine().dashboard_summary(user_id)?;

    state
        .db
        .log_audit(&user_email, "dashboard", Some("dashboard"), None, None)?;

    Ok(Json(summary))
}
