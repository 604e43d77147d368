//! Bill handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{AppError, AppState, SuccessResponse};
use billsight_core::db::BillFilter;
use billsight_core::models::{
    Bill, BillCorrection, BillStats, BillStatus, CorrectableField, NewBill,
};

/// Query parameters for listing bills and bill stats
#[derive(Debug, Default, Deserialize)]
pub struct ListBillsQuery {
    pub status: Option<String>,
    /// Search bill number, vendor and notes
    pub search: Option<String>,
    /// Start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// End date (YYYY-MM-DD)
    pub to: Option<String>,
}

impl ListBillsQuery {
    fn to_filter(&self) -> Result<BillFilter<'_>, AppError> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<BillStatus>)
            .transpose()
            .map_err(|e| AppError::bad_request(&e))?;

        let from_date = parse_date(self.from.as_deref(), "from")?;
        let to_date = parse_date(self.to.as_deref(), "to")?;

        Ok(BillFilter::new()
            .status(status)
            .search(self.search.as_deref())
            .since(from_date)
            .until(to_date))
    }
}

fn parse_date(raw: Option<&str>, name: &str) -> Result<Option<NaiveDate>, AppError> {
    raw.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| {
            AppError::bad_request(&format!("Invalid {} date format (use YYYY-MM-DD)", name))
        })
}

/// GET /api/bills - List the caller's bills
pub async fn list_bills(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBillsQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<Bill>>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;
    let filter = query.to_filter()?;

    let bills = state.db.list_bills(user_id, &filter)?;

    state.db.log_audit(
        &user_email,
        "list",
        Some("bill"),
        None,
        Some(&format!(
            "count={}, search={:?}, status={:?}",
            bills.len(),
            query.search,
            query.status
        )),
    )?;

    Ok(Json(bills))
}

/// POST /api/bills - Record a bill with its items
pub async fn create_bill(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewBill>,
) -> Result<Json<Bill>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;

    let bill = state.db.create_bill(user_id, &body)?;

    state.db.log_audit(
        &user_email,
        "create",
        Some("bill"),
        Some(bill.id),
        Some(&format!("items={}", bill.items.len())),
    )?;

    Ok(Json(bill))
}

/// GET /api/bills/stats - Totals over the filtered bills
pub async fn bill_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBillsQuery>,
    headers: HeaderMap,
) -> Result<Json<BillStats>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;
    let filter = query.to_filter()?;

    let stats = state.db.bill_stats(user_id, &filter)?;

    state
        .db
        .log_audit(&user_email, "stats", Some("bill"), None, None)?;

    Ok(Json(stats))
}

/// GET /api/bills/:id - Get a bill with items
pub async fn get_bill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Bill>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;

    let bill = state
        .db
        .get_bill(user_id, id)?
        .ok_or_else(|| AppError::not_found("Bill not found"))?;

    state
        .db
        .log_audit(&user_email, "view", Some("bill"), Some(id), None)?;

    Ok(Json(bill))
}

/// DELETE /api/bills/:id - Delete a bill
pub async fn delete_bill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;

    state.db.delete_bill(user_id, id)?;

    state
        .db
        .log_audit(&user_email, "delete", Some("bill"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// Request body for correcting a bill field
#[derive(Debug, Deserialize)]
pub struct CorrectBillRequest {
    pub field_name: String,
    pub original_value: String,
    pub corrected_value: String,
}

/// POST /api/bills/:id/correct - Correct one bill field
pub async fn correct_bill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<CorrectBillRequest>,
) -> Result<Json<BillCorrection>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;

    let field: CorrectableField = body
        .field_name
        .parse()
        .map_err(|e: String| AppError::bad_request(&e))?;

    let correction = state.db.correct_bill(
        user_id,
        id,
        field,
        &body.original_value,
        &body.corrected_value,
    )?;

    state.db.log_audit(
        &user_email,
        "correct",
        Some("bill"),
        Some(id),
        Some(&format!("field={}", field)),
    )?;

    Ok(Json(correction))
}

/// GET /api/bills/:id/corrections - Correction history of a bill
pub async fn list_corrections(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Vec<BillCorrection>>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;

    let corrections = state.db.list_corrections(user_id, id)?;

    state
        .db
        .log_audit(&user_email, "list", Some("bill_correction"), Some(id), None)?;

    Ok(Json(corrections))
}

/// Request body for updating bill status
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BillStatus,
}

/// PUT /api/bills/:id/status - Set a bill's verification status
pub async fn update_bill_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let (user_email, user_id) = state.current_user(&headers)?;

    state.db.update_bill_status(user_id, id, body.status)?;

    state.db.log_audit(
        &user_email,
        "update_status",
        Some("bill"),
        Some(id),
        Some(&format!("status={}", body.status)),
    )?;

    Ok(Json(SuccessResponse { success: true }))
}
