//! Borrow request handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use market_core::BorrowRequest;

use crate::error::ApiResult;
use crate::identity::Caller;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateBorrowBody {
    pub item_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Lender's verdict on a pending request.
#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub approved: bool,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

pub async fn create(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Json(body): Json<CreateBorrowBody>,
) -> ApiResult<(StatusCode, Json<BorrowRequest>)> {
    let req = state
        .borrows()
        .create(&user_id, &body.item_id, body.start_date, body.end_date)
        .await?;
    Ok((StatusCode::CREATED, Json(req)))
}

pub async fn list(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<BorrowRequest>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 500);
    Ok(Json(state.borrows().list(&user_id, limit).await?))
}

pub async fn get_one(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BorrowRequest>> {
    Ok(Json(state.borrows().get(&user_id, &id).await?))
}

pub async fn decide(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> ApiResult<Json<BorrowRequest>> {
    let req = if body.approved {
        state.borrows().approve(&user_id, &id).await?
    } else {
        let reason = body
            .rejection_reason
            .as_deref()
            .unwrap_or("declined by lender");
        state.borrows().reject(&user_id, &id, reason).await?
    };
    Ok(Json(req))
}

pub async fn mark_returned(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BorrowRequest>> {
    Ok(Json(state.borrows().mark_returned(&user_id, &id).await?))
}

pub async fn confirm_return(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BorrowRequest>> {
    Ok(Json(state.borrows().confirm_return(&user_id, &id).await?))
}
