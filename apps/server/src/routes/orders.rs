//! Order (buy) handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use market_core::Order;

use crate::error::ApiResult;
use crate::identity::Caller;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    pub item_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

pub async fn create(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Json(body): Json<CreateOrderBody>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = state.orders().create(&user_id, &body.item_id).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 500);
    Ok(Json(state.orders().list(&user_id, limit).await?))
}

pub async fn get_one(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders().get(&user_id, &id).await?))
}

pub async fn complete(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders().complete(&user_id, &id).await?))
}

pub async fn cancel(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders().cancel(&user_id, &id).await?))
}
