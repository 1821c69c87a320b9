//! Item (catalog) handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use market_core::{Item, ItemCondition, ItemMode, ItemStatus};
use market_db::{ItemFilter, UpdateItem};

use crate::error::ApiResult;
use crate::identity::Caller;
use crate::service::catalog::NewListing;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct CreateItemBody {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub condition: ItemCondition,
    pub mode: ItemMode,
    pub buy_price_cents: Option<i64>,
    pub daily_price_cents: Option<i64>,
    pub deposit_cents: Option<i64>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub owner_id: Option<String>,
    pub category: Option<String>,
    pub status: Option<ItemStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub condition: Option<ItemCondition>,
    pub buy_price_cents: Option<i64>,
    pub daily_price_cents: Option<i64>,
    pub deposit_cents: Option<i64>,
    pub images: Option<Vec<String>>,
}

pub async fn create(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Json(body): Json<CreateItemBody>,
) -> ApiResult<(StatusCode, Json<Item>)> {
    let item = state
        .catalog()
        .create(
            &user_id,
            NewListing {
                title: body.title,
                description: body.description,
                category: body.category,
                condition: body.condition,
                mode: body.mode,
                buy_price_cents: body.buy_price_cents,
                daily_price_cents: body.daily_price_cents,
                deposit_cents: body.deposit_cents,
                images: body.images,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListItemsQuery>,
) -> ApiResult<Json<Vec<Item>>> {
    let filter = ItemFilter {
        owner_id: query.owner_id,
        category: query.category,
        status: query.status,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 500);

    Ok(Json(state.catalog().list(filter, limit).await?))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Item>> {
    Ok(Json(state.catalog().get(&id).await?))
}

pub async fn update(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateItemBody>,
) -> ApiResult<Json<Item>> {
    let update = UpdateItem {
        title: body.title,
        description: body.description,
        category: body.category,
        condition: body.condition,
        buy_price_cents: body.buy_price_cents,
        daily_price_cents: body.daily_price_cents,
        deposit_cents: body.deposit_cents,
        images: body.images,
    };

    Ok(Json(state.catalog().update(&user_id, &id, update).await?))
}

pub async fn delete(
    Caller(user_id): Caller,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.catalog().delete(&user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
