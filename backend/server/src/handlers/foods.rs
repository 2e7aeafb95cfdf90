use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use ledger::{
    Collection, decode_all, encode,
    models::{Food, FoodInput, touch},
};
use serde::Serialize;
use tracing::info;

use crate::{
    error::AppError,
    state::AppState,
    utils::{PageQuery, Payload, QueryParams, Success, created, ensure_exists, find_or_404, success},
};

const FOOD_NOT_FOUND: &str = "food not found";
const MENU_NOT_FOUND: &str = "menu not found";

#[derive(Debug, Serialize)]
pub struct FoodPage {
    pub total_count: u64,
    pub food_items: Vec<Food>,
}

pub async fn list_foods(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<Success<FoodPage>>, AppError> {
    let (start, limit) = query.window();
    let page = state.store.page(Collection::Food, start, limit, &[]).await?;

    Ok(success(FoodPage {
        total_count: page.total_count,
        food_items: decode_all(page.items)?,
    }))
}

pub async fn get_food(
    State(state): State<Arc<AppState>>,
    Path(food_id): Path<String>,
) -> Result<Json<Success<Food>>, AppError> {
    let food = find_or_404(state.store.as_ref(), Collection::Food, &food_id, FOOD_NOT_FOUND).await?;

    Ok(success(food))
}

pub async fn create_food(
    State(state): State<Arc<AppState>>,
    Payload(input): Payload<FoodInput>,
) -> Result<impl IntoResponse, AppError> {
    let food = input.into_food(Utc::now())?;

    ensure_exists(state.store.as_ref(), Collection::Menu, &food.menu_id, MENU_NOT_FOUND).await?;
    state.store.insert_one(Collection::Food, encode(&food)?).await?;

    info!("Created food {} on menu {}", food.food_id, food.menu_id);
    Ok(created(food))
}

pub async fn update_food(
    State(state): State<Arc<AppState>>,
    Path(food_id): Path<String>,
    Payload(input): Payload<FoodInput>,
) -> Result<Json<Success<Food>>, AppError> {
    let store = state.store.as_ref();
    ensure_exists(store, Collection::Food, &food_id, FOOD_NOT_FOUND).await?;

    let mut set = input.changes()?;
    if let Some(menu_id) = &input.menu_id {
        ensure_exists(store, Collection::Menu, menu_id, MENU_NOT_FOUND).await?;
    }
    touch(&mut set, Utc::now());

    store.update_by_id(Collection::Food, &food_id, set).await?;

    Ok(success(
        find_or_404(store, Collection::Food, &food_id, FOOD_NOT_FOUND).await?,
    ))
}
