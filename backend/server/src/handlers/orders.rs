use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use ledger::{
    Collection, Store, decode_all, encode,
    models::{Order, OrderInput, touch},
};
use tracing::info;

use crate::{
    error::AppError,
    state::AppState,
    utils::{Payload, Success, created, ensure_exists, find_or_404, success},
};

pub(crate) const ORDER_NOT_FOUND: &str = "order not found";
pub(crate) const TABLE_NOT_FOUND: &str = "table not found";

/// Writes a new order, checking its table first when one is given.
pub(crate) async fn place_order(store: &dyn Store, order: &Order) -> Result<(), AppError> {
    if let Some(table_id) = &order.table_id {
        ensure_exists(store, Collection::Table, table_id, TABLE_NOT_FOUND).await?;
    }

    store.insert_one(Collection::Order, encode(order)?).await?;

    info!("Created order {}", order.order_id);
    Ok(())
}

pub async fn list_orders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Success<Vec<Order>>>, AppError> {
    let orders = decode_all(state.store.find_all(Collection::Order).await?)?;

    Ok(success(orders))
}

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<Success<Order>>, AppError> {
    let order =
        find_or_404(state.store.as_ref(), Collection::Order, &order_id, ORDER_NOT_FOUND).await?;

    Ok(success(order))
}

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Payload(input): Payload<OrderInput>,
) -> Result<impl IntoResponse, AppError> {
    let order = input.into_order(Utc::now())?;
    place_order(state.store.as_ref(), &order).await?;

    Ok(created(order))
}

pub async fn update_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    Payload(input): Payload<OrderInput>,
) -> Result<Json<Success<Order>>, AppError> {
    let store = state.store.as_ref();
    ensure_exists(store, Collection::Order, &order_id, ORDER_NOT_FOUND).await?;

    if let Some(table_id) = &input.table_id {
        ensure_exists(store, Collection::Table, table_id, TABLE_NOT_FOUND).await?;
    }

    let mut set = input.changes();
    touch(&mut set, Utc::now());

    store.update_by_id(Collection::Order, &order_id, set).await?;

    Ok(success(
        find_or_404(store, Collection::Order, &order_id, ORDER_NOT_FOUND).await?,
    ))
}
