use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use ledger::{
    Bill, Collection, decode_all, encode,
    models::{Order, OrderItem, OrderItemInput, touch},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::orders::place_order;
use crate::{
    error::AppError,
    state::AppState,
    utils::{Payload, Success, created, ensure_exists, find_or_404, success},
};

const ORDER_ITEM_NOT_FOUND: &str = "order item not found";
const NO_ITEMS_FOR_ORDER: &str = "no order items for this order";

/// A whole ticket: the items go into one freshly created order.
#[derive(Debug, Default, Deserialize)]
pub struct OrderItemPack {
    pub table_id: Option<String>,
    #[serde(default)]
    pub order_items: Vec<OrderItemInput>,
}

#[derive(Debug, Serialize)]
pub struct PlacedItems {
    pub order_id: String,
    pub order_item_ids: Vec<String>,
}

pub async fn list_order_items(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Success<Vec<OrderItem>>>, AppError> {
    let items = decode_all(state.store.find_all(Collection::OrderItem).await?)?;

    Ok(success(items))
}

pub async fn get_order_item(
    State(state): State<Arc<AppState>>,
    Path(order_item_id): Path<String>,
) -> Result<Json<Success<OrderItem>>, AppError> {
    let item = find_or_404(
        state.store.as_ref(),
        Collection::OrderItem,
        &order_item_id,
        ORDER_ITEM_NOT_FOUND,
    )
    .await?;

    Ok(success(item))
}

/// The bill for one order: joined lines, table number and amount due.
pub async fn order_items_by_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<Success<Bill>>, AppError> {
    let bill = state
        .store
        .order_bill(&order_id)
        .await?
        .ok_or(AppError::NotFound(NO_ITEMS_FOR_ORDER))?;

    Ok(success(bill))
}

pub async fn create_order_items(
    State(state): State<Arc<AppState>>,
    Payload(pack): Payload<OrderItemPack>,
) -> Result<impl IntoResponse, AppError> {
    if pack.order_items.is_empty() {
        return Err(ledger::ValidationError::new("order_items", "must not be empty").into());
    }

    // Nothing is written until every item is known to be valid.
    for item in &pack.order_items {
        item.validate()?;
    }

    let now = Utc::now();
    let order = Order::new(now, pack.table_id, now);
    place_order(state.store.as_ref(), &order).await?;

    let documents = pack
        .order_items
        .into_iter()
        .map(|input| {
            let item = input.into_item(&order.order_id, now)?;
            Ok(encode(&item)?)
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let order_item_ids = state
        .store
        .insert_many(Collection::OrderItem, documents)
        .await?;

    info!(
        "Placed {} items on order {}",
        order_item_ids.len(),
        order.order_id
    );

    Ok(created(PlacedItems {
        order_id: order.order_id,
        order_item_ids,
    }))
}

pub async fn update_order_item(
    State(state): State<Arc<AppState>>,
    Path(order_item_id): Path<String>,
    Payload(input): Payload<OrderItemInput>,
) -> Result<Json<Success<OrderItem>>, AppError> {
    let store = state.store.as_ref();
    ensure_exists(store, Collection::OrderItem, &order_item_id, ORDER_ITEM_NOT_FOUND).await?;

    let mut set = input.changes()?;
    touch(&mut set, Utc::now());

    store
        .update_by_id(Collection::OrderItem, &order_item_id, set)
        .await?;

    Ok(success(
        find_or_404(store, Collection::OrderItem, &order_item_id, ORDER_ITEM_NOT_FOUND).await?,
    ))
}
