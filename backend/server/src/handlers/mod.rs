//! One module per collection. Handlers take the shared state, parse the
//! request, check whatever related document must exist, then write or read
//! through the [`ledger::Store`].
pub mod foods;
pub mod invoices;
pub mod menus;
pub mod order_items;
pub mod orders;
pub mod tables;
pub mod users;

use axum::Json;
use serde_json::{Value, json};

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "success", "data": "ok" }))
}
