//! # MongoDB
//!
//! Document database holding every restaurant collection.
//!
//! ## Requirements
//!
//! - Lookups by business id (`food_id`, `order_id`, ...), backed by unique indexes
//! - Partial updates with upsert semantics
//! - Server-side aggregation for paginated listings and order bills
//!
//! ## Commands
//!
//! Local instance for development.
//! ```sh
//! docker run --rm -p 27017:27017 mongo:7
//! ```
//!
//! Inspect a bill by hand.
//! ```sh
//! mongosh restaurant --eval 'db.order_item.find({ order_id: "<id>" })'
//! ```
use std::sync::Arc;

use anyhow::Context;
use ledger::{MongoStore, Store, redact_uri};
use tracing::info;

use crate::config::Config;

pub async fn init_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    let target = redact_uri(&config.mongo_url);
    info!("Connecting to MongoDB at {target}");

    let store = MongoStore::connect(&config.mongo_url, &config.mongo_db)
        .await
        .with_context(|| format!("Failed to connect to MongoDB at {target}"))?;

    Ok(Arc::new(store))
}
