//! Documentation of a restaurant management REST API.
//!
//!
//!
//! # General Infrastructure
//! - Single axum server in front of one MongoDB database
//! - One collection per entity: food, menu, table, order, order_item, invoice, user
//! - Documents are addressed by their business id (`food_id`, `menu_id`, ...), never by `_id`
//! - Storage sits behind the `ledger::Store` trait, so tests run against an in-memory store
//!
//!
//!
//! # Routes
//!
//! Public.
//! - `POST /users/signup`
//! - `POST /users/login`
//! - `POST /users/refresh`
//! - `GET /health`
//!
//! Everything else needs an access token, either as a `token` header or as
//! `Authorization: Bearer <token>`.
//! - `GET /users`, `GET /users/{id}`
//! - `GET|POST /foods`, `GET|PATCH /foods/{id}`
//! - `GET|POST /menus`, `GET|PATCH /menus/{id}`
//! - `GET|POST /tables`, `GET|PATCH /tables/{id}`
//! - `GET|POST /orders`, `GET|PATCH /orders/{id}`
//! - `GET|POST /order-items`, `GET|PATCH /order-items/{id}`, `GET /order-items-order/{order_id}`
//! - `GET|POST /invoices`, `GET|PATCH /invoices/{id}`
//!
//! Responses are wrapped as `{"status":"success","data":...}` or
//! `{"status":"fail","message":...}`.
//!
//!
//!
//! # Notes
//!
//! ## Pagination
//! Foods take `resultPerPage`, `page` and `startIndex`. Users take `recordsPerPage` and `page`.
//! Junk values fall back to 10 per page, first page. The count and the slice come back from
//! one aggregation, so `total_count` is the size of the whole collection.
//!
//! ## Bills
//! `GET /order-items-order/{order_id}` and the invoice view share one pipeline that joins order
//! items with their food, order and table. `payment_due` is the sum of food prices, rounded
//! to cents.
//!
//! ## Updates
//! `PATCH` only writes the fields present in the body and always bumps `updated_at`.
//! Unknown ids answer 404.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run against a local MongoDB.
//! ```sh
//! MONGO_URL=mongodb://localhost:27017 TOKEN_SECRET=change-me RUST_LOG=info cargo run -p backend
//! ```
//!
//! Seed menus, foods and tables.
//! ```sh
//! cargo run -p seed -- fixture.json
//! ```
//!
//!
//!
//! # Configuration
//!
//! | Variable | Default |
//! |---|---|
//! | `RUST_PORT` | `8000` |
//! | `MONGO_URL` | `mongodb://localhost:27017` |
//! | `MONGO_DB` | `restaurant` |
//! | `REQUEST_TIMEOUT_SECS` | `100` |
//! | `TOKEN_SECRET` | random per boot, read from `/run/secrets` first |
//! | `ACCESS_TOKEN_TTL_HOURS` | `24` |
//! | `REFRESH_TOKEN_TTL_HOURS` | `168` |
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{
        HeaderName, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::from_fn_with_state,
    routing::get,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod utils;

use auth::{TOKEN_HEADER, require_token};
use handlers::health_handler;
use routes::{protected_routes, public_routes};
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(TOKEN_HEADER),
        ])
        .max_age(Duration::from_secs(60 * 60));

    let protected =
        protected_routes().route_layer(from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(health_handler))
        .merge(public_routes())
        .merge(protected)
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
