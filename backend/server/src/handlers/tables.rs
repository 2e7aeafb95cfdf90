use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use ledger::{
    Collection, decode_all, encode,
    models::{Table, TableInput, touch},
};
use tracing::info;

use crate::{
    error::AppError,
    state::AppState,
    utils::{Payload, Success, created, ensure_exists, find_or_404, success},
};

const TABLE_NOT_FOUND: &str = "table not found";

pub async fn list_tables(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Success<Vec<Table>>>, AppError> {
    let tables = decode_all(state.store.find_all(Collection::Table).await?)?;

    Ok(success(tables))
}

pub async fn get_table(
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
) -> Result<Json<Success<Table>>, AppError> {
    let table =
        find_or_404(state.store.as_ref(), Collection::Table, &table_id, TABLE_NOT_FOUND).await?;

    Ok(success(table))
}

pub async fn create_table(
    State(state): State<Arc<AppState>>,
    Payload(input): Payload<TableInput>,
) -> Result<impl IntoResponse, AppError> {
    let table = input.into_table(Utc::now())?;
    state.store.insert_one(Collection::Table, encode(&table)?).await?;

    info!("Created table {} (number {})", table.table_id, table.table_number);
    Ok(created(table))
}

pub async fn update_table(
    State(state): State<Arc<AppState>>,
    Path(table_id): Path<String>,
    Payload(input): Payload<TableInput>,
) -> Result<Json<Success<Table>>, AppError> {
    let store = state.store.as_ref();
    ensure_exists(store, Collection::Table, &table_id, TABLE_NOT_FOUND).await?;

    let mut set = input.changes()?;
    touch(&mut set, Utc::now());

    store.update_by_id(Collection::Table, &table_id, set).await?;

    Ok(success(
        find_or_404(store, Collection::Table, &table_id, TABLE_NOT_FOUND).await?,
    ))
}
