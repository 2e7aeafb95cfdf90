use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use ledger::{
    Collection, decode_all, encode,
    models::{Menu, MenuInput, touch},
};
use tracing::info;

use crate::{
    error::AppError,
    state::AppState,
    utils::{Payload, Success, created, ensure_exists, find_or_404, success},
};

const MENU_NOT_FOUND: &str = "menu not found";

pub async fn list_menus(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Success<Vec<Menu>>>, AppError> {
    let menus = decode_all(state.store.find_all(Collection::Menu).await?)?;

    Ok(success(menus))
}

pub async fn get_menu(
    State(state): State<Arc<AppState>>,
    Path(menu_id): Path<String>,
) -> Result<Json<Success<Menu>>, AppError> {
    let menu = find_or_404(state.store.as_ref(), Collection::Menu, &menu_id, MENU_NOT_FOUND).await?;

    Ok(success(menu))
}

pub async fn create_menu(
    State(state): State<Arc<AppState>>,
    Payload(input): Payload<MenuInput>,
) -> Result<impl IntoResponse, AppError> {
    let menu = input.into_menu(Utc::now())?;
    state.store.insert_one(Collection::Menu, encode(&menu)?).await?;

    info!("Created menu {} ({})", menu.menu_id, menu.name);
    Ok(created(menu))
}

/// Menus can only be rescheduled into the future, so both dates are mandatory here.
pub async fn update_menu(
    State(state): State<Arc<AppState>>,
    Path(menu_id): Path<String>,
    Payload(input): Payload<MenuInput>,
) -> Result<Json<Success<Menu>>, AppError> {
    let store = state.store.as_ref();
    ensure_exists(store, Collection::Menu, &menu_id, MENU_NOT_FOUND).await?;

    let now = Utc::now();
    let mut set = input.changes(now)?;
    touch(&mut set, now);

    store.update_by_id(Collection::Menu, &menu_id, set).await?;

    Ok(success(
        find_or_404(store, Collection::Menu, &menu_id, MENU_NOT_FOUND).await?,
    ))
}
