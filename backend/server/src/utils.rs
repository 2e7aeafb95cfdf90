use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query},
    http::StatusCode,
};
use ledger::{Collection, Store, decode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::AppError;

const DEFAULT_PER_PAGE: i64 = 10;

/// JSON body whose rejections answer with the usual failure envelope.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct Payload<T>(pub T);

/// Query string whose rejections answer with the usual failure envelope.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub status: &'static str,
    pub data: T,
}

pub fn success<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success {
        status: "success",
        data,
    })
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Success<T>>) {
    (StatusCode::CREATED, success(data))
}

/// Listing window. Values arrive as raw strings so that junk falls back to
/// defaults instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(rename = "resultPerPage", alias = "recordsPerPage")]
    pub per_page: Option<String>,
    pub page: Option<String>,
    #[serde(rename = "startIndex")]
    pub start_index: Option<String>,
}

fn parse(value: &Option<String>) -> Option<i64> {
    value.as_deref().and_then(|v| v.trim().parse().ok())
}

impl PageQuery {
    /// `(start, limit)`, with `startIndex` overriding the one derived from `page`.
    pub fn window(&self) -> (u64, u64) {
        let per_page = parse(&self.per_page)
            .filter(|n| *n >= 1)
            .unwrap_or(DEFAULT_PER_PAGE);
        let page = parse(&self.page).filter(|n| *n >= 1).unwrap_or(1);

        let start = parse(&self.start_index)
            .filter(|n| *n >= 0)
            .unwrap_or_else(|| (page - 1).saturating_mul(per_page));

        (
            u64::try_from(start).unwrap_or(0),
            u64::try_from(per_page).unwrap_or(0),
        )
    }
}

pub async fn find_or_404<T: DeserializeOwned>(
    store: &dyn Store,
    collection: Collection,
    id: &str,
    missing: &'static str,
) -> Result<T, AppError> {
    let document = store
        .find_by_id(collection, id)
        .await?
        .ok_or(AppError::NotFound(missing))?;

    Ok(decode(document)?)
}

pub async fn ensure_exists(
    store: &dyn Store,
    collection: Collection,
    id: &str,
    missing: &'static str,
) -> Result<(), AppError> {
    store
        .find_by_id(collection, id)
        .await?
        .map(|_| ())
        .ok_or(AppError::NotFound(missing))
}
