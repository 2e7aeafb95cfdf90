use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ledger::{StoreError, ValidationError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidCredentials(&'static str),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(key) => AppError::Conflict(format!("already exists: {key}")),
            other => AppError::Store(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedPayload(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::MalformedPayload(rejection.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload(_)
            | AppError::Validation(_)
            | AppError::InvalidCredentials(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "status": "fail", "message": message }))).into_response()
    }
}
