use mongodb::bson;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("Failed to decode document: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("Duplicate key: {0}")]
    Duplicate(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    pub fn required(field: &'static str) -> Self {
        Self::new(field, "is required")
    }
}
