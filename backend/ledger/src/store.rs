//! # Store
//!
//! Seam between the HTTP handlers and the document database.
//!
//! Everything crosses the seam as raw BSON documents keyed by a business id
//! (`food_id`, `menu_id`, ...). Typed models are encoded on the way in and
//! decoded on the way out with [`encode`] and [`decode`].
use async_trait::async_trait;
use mongodb::bson::{self, Document};
use serde::{Serialize, de::DeserializeOwned};

use crate::{bill::Bill, error::StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Food,
    Menu,
    Table,
    Order,
    OrderItem,
    Invoice,
    User,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Food,
        Collection::Menu,
        Collection::Table,
        Collection::Order,
        Collection::OrderItem,
        Collection::Invoice,
        Collection::User,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Collection::Food => "food",
            Collection::Menu => "menu",
            Collection::Table => "table",
            Collection::Order => "order",
            Collection::OrderItem => "order_item",
            Collection::Invoice => "invoice",
            Collection::User => "user",
        }
    }

    /// Field every route addresses documents by.
    pub const fn id_field(self) -> &'static str {
        match self {
            Collection::Food => "food_id",
            Collection::Menu => "menu_id",
            Collection::Table => "table_id",
            Collection::Order => "order_id",
            Collection::OrderItem => "order_item_id",
            Collection::Invoice => "invoice_id",
            Collection::User => "user_id",
        }
    }

    /// Fields no two documents of the collection may share.
    pub const fn unique_fields(self) -> &'static [&'static str] {
        match self {
            Collection::Food => &["food_id"],
            Collection::Menu => &["menu_id"],
            Collection::Table => &["table_id"],
            Collection::Order => &["order_id"],
            Collection::OrderItem => &["order_item_id"],
            Collection::Invoice => &["invoice_id"],
            Collection::User => &["user_id", "email"],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub total_count: u64,
    pub items: Vec<Document>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<String>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_all(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError>;

    /// Equality match on every field of `filter`.
    async fn find_one(
        &self,
        collection: Collection,
        filter: Document,
    ) -> Result<Option<Document>, StoreError>;

    async fn count(&self, collection: Collection, filter: Document) -> Result<u64, StoreError>;

    async fn insert_one(&self, collection: Collection, document: Document)
    -> Result<(), StoreError>;

    /// Returns the business ids of the inserted documents, in input order.
    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> Result<Vec<String>, StoreError>;

    /// `$set` the given fields on the document with business id `id`, inserting it if missing.
    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        set: Document,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Skips `start` documents and returns at most `limit`, with `hidden` fields stripped.
    async fn page(
        &self,
        collection: Collection,
        start: u64,
        limit: u64,
        hidden: &[&str],
    ) -> Result<Page, StoreError>;

    /// Joins the order's items with their food, order and table documents.
    /// `None` when the order has no items.
    async fn order_bill(&self, order_id: &str) -> Result<Option<Bill>, StoreError>;
}

pub fn encode<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    Ok(bson::to_document(value)?)
}

pub fn decode<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    Ok(bson::from_document(document)?)
}

pub fn decode_all<T: DeserializeOwned>(documents: Vec<Document>) -> Result<Vec<T>, StoreError> {
    documents.into_iter().map(decode).collect()
}

pub(crate) fn business_ids(collection: Collection, documents: &[Document]) -> Vec<String> {
    documents
        .iter()
        .map(|doc| {
            doc.get_str(collection.id_field())
                .map(str::to_string)
                .unwrap_or_default()
        })
        .collect()
}

pub(crate) fn id_filter(collection: Collection, id: &str) -> Document {
    let mut filter = Document::new();
    filter.insert(collection.id_field(), id);
    filter
}
