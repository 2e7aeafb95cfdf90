//! In-process [`Store`] keeping every collection as a `Vec<Document>`.
//!
//! Mirrors what the MongoDB store does, including the unique indexes, upserts
//! and the order bill, so handlers and the seeder can run without a database.
use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::{Document, oid::ObjectId};
use tokio::sync::RwLock;

use crate::{
    bill::{self, Bill},
    error::StoreError,
    store::{Collection, Page, Store, UpdateOutcome, business_ids, id_filter},
};

/// First unique field of `collection` on which `candidate` clashes with one of
/// `documents`, skipping the document at `skip`.
fn clash(
    collection: Collection,
    documents: &[Document],
    candidate: &Document,
    skip: Option<usize>,
) -> Option<StoreError> {
    collection.unique_fields().iter().find_map(|field| {
        let value = candidate.get(*field)?;
        documents
            .iter()
            .enumerate()
            .any(|(i, doc)| Some(i) != skip && doc.get(*field) == Some(value))
            .then(|| StoreError::Duplicate(format!("{} {field}: {value}", collection.name())))
    })
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, Vec::len)
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, value)| document.get(key) == Some(value))
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_all(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        self.find_one(collection, id_filter(collection, id)).await
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| matches(doc, &filter)).cloned()))
    }

    async fn count(&self, collection: Collection, filter: Document) -> Result<u64, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection)
            .map_or(0, |docs| docs.iter().filter(|doc| matches(doc, &filter)).count()) as u64)
    }

    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        let documents = guard.entry(collection).or_default();

        if let Some(err) = clash(collection, documents, &document, None) {
            return Err(err);
        }
        documents.push(document);

        Ok(())
    }

    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> Result<Vec<String>, StoreError> {
        let ids = business_ids(collection, &documents);

        let mut guard = self.collections.write().await;
        let stored = guard.entry(collection).or_default();

        // Ordered insert: everything before the first clash stays.
        for document in documents {
            if let Some(err) = clash(collection, stored, &document, None) {
                return Err(err);
            }
            stored.push(document);
        }

        Ok(ids)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        set: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut guard = self.collections.write().await;
        let documents = guard.entry(collection).or_default();
        let id_field = collection.id_field();

        if let Some(index) = documents
            .iter()
            .position(|doc| doc.get_str(id_field).ok() == Some(id))
        {
            if let Some(err) = clash(collection, documents, &set, Some(index)) {
                return Err(err);
            }

            let document = &mut documents[index];
            let mut modified = false;
            for (key, value) in set {
                if document.get(&key) != Some(&value) {
                    document.insert(key, value);
                    modified = true;
                }
            }

            return Ok(UpdateOutcome {
                matched_count: 1,
                modified_count: u64::from(modified),
                upserted_id: None,
            });
        }

        let upserted = ObjectId::new();
        let mut document = id_filter(collection, id);
        document.insert("_id", upserted);
        for (key, value) in set {
            document.insert(key, value);
        }
        if let Some(err) = clash(collection, documents, &document, None) {
            return Err(err);
        }
        documents.push(document);

        Ok(UpdateOutcome {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(upserted.to_hex()),
        })
    }

    async fn page(
        &self,
        collection: Collection,
        start: u64,
        limit: u64,
        hidden: &[&str],
    ) -> Result<Page, StoreError> {
        let guard = self.collections.read().await;
        let Some(documents) = guard.get(&collection) else {
            return Ok(Page::default());
        };

        let items = documents
            .iter()
            .skip(usize::try_from(start).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|doc| {
                let mut doc = doc.clone();
                for field in hidden {
                    doc.remove(*field);
                }
                doc
            })
            .collect();

        Ok(Page {
            total_count: documents.len() as u64,
            items,
        })
    }

    async fn order_bill(&self, order_id: &str) -> Result<Option<Bill>, StoreError> {
        let guard = self.collections.read().await;
        let slice = |collection: Collection| guard.get(&collection).map_or(&[][..], Vec::as_slice);

        Ok(bill::compute(
            order_id,
            slice(Collection::OrderItem),
            slice(Collection::Food),
            slice(Collection::Order),
            slice(Collection::Table),
        ))
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    #[tokio::test]
    async fn test_find_by_business_id() {
        let store = MemoryStore::new();
        store
            .insert_one(Collection::Menu, doc! { "menu_id": "m1", "name": "Lunch" })
            .await
            .unwrap();

        let found = store.find_by_id(Collection::Menu, "m1").await.unwrap();
        assert_eq!(found.unwrap().get_str("name").unwrap(), "Lunch");

        assert!(store.find_by_id(Collection::Menu, "m2").await.unwrap().is_none());
        assert!(store.find_by_id(Collection::Food, "m1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_existing_document() {
        let store = MemoryStore::new();
        store
            .insert_one(Collection::Table, doc! { "table_id": "t1", "table_number": 1 })
            .await
            .unwrap();

        let outcome = store
            .update_by_id(Collection::Table, "t1", doc! { "table_number": 2 })
            .await
            .unwrap();
        assert_eq!(outcome.matched_count, 1);
        assert_eq!(outcome.modified_count, 1);

        let unchanged = store
            .update_by_id(Collection::Table, "t1", doc! { "table_number": 2 })
            .await
            .unwrap();
        assert_eq!(unchanged.modified_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        store
            .insert_one(Collection::User, doc! { "user_id": "u1", "email": "ada@example.com" })
            .await
            .unwrap();

        let err = store
            .insert_one(Collection::User, doc! { "user_id": "u2", "email": "ada@example.com" })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref key) if key.contains("email")));
        assert_eq!(store.len(Collection::User).await, 1);

        store
            .insert_one(Collection::User, doc! { "user_id": "u2", "email": "grace@example.com" })
            .await
            .unwrap();
        let err = store
            .update_by_id(Collection::User, "u2", doc! { "email": "ada@example.com" })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        store
            .update_by_id(Collection::User, "u1", doc! { "email": "ada@example.com" })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_business_id_rejected() {
        let store = MemoryStore::new();
        store
            .insert_one(Collection::Menu, doc! { "menu_id": "m1", "name": "Lunch" })
            .await
            .unwrap();

        let err = store
            .insert_one(Collection::Menu, doc! { "menu_id": "m1", "name": "Dinner" })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref key) if key.contains("menu_id")));

        let err = store
            .insert_many(
                Collection::Menu,
                vec![
                    doc! { "menu_id": "m2", "name": "Brunch" },
                    doc! { "menu_id": "m1", "name": "Dinner" },
                    doc! { "menu_id": "m3", "name": "Supper" },
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.len(Collection::Menu).await, 2);
        assert!(store.find_by_id(Collection::Menu, "m3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_document_upserts() {
        let store = MemoryStore::new();

        let outcome = store
            .update_by_id(Collection::Invoice, "inv1", doc! { "payment_status": "PAID" })
            .await
            .unwrap();
        assert_eq!(outcome.matched_count, 0);
        assert!(outcome.upserted_id.is_some());

        let doc = store.find_by_id(Collection::Invoice, "inv1").await.unwrap().unwrap();
        assert_eq!(doc.get_str("payment_status").unwrap(), "PAID");
    }

    #[tokio::test]
    async fn test_page_slices_and_hides() {
        let store = MemoryStore::new();
        let users: Vec<Document> = (0..5)
            .map(|i| doc! { "user_id": format!("u{i}"), "password": "secret" })
            .collect();
        let ids = store.insert_many(Collection::User, users).await.unwrap();
        assert_eq!(ids, ["u0", "u1", "u2", "u3", "u4"]);

        let page = store
            .page(Collection::User, 3, 10, &["password"])
            .await
            .unwrap();
        assert_eq!(page.total_count, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].get_str("user_id").unwrap(), "u3");
        assert!(!page.items[0].contains_key("password"));

        let empty = store.page(Collection::Food, 0, 10, &[]).await.unwrap();
        assert_eq!(empty, Page::default());
    }

    #[tokio::test]
    async fn test_count_with_filter() {
        let store = MemoryStore::new();
        store
            .insert_many(
                Collection::User,
                vec![
                    doc! { "user_id": "u1", "email": "a@b.co" },
                    doc! { "user_id": "u2", "email": "c@d.co" },
                ],
            )
            .await
            .unwrap();

        let count = store
            .count(Collection::User, doc! { "email": "a@b.co" })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_order_bill_joins_collections() {
        let store = MemoryStore::new();
        store
            .insert_one(Collection::Table, doc! { "table_id": "t1", "table_number": 3 })
            .await
            .unwrap();
        store
            .insert_one(Collection::Order, doc! { "order_id": "o1", "table_id": "t1" })
            .await
            .unwrap();
        store
            .insert_one(Collection::Food, doc! { "food_id": "f1", "name": "Soup", "price": 4.5 })
            .await
            .unwrap();
        store
            .insert_many(
                Collection::OrderItem,
                vec![
                    doc! { "order_item_id": "i1", "order_id": "o1", "food_id": "f1", "quantity": "S" },
                    doc! { "order_item_id": "i2", "order_id": "o1", "food_id": "f1", "quantity": "M" },
                ],
            )
            .await
            .unwrap();

        let bill = store.order_bill("o1").await.unwrap().unwrap();
        assert_eq!(bill.payment_due, 9.0);
        assert_eq!(bill.table_number, Some(3));

        assert!(store.order_bill("o2").await.unwrap().is_none());
    }
}
