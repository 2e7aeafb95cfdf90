//! # MongoDB
//!
//! Production [`Store`]. One database, one collection per entity, each
//! addressed by its business id field, which carries a unique index. User
//! emails are unique as well.
//!
//! Listing with pagination and the order bill run as aggregation pipelines so
//! the slicing and the joins happen database-side.
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Client, Database, IndexModel,
    bson::{Bson, Document, doc},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tracing::{debug, info};

use crate::{
    bill::{self, Bill},
    error::StoreError,
    models::round_price,
    store::{Collection, Page, Store, UpdateOutcome, business_ids, decode, id_filter},
};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Connected to MongoDB, using database {db_name}");

        let store = Self {
            db: client.database(db_name),
        };
        store.ensure_indexes().await?;

        Ok(store)
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<Document> {
        self.db.collection(collection.name())
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        for collection in Collection::ALL {
            for field in collection.unique_fields() {
                self.collection(collection)
                    .create_index(unique_index(field))
                    .await?;
            }
        }

        debug!("Indexes ensured");
        Ok(())
    }
}

fn unique_index(field: &str) -> IndexModel {
    let mut keys = Document::new();
    keys.insert(field, 1);

    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn classify(err: mongodb::error::Error) -> StoreError {
    match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
            return StoreError::Duplicate(write.message.clone());
        }
        ErrorKind::InsertMany(many) => {
            if let Some(write) = many
                .write_errors
                .iter()
                .flatten()
                .find(|write| write.code == DUPLICATE_KEY)
            {
                return StoreError::Duplicate(write.message.clone());
            }
        }
        _ => {}
    }

    StoreError::Database(err)
}

/// Connection string safe for logs: any `user:password@` becomes `***@`.
pub fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };

    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);

    match authority.rfind('@') {
        Some(at) => format!("{scheme}://***{}{tail}", &authority[at..]),
        None => uri.to_string(),
    }
}

/// `$match` everything, strip `hidden`, then count and slice in a single `$group`.
pub fn page_pipeline(start: u64, limit: u64, hidden: &[&str]) -> Vec<Document> {
    let mut stages = vec![doc! { "$match": {} }];

    if !hidden.is_empty() {
        let mut exclude = Document::new();
        for field in hidden {
            exclude.insert(*field, 0);
        }
        stages.push(doc! { "$project": exclude });
    }

    let start = i64::try_from(start).unwrap_or(i64::MAX);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    stages.push(doc! {
        "$group": {
            "_id": Bson::Null,
            "total_count": { "$sum": 1 },
            "data": { "$push": "$$ROOT" },
        }
    });
    stages.push(doc! {
        "$project": {
            "_id": 0,
            "total_count": 1,
            "items": { "$slice": ["$data", start, limit] },
        }
    });

    stages
}

fn as_u64(value: &Bson) -> Option<u64> {
    match value {
        Bson::Int32(v) => u64::try_from(*v).ok(),
        Bson::Int64(v) => u64::try_from(*v).ok(),
        _ => None,
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn find_all(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let cursor = self.collection(collection).find(Document::new()).await?;

        Ok(cursor.try_collect().await?)
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
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn count(&self, collection: Collection, filter: Document) -> Result<u64, StoreError> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<(), StoreError> {
        self.collection(collection)
            .insert_one(document)
            .await
            .map_err(classify)?;

        Ok(())
    }

    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> Result<Vec<String>, StoreError> {
        let ids = business_ids(collection, &documents);

        self.collection(collection)
            .insert_many(documents)
            .await
            .map_err(classify)?;

        Ok(ids)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        set: Document,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .collection(collection)
            .update_one(id_filter(collection, id), doc! { "$set": set })
            .upsert(true)
            .await
            .map_err(classify)?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id.map(|id| match id {
                Bson::ObjectId(oid) => oid.to_hex(),
                other => other.to_string(),
            }),
        })
    }

    async fn page(
        &self,
        collection: Collection,
        start: u64,
        limit: u64,
        hidden: &[&str],
    ) -> Result<Page, StoreError> {
        let mut cursor = self
            .collection(collection)
            .aggregate(page_pipeline(start, limit, hidden))
            .await?;

        let Some(first) = cursor.try_next().await? else {
            return Ok(Page::default());
        };

        Ok(Page {
            total_count: first.get("total_count").and_then(as_u64).unwrap_or(0),
            items: first
                .get_array("items")
                .map(|items| items.iter().filter_map(Bson::as_document).cloned().collect())
                .unwrap_or_default(),
        })
    }

    async fn order_bill(&self, order_id: &str) -> Result<Option<Bill>, StoreError> {
        let mut cursor = self
            .collection(Collection::OrderItem)
            .aggregate(bill::pipeline(order_id))
            .await?;

        let Some(first) = cursor.try_next().await? else {
            return Ok(None);
        };

        let mut bill: Bill = decode(first)?;
        bill.payment_due = round_price(bill.payment_due);

        Ok(Some(bill))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_pipeline_hides_fields() {
        let stages = page_pipeline(20, 10, &["password", "access_token"]);

        assert_eq!(stages.len(), 4);
        let project = stages[1].get_document("$project").unwrap();
        assert_eq!(project.get_i32("password").unwrap(), 0);
        assert_eq!(project.get_i32("access_token").unwrap(), 0);
    }

    #[test]
    fn test_page_pipeline_slices_window() {
        let stages = page_pipeline(20, 10, &[]);

        assert_eq!(stages.len(), 3);
        let slice = stages[2]
            .get_document("$project")
            .unwrap()
            .get_document("items")
            .unwrap()
            .get_array("$slice")
            .unwrap();
        assert_eq!(slice[1], Bson::Int64(20));
        assert_eq!(slice[2], Bson::Int64(10));
    }

    #[test]
    fn test_redact_uri_hides_credentials() {
        assert_eq!(
            redact_uri("mongodb://admin:hunter2@db:27017/restaurant?authSource=admin"),
            "mongodb://***@db:27017/restaurant?authSource=admin"
        );
        assert_eq!(
            redact_uri("mongodb+srv://user:p@ss@cluster.example.net"),
            "mongodb+srv://***@cluster.example.net"
        );
    }

    #[test]
    fn test_redact_uri_keeps_plain_uris() {
        assert_eq!(redact_uri("mongodb://localhost:27017"), "mongodb://localhost:27017");
        assert_eq!(
            redact_uri("mongodb://db:27017/app?note=a@b"),
            "mongodb://db:27017/app?note=a@b"
        );
        assert_eq!(redact_uri("not a uri"), "not a uri");
    }

    #[test]
    fn test_user_indexes_cover_email() {
        assert_eq!(Collection::User.unique_fields(), ["user_id", "email"]);
        for collection in Collection::ALL {
            assert!(collection.unique_fields().contains(&collection.id_field()));
        }
    }

    #[test]
    fn test_unique_index_keys() {
        let index = unique_index("email");

        assert_eq!(index.keys, doc! { "email": 1 });
        assert_eq!(index.options.and_then(|o| o.unique), Some(true));
    }
}
