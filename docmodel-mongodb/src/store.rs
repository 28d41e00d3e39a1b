use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream::iter};
use bson::{Bson, Document, doc};
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    options::{ClientOptions, FindOptions, IndexOptions as MongoIndexOptions, ReturnDocument},
};
use tracing::debug;

use docmodel_core::{
    backend::{IndexOptions, StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Query, QueryVisitor, SortDirection},
};

use crate::{query::MongoQueryTranslator, sanitizer::KeySanitizer};

/// Collection holding the autoincrement counters, one `{ _id: key, seq }` document each.
pub const COUNTERS_COLLECTION: &str = "_counters";

fn backend_error(err: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

fn counter_value(document: &Document) -> Option<i64> {
    match document.get("seq")? {
        Bson::Int64(value) => Some(*value),
        Bson::Int32(value) => Some(i64::from(*value)),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&KeySanitizer::sanitize_string(collection_name))
    }

    fn counters(&self) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(COUNTERS_COLLECTION)
    }

    fn prepare_document(&self, id: &Bson, document: &Document) -> Document {
        let mut prepared = KeySanitizer::sanitize_document(document);
        prepared.insert("_id", id.clone());
        prepared
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(&self, documents: Vec<(Bson, Document)>, collection: &str) -> DocumentStoreResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        self.get_collection(collection)
            .insert_many(
                documents
                    .iter()
                    .map(|(id, doc)| self.prepare_document(id, doc))
                    .collect::<Vec<_>>(),
            )
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(Bson, Document)>, collection: &str) -> DocumentStoreResult<()> {
        iter(documents)
            .then(async |(id, doc)| {
                let result = self.get_collection(collection)
                    .replace_one(doc! { "_id": id.clone() }, self.prepare_document(&id, &doc))
                    .await
                    .map_err(backend_error)?;

                if result.matched_count == 0 {
                    return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()));
                }

                Ok(())
            })
            .try_collect::<Vec<_>>()
            .await?;

        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<Bson>, collection: &str) -> DocumentStoreResult<()> {
        iter(ids)
            .then(async |id| {
                let result = self.get_collection(collection)
                    .delete_one(doc! { "_id": id.clone() })
                    .await
                    .map_err(backend_error)?;

                if result.deleted_count == 0 {
                    return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()));
                }

                Ok(())
            })
            .try_collect::<Vec<_>>()
            .await?;

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<Bson>, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        Ok(
            self.get_collection(collection)
                .find(doc! { "_id": { "$in": ids } })
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .iter()
                .map(KeySanitizer::restore_document)
                .collect()
        )
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(doc! {
                sort.field.clone(): match sort.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                }
            })
        }

        let filter = match &query.filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr)?,
            None => doc! {},
        };

        Ok(
            self.get_collection(collection)
                .find(filter)
                .with_options(options)
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .iter()
                .map(KeySanitizer::restore_document)
                .collect()
        )
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.client
            .database(&self.database)
            .create_collection(KeySanitizer::sanitize_string(name))
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        Ok(
            self.client
                .database(&self.database)
                .list_collection_names()
                .await
                .map_err(backend_error)?
                .into_iter()
                .filter(|name| name != COUNTERS_COLLECTION)
                .map(|name| KeySanitizer::restore_string(&name))
                .collect()
        )
    }

    async fn create_index(&self, collection: &str, keys: Document, options: IndexOptions) -> DocumentStoreResult<()> {
        let mut index_options = MongoIndexOptions::default();
        index_options.unique = Some(options.unique);
        index_options.sparse = Some(options.sparse);
        index_options.name = options.name;

        let created = self.get_collection(collection)
            .create_index(
                IndexModel::builder()
                    .keys(keys)
                    .options(index_options)
                    .build()
            )
            .await
            .map_err(backend_error)?;

        debug!(collection, index = %created.index_name, "index created");

        Ok(())
    }

    async fn seed_counter(&self, key: &str, value: i64) -> DocumentStoreResult<bool> {
        let result = self.counters()
            .update_one(
                doc! { "_id": key },
                doc! { "$setOnInsert": { "seq": value } },
            )
            .upsert(true)
            .await
            .map_err(backend_error)?;

        Ok(result.upserted_id.is_some())
    }

    async fn increment_counter(&self, key: &str, by: i64) -> DocumentStoreResult<i64> {
        self.counters()
            .find_one_and_update(
                doc! { "_id": key },
                doc! { "$inc": { "seq": by } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(backend_error)?
            .as_ref()
            .and_then(counter_value)
            .ok_or_else(|| DocumentStoreError::Backend(format!("counter {key} has no numeric value")))
    }

    async fn raise_counter(&self, key: &str, value: i64) -> DocumentStoreResult<()> {
        self.counters()
            .update_one(
                doc! { "_id": key },
                doc! { "$max": { "seq": value } },
            )
            .upsert(true)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn current_counter(&self, key: &str) -> DocumentStoreResult<Option<i64>> {
        Ok(
            self.counters()
                .find_one(doc! { "_id": key })
                .await
                .map_err(backend_error)?
                .as_ref()
                .and_then(counter_value)
        )
    }

    async fn reset_counter(&self, key: &str, value: i64) -> DocumentStoreResult<()> {
        self.counters()
            .update_one(
                doc! { "_id": key },
                doc! { "$set": { "seq": value } },
            )
            .upsert(true)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.client.clone().shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        Ok(MongoDbStore::new(
            Client::with_options(options)
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
