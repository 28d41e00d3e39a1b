//! In-memory storage implementation.
//!
//! Documents are kept per collection in a `HashMap` keyed by the string form of their
//! id, behind async-aware read-write locks. Query results keep insertion order unless
//! the query asks for a sort.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document};
use tracing::debug;

use docmodel_core::{
    backend::{IndexOptions, StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Query, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator, lookup};

type StoreMap = HashMap<String, MemoryCollection>;
type CounterMap = HashMap<String, i64>;

#[derive(Debug, Default)]
struct MemoryCollection {
    documents: HashMap<String, StoredDocument>,
    indexes: Vec<MemoryIndex>,
    next_seq: u64,
}

#[derive(Debug)]
struct StoredDocument {
    seq: u64,
    document: Document,
}

#[derive(Debug, Clone)]
struct MemoryIndex {
    name: String,
    fields: Vec<String>,
    unique: bool,
    sparse: bool,
}

impl MemoryIndex {
    fn new(keys: &Document, options: &IndexOptions) -> Self {
        let fields = keys.keys().cloned().collect::<Vec<_>>();
        let name = options.name.clone().unwrap_or_else(|| {
            keys.iter()
                .map(|(field, direction)| format!("{field}_{direction}"))
                .collect::<Vec<_>>()
                .join("_")
        });

        Self { name, fields, unique: options.unique, sparse: options.sparse }
    }

    /// The indexed values of `document`, or `None` if a sparse index skips it.
    fn key_of(&self, document: &Document) -> Option<Document> {
        if self.sparse && self.fields.iter().all(|field| lookup(document, field).is_none()) {
            return None;
        }

        Some(
            self.fields
                .iter()
                .map(|field| {
                    (field.clone(), lookup(document, field).cloned().unwrap_or(Bson::Null))
                })
                .collect()
        )
    }
}

impl MemoryCollection {
    /// Fails if storing `document` under `key` would break a unique index.
    fn check_unique(&self, key: &str, document: &Document, collection: &str) -> DocumentStoreResult<()> {
        for index in self.indexes.iter().filter(|index| index.unique) {
            let Some(value) = index.key_of(document) else {
                continue;
            };

            let taken = self.documents
                .iter()
                .filter(|(other, _)| other.as_str() != key)
                .any(|(_, stored)| index.key_of(&stored.document).as_ref() == Some(&value));

            if taken {
                return Err(DocumentStoreError::DocumentAlreadyExists(
                    value.to_string(),
                    collection.to_string(),
                ));
            }
        }

        Ok(())
    }

    fn ordered(&self) -> Vec<&Document> {
        let mut stored = self.documents.values().collect::<Vec<_>>();
        stored.sort_by_key(|stored| stored.seq);
        stored.into_iter().map(|stored| &stored.document).collect()
    }
}

fn id_key(id: &Bson) -> String {
    id.to_string()
}

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state; clones share
/// the same data.
///
/// Queries scan every document of a collection. Indexes are only used to enforce
/// uniqueness.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::InMemoryStore;
/// use docmodel_core::backend::StoreBackend;
/// use bson::{Bson, doc};
///
/// let store = InMemoryStore::new();
/// store.insert_documents(vec![(Bson::Int64(1), doc! { "_id": 1_i64, "name": "Alice" })], "users").await?;
///
/// let docs = store.get_documents(vec![Bson::Int64(1)], "users").await?;
/// assert_eq!(docs.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> collection
    store: Arc<RwLock<StoreMap>>,
    counters: Arc<RwLock<CounterMap>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<(Bson, Document)>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        for (id, document) in documents {
            let key = id_key(&id);

            if collection_map.documents.contains_key(&key) {
                return Err(DocumentStoreError::DocumentAlreadyExists(key, collection.to_string()));
            }

            collection_map.check_unique(&key, &document, collection)?;

            let seq = collection_map.next_seq;
            collection_map.next_seq += 1;
            collection_map.documents.insert(key, StoredDocument { seq, document });
        }

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(Bson, Document)>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(DocumentStoreError::CollectionNotFound(collection.to_string())),
        };

        for (id, document) in documents {
            let key = id_key(&id);

            if !collection_map.documents.contains_key(&key) {
                return Err(DocumentStoreError::DocumentNotFound(key, collection.to_string()));
            }

            collection_map.check_unique(&key, &document, collection)?;

            if let Some(stored) = collection_map.documents.get_mut(&key) {
                stored.document = document;
            }
        }

        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<Bson>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(DocumentStoreError::CollectionNotFound(collection.to_string())),
        };

        for id in ids {
            let key = id_key(&id);

            if collection_map.documents.remove(&key).is_none() {
                return Err(DocumentStoreError::DocumentNotFound(key, collection.to_string()));
            }
        }

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<Bson>, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        Ok(
            ids.iter()
                .filter_map(|id| collection_map.documents.get(&id_key(id)))
                .map(|stored| stored.document.clone())
                .collect()
        )
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let mut documents = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(collection_map.ordered(), filter)?,
            None => collection_map
                .ordered()
                .into_iter()
                .cloned()
                .collect::<Vec<_>>(),
        };

        if let Some(sort) = &query.sort {
            // Stable, so ties keep insertion order.
            documents.sort_by(|a, b| {
                let left = lookup(a, &sort.field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);
                let right = lookup(b, &sort.field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);

                match sort.direction {
                    SortDirection::Asc => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
                    SortDirection::Desc => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
                }
            });
        }

        Ok(
            documents
                .into_iter()
                .skip(query.offset.unwrap_or(0))
                .take(query.limit.unwrap_or(usize::MAX))
                .collect()
        )
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self.store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        names.sort();
        Ok(names)
    }

    async fn create_index(&self, collection: &str, keys: Document, options: IndexOptions) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();
        let index = MemoryIndex::new(&keys, &options);

        if index.unique {
            let mut seen = Vec::new();

            for document in collection_map.ordered() {
                let Some(value) = index.key_of(document) else {
                    continue;
                };

                if seen.contains(&value) {
                    return Err(DocumentStoreError::Backend(format!(
                        "cannot create unique index {} on {}: duplicate key {}",
                        index.name, collection, value
                    )));
                }
                seen.push(value);
            }
        }

        debug!(collection, index = %index.name, unique = index.unique, "index created");

        collection_map.indexes.retain(|existing| existing.name != index.name);
        collection_map.indexes.push(index);

        Ok(())
    }

    async fn seed_counter(&self, key: &str, value: i64) -> DocumentStoreResult<bool> {
        let mut counters = self.counters.write().await;

        if counters.contains_key(key) {
            return Ok(false);
        }

        counters.insert(key.to_string(), value);
        Ok(true)
    }

    async fn increment_counter(&self, key: &str, by: i64) -> DocumentStoreResult<i64> {
        let mut counters = self.counters.write().await;
        let counter = counters.entry(key.to_string()).or_insert(0);

        *counter = counter
            .checked_add(by)
            .ok_or_else(|| DocumentStoreError::Backend(format!("counter {key} overflows adding {by}")))?;
        Ok(*counter)
    }

    async fn raise_counter(&self, key: &str, value: i64) -> DocumentStoreResult<()> {
        let mut counters = self.counters.write().await;
        let counter = counters.entry(key.to_string()).or_insert(value);

        *counter = (*counter).max(value);
        Ok(())
    }

    async fn current_counter(&self, key: &str) -> DocumentStoreResult<Option<i64>> {
        Ok(self.counters.read().await.get(key).copied())
    }

    async fn reset_counter(&self, key: &str, value: i64) -> DocumentStoreResult<()> {
        self.counters
            .write()
            .await
            .insert(key.to_string(), value);

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
