//! Storage backend abstraction used by connections and models.
//!
//! A [`StoreBackend`] is the lowest layer of docmodel: it stores BSON documents keyed by
//! a BSON id inside named collections, evaluates [`Query`] filters, registers indexes and
//! keeps the named counters used by the autoincrement plugin.
//!
//! Backends are shared behind an `Arc` by every [`Connection`](crate::connection::Connection)
//! clone, so implementations must be thread-safe.
//!
//! # Examples
//!
//! ```ignore
//! use docmodel::backend::StoreBackend;
//! use bson::{Bson, doc};
//!
//! let backend = MyBackendImpl::new();
//!
//! let id = Bson::Int64(1);
//! backend.insert_documents(vec![(id, doc! { "_id": 1_i64, "name": "Alice" })], "users").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::{error::DocumentStoreResult, query::Query};

/// Options attached to an index declaration.
///
/// Mirrors the second positional argument of an index registration: everything
/// except the key specification itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Reject documents that share the same indexed key.
    pub unique: bool,
    /// Only index documents where the indexed fields exist.
    pub sparse: bool,
    /// Explicit index name; backends derive one from the keys when absent.
    pub name: Option<String>,
}

impl IndexOptions {
    /// Options for a unique index.
    pub fn unique() -> Self {
        Self { unique: true, ..Default::default() }
    }
}

/// Abstract interface for document storage backends.
///
/// All operations are async and return [`DocumentStoreResult`]; implementers should
/// surface driver failures as [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection.
    ///
    /// The collection is created if it doesn't exist. Inserting an id that already exists
    /// is an error.
    async fn insert_documents(
        &self,
        documents: Vec<(Bson, Document)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Replaces existing documents in a collection.
    async fn update_documents(
        &self,
        documents: Vec<(Bson, Document)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Deletes documents from a collection by their ids.
    ///
    /// An id that is not stored fails with
    /// [`DocumentStoreError::DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound);
    /// ids listed before it may already have been deleted.
    async fn delete_documents(&self, ids: Vec<Bson>, collection: &str) -> DocumentStoreResult<()>;

    /// Retrieves documents by id. Missing ids are omitted from the result.
    async fn get_documents(
        &self,
        ids: Vec<Bson>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Returns the documents of a collection matching `query`.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Creates an empty collection.
    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Drops a collection and all of its documents.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Registers an index on `keys` (field name -> direction) in a collection.
    ///
    /// If `options.unique` is set and existing documents violate it, the backend
    /// may return an error.
    async fn create_index(
        &self,
        collection: &str,
        keys: Document,
        options: IndexOptions,
    ) -> DocumentStoreResult<()>;

    /// Creates the counter `key` with `value` unless it already exists.
    ///
    /// Returns `true` if the counter was created by this call.
    async fn seed_counter(&self, key: &str, value: i64) -> DocumentStoreResult<bool>;

    /// Atomically adds `by` to the counter `key` and returns the new value.
    ///
    /// A counter that does not exist yet starts from zero. Overflowing `i64` is an error
    /// and leaves the counter unchanged.
    async fn increment_counter(&self, key: &str, by: i64) -> DocumentStoreResult<i64>;

    /// Atomically raises the counter `key` to `value` if it holds less, creating it if needed.
    async fn raise_counter(&self, key: &str, value: i64) -> DocumentStoreResult<()>;

    /// Returns the current value of the counter `key`, if any.
    async fn current_counter(&self, key: &str) -> DocumentStoreResult<Option<i64>>;

    /// Overwrites the counter `key` with `value`, creating it if needed.
    async fn reset_counter(&self, key: &str, value: i64) -> DocumentStoreResult<()>;

    /// Releases the resources held by the backend.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

/// Factory trait for creating backend instances.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
