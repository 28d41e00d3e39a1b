//! Connections and the connectors that hand them out.
//!
//! A [`Connection`] is a cheaply cloneable handle over a [`StoreBackend`] plus the
//! registry of models compiled against it. A [`Connector`] plays the role of the
//! database driver entry point: it owns a default connection and can open new ones
//! from a connection string.

use async_trait::async_trait;
use mea::rwlock::RwLock;
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::info;

use crate::{
    backend::StoreBackend,
    error::{DocumentStoreResult, ModelResult},
    model::Model,
    schema::Schema,
};

/// Entry point of a storage driver.
///
/// Implementations are provided by the backend crates (`MemoryConnector`,
/// `MongoDbConnector`).
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    /// The default connection, used when a model does not ask for another one.
    fn connection(&self) -> Connection;

    /// Opens a new connection from a connection string.
    async fn create_connection(&self, uri: &str) -> DocumentStoreResult<Connection>;
}

/// Handle to a database session.
///
/// Clones share the backend and the model registry.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    name: String,
    backend: Arc<dyn StoreBackend>,
    models: RwLock<HashMap<String, Arc<Schema>>>,
}

impl Connection {
    pub fn new(name: impl Into<String>, backend: impl StoreBackend + 'static) -> Self {
        Self::from_backend(name, Arc::new(backend))
    }

    pub fn from_backend(name: impl Into<String>, backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                name: name.into(),
                backend,
                models: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Name of the connection, usually the database or connection string it was opened with.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn backend(&self) -> &dyn StoreBackend {
        self.inner.backend.as_ref()
    }

    /// `true` if both handles point at the same session.
    pub fn same_as(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Compiles `schema` into a model bound to `name`, creates its indexes and registers it.
    ///
    /// A backend failure while creating the indexes is returned unchanged and nothing is
    /// registered. Registering a name twice replaces the earlier schema; models already
    /// handed out keep the schema they were built with.
    pub async fn model(&self, name: &str, schema: Schema) -> ModelResult<Model> {
        let schema = Arc::new(schema);
        let model = Model::new(name.to_string(), schema.clone(), self.clone());

        model.ensure_indexes().await?;

        self.inner
            .models
            .write()
            .await
            .insert(name.to_string(), schema);

        info!(connection = self.name(), model = name, indexes = model.schema().indexes().len(), "model registered");

        Ok(model)
    }

    /// Returns the model registered under `name`, if any.
    pub async fn get_model(&self, name: &str) -> Option<Model> {
        self.inner
            .models
            .read()
            .await
            .get(name)
            .cloned()
            .map(|schema| Model::new(name.to_string(), schema, self.clone()))
    }

    /// Names of all registered models, sorted.
    pub async fn model_names(&self) -> Vec<String> {
        let mut names = self.inner
            .models
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        names.sort();
        names
    }

    pub async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.inner.backend.shutdown().await
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.inner.name)
            .field("backend", &self.inner.backend)
            .finish_non_exhaustive()
    }
}
