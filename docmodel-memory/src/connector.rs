//! Connector handing out in-memory connections.

use async_trait::async_trait;
use tracing::debug;

use docmodel_core::{
    connection::{Connection, Connector},
    error::DocumentStoreResult,
};

use crate::store::InMemoryStore;

/// Name of the default connection.
pub const DEFAULT_CONNECTION: &str = "memory";

/// [`Connector`] backed by [`InMemoryStore`].
///
/// The default connection wraps one store for the lifetime of the connector. Each call to
/// [`create_connection`](Connector::create_connection) opens a connection over a fresh,
/// empty store named after the connection string.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    connection: Connection,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::with_store(InMemoryStore::new())
    }

    /// Uses `store` behind the default connection.
    pub fn with_store(store: InMemoryStore) -> Self {
        Self { connection: Connection::new(DEFAULT_CONNECTION, store) }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    fn connection(&self) -> Connection {
        self.connection.clone()
    }

    async fn create_connection(&self, uri: &str) -> DocumentStoreResult<Connection> {
        debug!(uri, "opening in-memory connection");

        Ok(Connection::new(uri, InMemoryStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_connection_is_shared() {
        let connector = MemoryConnector::new();

        assert!(connector.connection().same_as(&connector.connection()));
        assert_eq!(connector.connection().name(), DEFAULT_CONNECTION);
    }

    #[tokio::test]
    async fn created_connections_are_independent() {
        let connector = MemoryConnector::new();
        let reports = connector.create_connection("memory://reports").await.unwrap();

        assert_eq!(reports.name(), "memory://reports");
        assert!(!reports.same_as(&connector.connection()));

        reports.backend().create_collection("daily").await.unwrap();
        assert!(connector.connection().backend().list_collections().await.unwrap().is_empty());
    }
}
