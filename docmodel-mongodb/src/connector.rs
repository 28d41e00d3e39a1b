//! Connector opening MongoDB connections.

use async_trait::async_trait;
use mongodb::{Client, options::ClientOptions};
use tracing::debug;

use docmodel_core::{
    backend::StoreBackendBuilder,
    connection::{Connection, Connector},
    error::{DocumentStoreError, DocumentStoreResult},
};

use crate::store::{MongoDbStore, MongoDbStoreBuilder};

/// [`Connector`] over the MongoDB driver.
///
/// The default connection targets the database given to the builder. Connection strings
/// passed to [`create_connection`](Connector::create_connection) select their own
/// database (`mongodb://host/reports`), or fall back to the connector's.
#[derive(Debug, Clone)]
pub struct MongoDbConnector {
    database: String,
    connection: Connection,
}

impl MongoDbConnector {
    pub fn builder(dsn: &str, database: &str) -> MongoDbConnectorBuilder {
        MongoDbConnectorBuilder {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl Connector for MongoDbConnector {
    fn connection(&self) -> Connection {
        self.connection.clone()
    }

    async fn create_connection(&self, uri: &str) -> DocumentStoreResult<Connection> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;
        let database = options
            .default_database
            .clone()
            .unwrap_or_else(|| self.database.clone());
        let client = Client::with_options(options)
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        debug!(%database, "opening mongodb connection");

        Ok(Connection::new(database.clone(), MongoDbStore::new(client, database)))
    }
}

pub struct MongoDbConnectorBuilder {
    dsn: String,
    database: String,
}

impl MongoDbConnectorBuilder {
    pub async fn build(self) -> DocumentStoreResult<MongoDbConnector> {
        let store = MongoDbStoreBuilder::new(&self.dsn, &self.database)
            .build()
            .await?;

        Ok(MongoDbConnector {
            connection: Connection::new(self.database.clone(), store),
            database: self.database,
        })
    }
}
