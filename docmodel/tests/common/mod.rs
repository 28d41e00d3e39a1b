#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use docmodel::{
    connection::{Connection, Connector},
    error::DocumentStoreResult,
    memory::MemoryConnector,
};

/// Memory connector recording how it is used.
#[derive(Debug, Default)]
pub struct CountingConnector {
    inner: MemoryConnector,
    defaults: AtomicUsize,
    created: AtomicUsize,
}

impl CountingConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn defaults(&self) -> usize {
        self.defaults.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// The default connection, without counting the access.
    pub fn peek(&self) -> Connection {
        self.inner.connection()
    }
}

#[async_trait]
impl Connector for CountingConnector {
    fn connection(&self) -> Connection {
        self.defaults.fetch_add(1, Ordering::SeqCst);
        self.inner.connection()
    }

    async fn create_connection(&self, uri: &str) -> DocumentStoreResult<Connection> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.inner.create_connection(uri).await
    }
}
