//! In-memory storage backend for docmodel.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait
//! and a [`MemoryConnector`] handing out connections over it. It is meant for development,
//! tests and small single process deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Query support** - Filtering (dotted paths included), sorting, and pagination
//! - **Unique indexes** - Enforced on insert and update once created
//! - **Counters** - Backing store for the autoincrement plugin
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{config::ModelConfig, factory::ModelFactory, memory::MemoryConnector};
//! use bson::doc;
//! use std::sync::Arc;
//!
//! let users = ModelFactory::new()
//!     .build(
//!         ModelConfig::new(Arc::new(MemoryConnector::new()))
//!             .schema(doc! { "name": "String" })
//!             .collection("users"),
//!     )
//!     .await?;
//!
//! users.create(doc! { "name": "Alice" }).await?;
//! ```

pub mod connector;
pub mod evaluator;
pub mod store;

pub use connector::MemoryConnector;
pub use store::{InMemoryStore, InMemoryStoreBuilder};
