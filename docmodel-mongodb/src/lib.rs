//! MongoDB backend implementation for docmodel.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait and a
//! [`MongoDbConnector`] handing out connections over it.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmodel = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Documents live in a MongoDB database
//! - **Query translation** - Filter expressions run on MongoDB's query engine
//! - **Indexes** - Schema indexes are created through the driver, uniqueness included
//! - **Counters** - Autoincrement counters are kept in the `_counters` collection and
//!   advanced atomically with `$inc`
//!
//! # Example
//!
//! ```ignore
//! use docmodel::{config::ModelConfig, factory::ModelFactory, mongodb::MongoDbConnector};
//! use std::sync::Arc;
//!
//! let connector = MongoDbConnector::builder("mongodb://localhost:27017", "app")
//!     .build()
//!     .await?;
//!
//! let users = ModelFactory::new()
//!     .build(
//!         ModelConfig::new(Arc::new(connector))
//!             .schema(doc! { "name": "String" })
//!             .collection("users"),
//!     )
//!     .await?;
//! ```

pub mod connector;
pub mod query;
pub mod sanitizer;
pub mod store;

pub use connector::{MongoDbConnector, MongoDbConnectorBuilder};
pub use store::{MongoDbStore, MongoDbStoreBuilder};
