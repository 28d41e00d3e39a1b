//! Build ready-to-use document models from declarative configuration.
//!
//! This crate is the primary entry point of docmodel. It re-exports the core types and
//! gives access to the storage backends.
//!
//! # Features
//!
//! - **Declarative models** - Describe schema, collection, hooks, methods, statics, indexes
//!   and autoincrement in one [`ModelConfig`](config::ModelConfig)
//! - **Validation schemas** - Build models from a validation schema instead of a field definition
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//! - **Async first** - Every model operation is a future, with a callback adapter on top
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::MemoryConnector};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> ModelResult<()> {
//!     let connector = Arc::new(MemoryConnector::new());
//!
//!     let users = build_model(
//!         ModelConfig::new(connector)
//!             .schema(doc! { "name": "String", "email": "String" })
//!             .collection("users")
//!             .index((doc! { "email": 1 }, IndexOptions::unique()))
//!             .autoinc(AutoIncrementOptions::new("seq")),
//!     )
//!     .await?;
//!
//!     let alice = users.create(doc! { "name": "Alice", "email": "alice@example.com" }).await?;
//!     println!("created {:?}", alice.to_object());
//!
//!     let found = users
//!         .find(Filter::eq("name", "Alice").into())
//!         .await?;
//!     println!("found {} users", found.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Validation schemas
//!
//! ```ignore
//! use docmodel::prelude::*;
//!
//! let schema = ValidationSchema::object()
//!     .key("name", ValidationSchema::string().required())
//!     .key("age", ValidationSchema::integer().min(0.0));
//!
//! let people = build_model(
//!     ModelConfig::new(connector)
//!         .schema(schema)
//!         .collection("people")
//!         .schema_update(|mut definition| {
//!             definition.insert("nickname", "String");
//!             definition
//!         }),
//! )
//! .await?;
//! ```
//!
//! # Callbacks
//!
//! Any model operation can deliver its result to a callback instead:
//!
//! ```ignore
//! use docmodel::prelude::*;
//!
//! users
//!     .count(Query::all())
//!     .callback(|result| println!("{result:?}"))
//!     .await;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docmodel_core::{
    autoinc, backend, config, connection, convert, error, factory, hooks, model, query, schema,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmodel_memory::{InMemoryStore, InMemoryStoreBuilder, MemoryConnector};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{MongoDbConnector, MongoDbConnectorBuilder, MongoDbStore, MongoDbStoreBuilder};
}
