//! Build ready-to-use document models from declarative configuration.
//!
//! This crate is the core of the docmodel project and provides:
//!
//! - **Model factory** ([`factory`]) - Turns a [`ModelConfig`](config::ModelConfig) into a registered model
//! - **Configuration** ([`config`]) - The declarative model description and its building blocks
//! - **Connections** ([`connection`]) - Database sessions, the model registry and the connector trait
//! - **Schemas** ([`schema`], [`hooks`]) - Field definitions, middleware, methods, statics and indexes
//! - **Schema conversion** ([`convert`]) - Validation schemas translated into field definitions
//! - **Autoincrement** ([`autoinc`]) - Counter backed numbering of new documents
//! - **Models** ([`model`]) - CRUD operations over a collection, with a callback adapter
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Query and filtering API** ([`query`]) - Filter expressions, sorting and pagination
//! - **Error handling** ([`error`]) - Error types and result types for every layer
//!
//! # Example
//!
//! ```ignore
//! use docmodel_core::{config::ModelConfig, factory::ModelFactory};
//! use bson::doc;
//!
//! let users = ModelFactory::new()
//!     .build(
//!         ModelConfig::new(connector)
//!             .schema(doc! { "name": "String" })
//!             .collection("users"),
//!     )
//!     .await?;
//!
//! users.create(doc! { "name": "Alice" }).await?;
//! ```

pub mod autoinc;
pub mod backend;
pub mod config;
pub mod connection;
pub mod convert;
pub mod error;
pub mod factory;
pub mod hooks;
pub mod model;
pub mod query;
pub mod schema;
