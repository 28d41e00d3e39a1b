//! Convenient re-exports of commonly used types from docmodel.
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```
//!
//! This provides access to:
//! - The factory, the configuration and its building blocks
//! - Connections, schemas, hooks and models
//! - Query construction and filtering
//! - Store backends and builders
//! - Error types

pub use docmodel_core::{
    autoinc::{AutoIncrement, AutoIncrementOptions, AutoIncrementPlugin},
    backend::{IndexOptions, StoreBackend, StoreBackendBuilder},
    config::{ConnectionOverride, IndexSpec, ModelConfig, SchemaPostProcessor, SchemaSource},
    connection::{Connection, Connector},
    convert::{SchemaConverter, ValidationConverter, ValidationSchema, ValueKind},
    error::{ConfigurationError, DocumentStoreError, DocumentStoreResult, ModelError, ModelResult},
    factory::{ModelFactory, build_model},
    hooks::{DocumentContext, HookEvent, Next, PostHook, PreHook, post_hook, pre_hook},
    model::{CallbackExt, Instance, Model},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    schema::{InstanceMethod, Methods, Schema, SchemaOptions, SchemaPlugin, StaticMethod, Statics, ToObjectOptions, Transform},
};

pub use bson::{Bson, Document, doc};
