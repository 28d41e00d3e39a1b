//! Error types for store backends, configuration and model operations.
//!
//! Three layers of failure are distinguished:
//!
//! - [`DocumentStoreError`] - raised by a storage backend (connection setup, reads, writes, counters)
//! - [`ConfigurationError`] - raised by [`ModelFactory::build`](crate::factory::ModelFactory::build)
//!   when a mandatory configuration field is missing, before anything else happens
//! - [`ModelError`] - returned by every model level operation; wraps the other two unchanged

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::hooks::HookEvent;

/// Represents all possible errors that can occur when talking to a storage backend.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID (or the same unique key) already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The document has an invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for backend operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

/// A mandatory model configuration field is missing or empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Schema is required")]
    MissingSchema,
    #[error("Collection name is required")]
    MissingCollection,
}

/// Errors returned by the model factory and by model handles.
///
/// Errors coming from collaborators (the backend, the schema converter) are carried
/// as-is; nothing here retries or reinterprets them.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The configuration handed to the factory is incomplete.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// Failure surfaced by the storage backend or the connector.
    #[error(transparent)]
    Store(#[from] DocumentStoreError),
    /// A validation schema could not be converted into a schema definition.
    #[error("Schema conversion error: {0}")]
    Conversion(String),
    /// A pre hook dropped its continuation without proceeding.
    #[error("Pre {event} hook dropped its continuation")]
    HookAborted { event: HookEvent },
    /// A pre hook explicitly failed the pipeline.
    #[error("Pre {event} hook failed: {message}")]
    Hook { event: HookEvent, message: String },
    /// No instance method with this name is defined on the schema.
    #[error("Instance method not found: {0}")]
    MethodNotFound(String),
    /// No static with this name is defined on the schema.
    #[error("Static not found: {0}")]
    StaticNotFound(String),
    /// The model has no autoincrement counter attached.
    #[error("Model {0} has no autoincrement counter")]
    CounterNotConfigured(String),
}

/// A specialized `Result` type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

impl From<BsonError> for ModelError {
    fn from(err: BsonError) -> Self {
        ModelError::Store(err.into())
    }
}
