//! Declarative model configuration.
//!
//! [`ModelConfig`] gathers everything [`ModelFactory`](crate::factory::ModelFactory)
//! needs to build a model. Only the connector, the schema source and the collection
//! name are mandatory; every other field is optional and left untouched when unset.
//!
//! ```ignore
//! let config = ModelConfig::new(connector)
//!     .schema(doc! { "name": "String", "email": "String" })
//!     .collection("users")
//!     .index((doc! { "email": 1 }, IndexOptions::unique()))
//!     .autoinc(AutoIncrementOptions::new("seq").start_at(5));
//! ```

use bson::Document;
use std::{fmt, sync::Arc};

use crate::{
    autoinc::AutoIncrementOptions,
    backend::IndexOptions,
    connection::{Connection, Connector},
    convert::ValidationSchema,
    error::ConfigurationError,
    hooks::{HookEvent, PostHook, PreHook},
    schema::{InstanceMethod, Methods, SchemaDefinition, SchemaOptions, StaticMethod, Statics, Transform},
};

/// Rewrites a definition produced from a [`ValidationSchema`].
pub type SchemaPostProcessor = Arc<dyn Fn(SchemaDefinition) -> SchemaDefinition + Send + Sync>;

/// Where the schema definition comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaSource {
    /// A field definition used as-is.
    Definition(SchemaDefinition),
    /// A validation schema, converted into a definition at build time.
    Validation(ValidationSchema),
}

impl SchemaSource {
    /// A definition without fields counts as missing.
    pub fn is_empty(&self) -> bool {
        match self {
            SchemaSource::Definition(definition) => definition.is_empty(),
            SchemaSource::Validation(_) => false,
        }
    }
}

impl From<SchemaDefinition> for SchemaSource {
    fn from(definition: SchemaDefinition) -> Self {
        SchemaSource::Definition(definition)
    }
}

impl From<ValidationSchema> for SchemaSource {
    fn from(schema: ValidationSchema) -> Self {
        SchemaSource::Validation(schema)
    }
}

/// Replacement for the connector's default connection.
#[derive(Debug, Clone)]
pub enum ConnectionOverride {
    /// Connection string handed to [`Connector::create_connection`].
    Uri(String),
    /// An already opened connection.
    Connection(Connection),
}

impl From<&str> for ConnectionOverride {
    fn from(uri: &str) -> Self {
        ConnectionOverride::Uri(uri.to_string())
    }
}

impl From<String> for ConnectionOverride {
    fn from(uri: String) -> Self {
        ConnectionOverride::Uri(uri)
    }
}

impl From<Connection> for ConnectionOverride {
    fn from(connection: Connection) -> Self {
        ConnectionOverride::Connection(connection)
    }
}

/// An index declaration: key specification alone, or together with its options.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexSpec {
    Keys(Document),
    KeysWithOptions(Document, IndexOptions),
}

impl From<Document> for IndexSpec {
    fn from(keys: Document) -> Self {
        IndexSpec::Keys(keys)
    }
}

impl From<(Document, IndexOptions)> for IndexSpec {
    fn from((keys, options): (Document, IndexOptions)) -> Self {
        IndexSpec::KeysWithOptions(keys, options)
    }
}

/// Input of [`ModelFactory::build`](crate::factory::ModelFactory::build).
#[derive(Clone)]
pub struct ModelConfig {
    pub connector: Arc<dyn Connector>,
    pub schema: Option<SchemaSource>,
    pub collection: Option<String>,
    pub connection: Option<ConnectionOverride>,
    /// Applied to converted validation schemas only.
    pub schema_update: Option<SchemaPostProcessor>,
    pub schema_options: Option<SchemaOptions>,
    /// At most one handler per event, in the order events were first set.
    pub pre: Vec<(HookEvent, PreHook)>,
    pub post: Vec<(HookEvent, PostHook)>,
    pub methods: Methods,
    pub statics: Statics,
    pub indexes: Vec<IndexSpec>,
    pub transform: Option<Transform>,
    pub autoinc: Option<AutoIncrementOptions>,
}

impl ModelConfig {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            schema: None,
            collection: None,
            connection: None,
            schema_update: None,
            schema_options: None,
            pre: Vec::new(),
            post: Vec::new(),
            methods: Methods::new(),
            statics: Statics::new(),
            indexes: Vec::new(),
            transform: None,
            autoinc: None,
        }
    }

    pub fn schema(mut self, schema: impl Into<SchemaSource>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn connection(mut self, connection: impl Into<ConnectionOverride>) -> Self {
        self.connection = Some(connection.into());
        self
    }

    pub fn schema_update<F>(mut self, update: F) -> Self
    where
        F: Fn(SchemaDefinition) -> SchemaDefinition + Send + Sync + 'static,
    {
        self.schema_update = Some(Arc::new(update));
        self
    }

    pub fn schema_options(mut self, options: SchemaOptions) -> Self {
        self.schema_options = Some(options);
        self
    }

    /// Sets the pre hook for `event`, replacing an earlier one.
    pub fn pre(mut self, event: HookEvent, hook: PreHook) -> Self {
        match self.pre.iter_mut().find(|(e, _)| *e == event) {
            Some(entry) => entry.1 = hook,
            None => self.pre.push((event, hook)),
        }
        self
    }

    /// Sets the post hook for `event`, replacing an earlier one.
    pub fn post(mut self, event: HookEvent, hook: PostHook) -> Self {
        match self.post.iter_mut().find(|(e, _)| *e == event) {
            Some(entry) => entry.1 = hook,
            None => self.post.push((event, hook)),
        }
        self
    }

    pub fn method(mut self, name: impl Into<String>, method: InstanceMethod) -> Self {
        self.methods.insert(name.into(), method);
        self
    }

    pub fn methods(mut self, methods: Methods) -> Self {
        self.methods = methods;
        self
    }

    pub fn static_method(mut self, name: impl Into<String>, method: StaticMethod) -> Self {
        self.statics.insert(name.into(), method);
        self
    }

    pub fn statics(mut self, statics: Statics) -> Self {
        self.statics = statics;
        self
    }

    /// Appends an index declaration; declarations are applied in order.
    pub fn index(mut self, index: impl Into<IndexSpec>) -> Self {
        self.indexes.push(index.into());
        self
    }

    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&Document, Document) -> Document + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn autoinc(mut self, options: AutoIncrementOptions) -> Self {
        self.autoinc = Some(options);
        self
    }

    /// Checks the mandatory fields. The schema is checked first.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.schema.as_ref().is_none_or(SchemaSource::is_empty) {
            return Err(ConfigurationError::MissingSchema);
        }

        if self.collection.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigurationError::MissingCollection);
        }

        Ok(())
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods = self.methods.keys().collect::<Vec<_>>();
        let mut statics = self.statics.keys().collect::<Vec<_>>();
        methods.sort();
        statics.sort();

        f.debug_struct("ModelConfig")
            .field("connector", &self.connector)
            .field("schema", &self.schema)
            .field("collection", &self.collection)
            .field("connection", &self.connection)
            .field("schema_update", &self.schema_update.is_some())
            .field("schema_options", &self.schema_options)
            .field("pre", &self.pre.iter().map(|(e, _)| e).collect::<Vec<_>>())
            .field("post", &self.post.iter().map(|(e, _)| e).collect::<Vec<_>>())
            .field("methods", &methods)
            .field("statics", &statics)
            .field("indexes", &self.indexes)
            .field("transform", &self.transform.is_some())
            .field("autoinc", &self.autoinc)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::DocumentStoreResult,
        hooks::pre_hook,
    };
    use async_trait::async_trait;
    use bson::doc;

    #[derive(Debug)]
    struct UnreachableConnector;

    #[async_trait]
    impl Connector for UnreachableConnector {
        fn connection(&self) -> Connection {
            unreachable!("validation never touches the connector")
        }

        async fn create_connection(&self, _uri: &str) -> DocumentStoreResult<Connection> {
            unreachable!("validation never touches the connector")
        }
    }

    fn config() -> ModelConfig {
        ModelConfig::new(Arc::new(UnreachableConnector))
    }

    #[test]
    fn schema_is_checked_before_collection() {
        assert_eq!(config().validate(), Err(ConfigurationError::MissingSchema));
        assert_eq!(
            config().collection("users").validate(),
            Err(ConfigurationError::MissingSchema)
        );
        assert_eq!(
            config().schema(doc! {}).collection("users").validate(),
            Err(ConfigurationError::MissingSchema)
        );
    }

    #[test]
    fn empty_collection_is_missing() {
        let config = config().schema(doc! { "name": "String" });

        assert_eq!(config.clone().validate(), Err(ConfigurationError::MissingCollection));
        assert_eq!(config.collection("").validate(), Err(ConfigurationError::MissingCollection));
    }

    #[test]
    fn validation_schema_counts_as_present() {
        let config = config()
            .schema(ValidationSchema::object())
            .collection("users");

        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn hooks_keep_one_handler_per_event() {
        let config = config()
            .pre(HookEvent::Save, pre_hook(|_, next| async move { next.proceed() }))
            .pre(HookEvent::Remove, pre_hook(|_, next| async move { next.proceed() }))
            .pre(HookEvent::Save, pre_hook(|_, next| async move { next.fail("replaced") }));

        let events = config.pre.iter().map(|(e, _)| *e).collect::<Vec<_>>();
        assert_eq!(events, vec![HookEvent::Save, HookEvent::Remove]);
    }

    #[test]
    fn index_specs_keep_their_shape() {
        let config = config()
            .index(doc! { "name": 1 })
            .index((doc! { "email": 1 }, IndexOptions::unique()));

        assert_eq!(
            config.indexes,
            vec![
                IndexSpec::Keys(doc! { "name": 1 }),
                IndexSpec::KeysWithOptions(doc! { "email": 1 }, IndexOptions::unique()),
            ]
        );
    }

    #[test]
    fn connection_override_from_uri() {
        let config = config().connection("memory://reports");

        assert!(matches!(config.connection, Some(ConnectionOverride::Uri(ref uri)) if uri == "memory://reports"));
    }
}
