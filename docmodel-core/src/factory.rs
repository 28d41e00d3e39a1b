//! Turns a [`ModelConfig`] into a registered [`Model`].
//!
//! Building is a single linear pass:
//!
//! 1. the mandatory fields are checked, before any connection is touched;
//! 2. one connection is resolved: the connector's default, a new connection opened
//!    from a connection string, or a connection supplied by the caller;
//! 3. the schema definition is resolved, converting validation schemas and passing the
//!    result through the configured post-processor;
//! 4. the schema is assembled: autoincrement counter, `toObject` transform, hooks,
//!    method tables and indexes;
//! 5. the model is registered on the resolved connection, which creates its indexes.
//!
//! Failures of the connector, the converter, the counter seeding or the index creation
//! are returned as-is.

use std::sync::Arc;
use tracing::debug;

use crate::{
    autoinc::AutoIncrement,
    config::{ConnectionOverride, IndexSpec, ModelConfig, SchemaSource},
    convert::{SchemaConverter, ValidationConverter},
    error::{ConfigurationError, ModelResult},
    model::Model,
    schema::{Schema, SchemaDefinition, ToObjectOptions},
};

/// Builds models from configuration.
#[derive(Debug, Clone)]
pub struct ModelFactory {
    converter: Arc<dyn SchemaConverter>,
}

impl Default for ModelFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelFactory {
    /// A factory converting validation schemas with [`ValidationConverter`].
    pub fn new() -> Self {
        Self::with_converter(ValidationConverter)
    }

    pub fn with_converter(converter: impl SchemaConverter + 'static) -> Self {
        Self { converter: Arc::new(converter) }
    }

    pub async fn build(&self, config: ModelConfig) -> ModelResult<Model> {
        config.validate()?;

        let ModelConfig {
            connector,
            schema: source,
            collection,
            connection,
            schema_update,
            schema_options,
            pre,
            post,
            methods,
            statics,
            indexes,
            transform,
            autoinc,
        } = config;

        let source = source.ok_or(ConfigurationError::MissingSchema)?;
        let collection = collection.ok_or(ConfigurationError::MissingCollection)?;

        let connection = match connection {
            Some(ConnectionOverride::Uri(uri)) if !uri.is_empty() => {
                debug!(%collection, %uri, "opening connection");
                connector.create_connection(&uri).await?
            }
            Some(ConnectionOverride::Connection(connection)) => connection,
            _ => connector.connection(),
        };

        let definition: SchemaDefinition = match source {
            SchemaSource::Definition(definition) => definition,
            SchemaSource::Validation(validation) => {
                let definition = self.converter.convert(&validation)?;
                debug!(%collection, "validation schema converted");

                match schema_update {
                    Some(update) => update(definition),
                    None => definition,
                }
            }
        };

        let mut schema = Schema::with_options(definition, schema_options.unwrap_or_default());

        if let Some(options) = autoinc {
            let plugin = AutoIncrement::initialize(&connection).plugin(&collection, &options);
            plugin.seed().await?;
            schema.plugin(&plugin);

            debug!(%collection, counter = %plugin.counter().key, "autoincrement attached");
        }

        if let Some(transform) = transform {
            if schema.options().to_object.is_none() {
                schema.options_mut().to_object = Some(ToObjectOptions { transform: Some(transform) });
            }
        }

        for (event, hook) in pre {
            schema.pre(event, hook);
        }

        for (event, hook) in post {
            schema.post(event, hook);
        }

        if !methods.is_empty() {
            schema.set_methods(methods);
        }

        if !statics.is_empty() {
            schema.set_statics(statics);
        }

        for index in indexes {
            match index {
                IndexSpec::KeysWithOptions(keys, options) => schema.index(keys, Some(options)),
                IndexSpec::Keys(keys) => schema.index(keys, None),
            };
        }

        debug!(%collection, connection = connection.name(), "schema assembled");

        connection.model(&collection, schema).await
    }
}

/// Builds `config` with a default [`ModelFactory`].
pub async fn build_model(config: ModelConfig) -> ModelResult<Model> {
    ModelFactory::new().build(config).await
}
