//! Autoincrement plugin: numbers new documents from a persistent counter.
//!
//! Each plugin instance owns one counter, scoped to a collection and a field and kept
//! by the connection's backend. When a new document is saved without a value in the
//! target field, the plugin's pre-save hook takes the next counter value. A new document
//! carrying its own number raises the counter to that number, so later documents never
//! receive it again.
//!
//! Unless [`AutoIncrementOptions::unique`] is turned off, the target field also gets a
//! unique index (`_id` is unique already).
//!
//! ```ignore
//! use docmodel::autoinc::{AutoIncrement, AutoIncrementOptions};
//!
//! let plugin = AutoIncrement::initialize(&connection)
//!     .plugin("invoices", &AutoIncrementOptions::new("number").start_at(1000));
//! plugin.seed().await?;
//! schema.plugin(&plugin);
//! ```

use bson::{Bson, doc};
use serde::{Deserialize, Serialize};

use crate::{
    backend::IndexOptions,
    connection::Connection,
    error::{DocumentStoreError, DocumentStoreResult, ModelError},
    hooks::{HookEvent, pre_hook},
    model::ID_FIELD,
    schema::{Schema, SchemaPlugin},
};

/// Counter settings for a model.
///
/// Deserializes from `{ "field": "seq", "startAt": 5, "incrementBy": 1, "unique": true }`;
/// missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoIncrementOptions {
    /// Field receiving the counter value. Defaults to `_id`.
    pub field: String,
    /// Value given to the first document. Defaults to 1.
    pub start_at: i64,
    /// Step between consecutive values. Defaults to 1.
    pub increment_by: i64,
    /// Declare a unique index on the field. Defaults to `true`.
    pub unique: bool,
}

impl Default for AutoIncrementOptions {
    fn default() -> Self {
        Self {
            field: ID_FIELD.to_string(),
            start_at: 1,
            increment_by: 1,
            unique: true,
        }
    }
}

impl AutoIncrementOptions {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into(), ..Default::default() }
    }

    pub fn start_at(mut self, start_at: i64) -> Self {
        self.start_at = start_at;
        self
    }

    pub fn increment_by(mut self, increment_by: i64) -> Self {
        self.increment_by = increment_by;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }
}

/// A counter bound to a collection and field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    /// Backend key of the counter: `<collection>.<field>`.
    pub key: String,
    pub field: String,
    pub start_at: i64,
    pub increment_by: i64,
    pub unique: bool,
}

impl Counter {
    /// Value stored before the first document is numbered.
    pub fn seed_value(&self) -> DocumentStoreResult<i64> {
        self.start_at
            .checked_sub(self.increment_by)
            .ok_or_else(|| self.overflow())
    }

    /// Value the next document receives when the counter holds `current`.
    pub fn next_after(&self, current: i64) -> DocumentStoreResult<i64> {
        current
            .checked_add(self.increment_by)
            .ok_or_else(|| self.overflow())
    }

    fn overflow(&self) -> DocumentStoreError {
        DocumentStoreError::Backend(format!(
            "counter {} overflows with startAt {} and incrementBy {}",
            self.key, self.start_at, self.increment_by
        ))
    }
}

/// Integral value of a numeric field, the way a counter would hold it.
fn counter_number(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(value) => Some(i64::from(*value)),
        Bson::Int64(value) => Some(*value),
        Bson::Double(value) if value.is_finite() => Some(value.ceil() as i64),
        _ => None,
    }
}

/// Autoincrement support initialized against one connection.
#[derive(Debug, Clone)]
pub struct AutoIncrement {
    connection: Connection,
}

impl AutoIncrement {
    pub fn initialize(connection: &Connection) -> Self {
        Self { connection: connection.clone() }
    }

    /// Creates the plugin for `collection`.
    pub fn plugin(&self, collection: &str, options: &AutoIncrementOptions) -> AutoIncrementPlugin {
        AutoIncrementPlugin {
            connection: self.connection.clone(),
            counter: Counter {
                key: format!("{}.{}", collection, options.field),
                field: options.field.clone(),
                start_at: options.start_at,
                increment_by: options.increment_by,
                unique: options.unique,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutoIncrementPlugin {
    connection: Connection,
    counter: Counter,
}

impl AutoIncrementPlugin {
    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    /// Creates the counter in the backend unless it already exists.
    pub async fn seed(&self) -> DocumentStoreResult<()> {
        self.connection
            .backend()
            .seed_counter(&self.counter.key, self.counter.seed_value()?)
            .await?;

        Ok(())
    }
}

impl SchemaPlugin for AutoIncrementPlugin {
    fn apply(&self, schema: &mut Schema) {
        schema.set_counter(self.counter.clone());

        if self.counter.unique && self.counter.field != ID_FIELD {
            schema.index(doc! { self.counter.field.clone(): 1 }, Some(IndexOptions::unique()));
        }

        let connection = self.connection.clone();
        let counter = self.counter.clone();

        schema.pre(HookEvent::Save, pre_hook(move |doc, next| {
            let connection = connection.clone();
            let counter = counter.clone();

            async move {
                if !doc.is_new() {
                    next.proceed();
                    return;
                }

                let backend = connection.backend();
                let numbered = match doc.get(&counter.field) {
                    Some(explicit) => match counter_number(&explicit) {
                        Some(value) => backend.raise_counter(&counter.key, value).await,
                        None => Ok(()),
                    },
                    None => backend
                        .increment_counter(&counter.key, counter.increment_by)
                        .await
                        .map(|value| doc.set(&counter.field, value)),
                };

                match numbered {
                    Ok(()) => next.proceed(),
                    Err(err) => next.fail_with(ModelError::Store(err)),
                }
            }
        }));
    }
}
