//! Validation schemas and their conversion into schema definitions.
//!
//! A [`ValidationSchema`] describes values the way a validation library does (type,
//! required flag, bounds, allowed values) and is independent from the field definition
//! syntax used by [`Schema`](crate::schema::Schema). A [`SchemaConverter`] bridges the two;
//! [`ValidationConverter`] is the default implementation.
//!
//! Validation schemas can be built in code or deserialized from JSON:
//!
//! ```ignore
//! use docmodel::convert::ValidationSchema;
//!
//! let schema = ValidationSchema::object()
//!     .key("email", ValidationSchema::string().required().pattern(".+@.+"))
//!     .key("age", ValidationSchema::integer().min(0.0));
//!
//! let same: ValidationSchema = serde_json::from_value(serde_json::json!({
//!     "type": "object",
//!     "keys": {
//!         "email": { "type": "string", "required": true, "pattern": ".+@.+" },
//!         "age": { "type": "integer", "min": 0.0 }
//!     }
//! }))?;
//! ```

use bson::{Bson, Document, doc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Debug};

use crate::{
    error::{ModelError, ModelResult},
    schema::SchemaDefinition,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    Any,
    String,
    Number,
    Integer,
    Boolean,
    Date,
    Object,
    Array,
}

/// Declarative description of an accepted value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSchema {
    #[serde(rename = "type")]
    pub kind: ValueKind,
    /// Child schemas of an object, by key.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub keys: BTreeMap<String, ValidationSchema>,
    /// Element schema of an array.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ValidationSchema>>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Bson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Exhaustive list of allowed values.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub valid: Vec<Bson>,
}

impl ValidationSchema {
    fn of(kind: ValueKind) -> Self {
        Self { kind, ..Default::default() }
    }

    pub fn any() -> Self {
        Self::of(ValueKind::Any)
    }

    pub fn string() -> Self {
        Self::of(ValueKind::String)
    }

    pub fn number() -> Self {
        Self::of(ValueKind::Number)
    }

    pub fn integer() -> Self {
        Self::of(ValueKind::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(ValueKind::Boolean)
    }

    pub fn date() -> Self {
        Self::of(ValueKind::Date)
    }

    pub fn object() -> Self {
        Self::of(ValueKind::Object)
    }

    pub fn array(items: ValidationSchema) -> Self {
        Self { items: Some(Box::new(items)), ..Self::of(ValueKind::Array) }
    }

    pub fn key(mut self, name: impl Into<String>, schema: ValidationSchema) -> Self {
        self.keys.insert(name.into(), schema);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Bson>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn min_length(mut self, len: u64) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: u64) -> Self {
        self.max_length = Some(len);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn valid<V: Into<Bson>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.valid = values.into_iter().map(Into::into).collect();
        self
    }
}

/// Translates a validation schema into a schema definition.
pub trait SchemaConverter: Send + Sync + Debug {
    fn convert(&self, schema: &ValidationSchema) -> ModelResult<SchemaDefinition>;
}

/// Default converter.
///
/// | validation type | field type |
/// |---|---|
/// | `string` | `String` |
/// | `number`, `integer` | `Number` |
/// | `boolean` | `Boolean` |
/// | `date` | `Date` |
/// | `any`, `object` without keys | `Mixed` |
/// | `object` with keys | nested definition |
/// | `array` | `[item]` |
///
/// Constraints become field options: `required`, `default`, `min`, `max`,
/// `minlength`, `maxlength`, `match` and `enum`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidationConverter;

impl ValidationConverter {
    fn type_name(kind: ValueKind) -> &'static str {
        match kind {
            ValueKind::String => "String",
            ValueKind::Number | ValueKind::Integer => "Number",
            ValueKind::Boolean => "Boolean",
            ValueKind::Date => "Date",
            ValueKind::Any | ValueKind::Object | ValueKind::Array => "Mixed",
        }
    }

    fn convert_keys(&self, keys: &BTreeMap<String, ValidationSchema>) -> Document {
        keys.iter()
            .map(|(name, schema)| (name.clone(), self.convert_field(schema)))
            .collect()
    }

    fn convert_field(&self, schema: &ValidationSchema) -> Bson {
        let field_type = match schema.kind {
            // Nested paths carry no options of their own.
            ValueKind::Object if !schema.keys.is_empty() => {
                return Bson::Document(self.convert_keys(&schema.keys));
            }
            ValueKind::Array => Bson::Array(vec![
                schema
                    .items
                    .as_deref()
                    .map(|items| self.convert_field(items))
                    .unwrap_or_else(|| Bson::from("Mixed")),
            ]),
            kind => Bson::from(Self::type_name(kind)),
        };

        let mut field = doc! { "type": field_type };

        if schema.required {
            field.insert("required", true);
        }
        if let Some(default) = &schema.default {
            field.insert("default", default.clone());
        }
        if let Some(min) = schema.min {
            field.insert("min", min);
        }
        if let Some(max) = schema.max {
            field.insert("max", max);
        }
        if let Some(len) = schema.min_length {
            field.insert("minlength", len as i64);
        }
        if let Some(len) = schema.max_length {
            field.insert("maxlength", len as i64);
        }
        if let Some(pattern) = &schema.pattern {
            field.insert("match", pattern.clone());
        }
        if !schema.valid.is_empty() {
            field.insert("enum", schema.valid.clone());
        }

        Bson::Document(field)
    }
}

impl SchemaConverter for ValidationConverter {
    fn convert(&self, schema: &ValidationSchema) -> ModelResult<SchemaDefinition> {
        match schema.kind {
            ValueKind::Object => Ok(self.convert_keys(&schema.keys)),
            other => Err(ModelError::Conversion(format!(
                "root schema must be an object, got {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_types_and_constraints() {
        let schema = ValidationSchema::object()
            .key("name", ValidationSchema::string().required().max_length(64))
            .key("age", ValidationSchema::integer().min(0.0).default_value(18))
            .key("role", ValidationSchema::string().valid(["admin", "user"]));

        let definition = ValidationConverter.convert(&schema).unwrap();

        assert_eq!(
            definition,
            doc! {
                "age": { "type": "Number", "default": 18, "min": 0.0 },
                "name": { "type": "String", "required": true, "maxlength": 64_i64 },
                "role": { "type": "String", "enum": ["admin", "user"] },
            }
        );
    }

    #[test]
    fn nested_objects_and_arrays() {
        let schema = ValidationSchema::object()
            .key(
                "address",
                ValidationSchema::object().key("city", ValidationSchema::string()),
            )
            .key("tags", ValidationSchema::array(ValidationSchema::string()))
            .key("meta", ValidationSchema::object());

        let definition = ValidationConverter.convert(&schema).unwrap();

        assert_eq!(definition.get_document("address").unwrap(), &doc! { "city": { "type": "String" } });
        assert_eq!(definition.get_document("tags").unwrap(), &doc! { "type": [{ "type": "String" }] });
        assert_eq!(definition.get_document("meta").unwrap(), &doc! { "type": "Mixed" });
    }

    #[test]
    fn root_must_be_an_object() {
        let err = ValidationConverter
            .convert(&ValidationSchema::string())
            .unwrap_err();

        assert!(matches!(err, ModelError::Conversion(_)));
    }

    #[test]
    fn deserializes_from_json() {
        let schema: ValidationSchema = serde_json::from_value(serde_json::json!({
            "type": "object",
            "keys": {
                "email": { "type": "string", "required": true, "pattern": ".+@.+" }
            }
        }))
        .unwrap();

        assert_eq!(
            schema,
            ValidationSchema::object().key(
                "email",
                ValidationSchema::string().required().pattern(".+@.+")
            )
        );
    }
}
