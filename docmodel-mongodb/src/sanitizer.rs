//! Key sanitization for MongoDB compatibility.
//!
//! MongoDB does not allow field names to contain dots (`.`), dollar signs (`$`) or null
//! bytes. Keys are escaped before writing and restored after reading; values are stored
//! untouched so they stay queryable.

use bson::{Bson, Document};

pub(crate) struct KeySanitizer;

impl KeySanitizer {
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    /// Escapes the keys of `document`, recursing into nested documents and arrays.
    pub(crate) fn sanitize_document(document: &Document) -> Document {
        document
            .iter()
            .map(|(k, v)| (Self::sanitize_string(k), Self::map_value(v, Self::sanitize_document)))
            .collect()
    }

    /// Reverts [`sanitize_document`](Self::sanitize_document).
    pub(crate) fn restore_document(document: &Document) -> Document {
        document
            .iter()
            .map(|(k, v)| (Self::restore_string(k), Self::map_value(v, Self::restore_document)))
            .collect()
    }

    fn map_value(value: &Bson, map: fn(&Document) -> Document) -> Bson {
        match value {
            Bson::Document(doc) => Bson::Document(map(doc)),
            Bson::Array(arr) => Bson::Array(
                arr.iter()
                    .map(|item| Self::map_value(item, map))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    pub(crate) fn sanitize_string(input: &str) -> String {
        let mut sanitized = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter() {
            sanitized = sanitized.replace(*target, *replacement);
        }
        sanitized
    }

    pub(crate) fn restore_string(input: &str) -> String {
        let mut restored = input.to_string();
        for (target, replacement) in Self::REPLACEMENTS.iter().rev() {
            restored = restored.replace(*replacement, *target);
        }
        restored
    }
}
