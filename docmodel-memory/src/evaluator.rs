//! Query expression evaluation for in-memory document filtering.
//!
//! Field lookups accept dotted paths (`address.city`). Comparisons against array
//! fields match when any element matches, as a document database would.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime};

use docmodel_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Comparable representation of BSON values.
///
/// Integers and floats are normalized to `f64`. Values without a natural ordering
/// (binary, object ids, ...) only support equality.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect()
            ),
            other => Comparable::Other(other),
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Comparable<'_> {
    /// Equality, also satisfied by an array containing `other`.
    fn matches(&self, other: &Comparable<'_>) -> bool {
        match self {
            Comparable::Array(items) if !matches!(other, Comparable::Array(_)) => {
                items.iter().any(|item| item == other)
            }
            _ => self == other,
        }
    }
}

/// Resolves a dotted path inside `document`.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    pub fn filter_documents<I>(documents: I, expr: &Expr) -> DocumentStoreResult<Vec<Document>>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut matched = Vec::new();

        for doc in documents {
            if DocumentEvaluator::new(doc).evaluate(expr)? {
                matched.push(doc.clone());
            }
        }

        Ok(matched)
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let field_value = lookup(self.document, field);
        let actual = field_value.map(Comparable::from).unwrap_or(Comparable::Null);
        let expected = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => actual.matches(&expected),
            FieldOp::Ne => !actual.matches(&expected),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                let Some(ordering) = actual.partial_cmp(&expected) else {
                    return Ok(false);
                };

                match op {
                    FieldOp::Gt => ordering == Ordering::Greater,
                    FieldOp::Gte => ordering != Ordering::Less,
                    FieldOp::Lt => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                }
            }
            FieldOp::In | FieldOp::Nin => {
                let Bson::Array(candidates) = value else {
                    return Err(DocumentStoreError::InvalidDocument(format!(
                        "{op:?} on {field} expects an array"
                    )));
                };
                let found = candidates
                    .iter()
                    .any(|candidate| actual.matches(&Comparable::from(candidate)));

                if op == FieldOp::In { found } else { !found }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docmodel_core::query::Filter;

    fn eval(document: &Document, expr: Expr) -> bool {
        DocumentEvaluator::new(document).evaluate(&expr).unwrap()
    }

    #[test]
    fn numeric_types_compare_across_widths() {
        let doc = doc! { "age": 30_i64 };

        assert!(eval(&doc, Filter::eq("age", 30)));
        assert!(eval(&doc, Filter::gte("age", 30.0)));
        assert!(!eval(&doc, Filter::lt("age", 30)));
    }

    #[test]
    fn arrays_match_any_element() {
        let doc = doc! { "tags": ["admin", "staff"] };

        assert!(eval(&doc, Filter::eq("tags", "admin")));
        assert!(eval(&doc, Filter::is_in("tags", ["guest", "staff"])));
        assert!(eval(&doc, Filter::not_in("tags", ["guest"])));
    }

    #[test]
    fn dotted_paths_reach_nested_fields() {
        let doc = doc! { "address": { "city": "Lyon" } };

        assert!(eval(&doc, Filter::eq("address.city", "Lyon")));
        assert!(eval(&doc, Filter::exists("address.city")));
        assert!(eval(&doc, Filter::not_exists("address.zip")));
    }

    #[test]
    fn missing_fields_compare_as_null() {
        let doc = doc! { "name": "Alice" };

        assert!(eval(&doc, Filter::eq("email", Bson::Null)));
        assert!(eval(&doc, Filter::ne("email", "a@example.com")));
        assert!(!eval(&doc, Filter::gt("age", 1)));
    }

    #[test]
    fn membership_requires_an_array() {
        let doc = doc! { "name": "Alice" };
        let expr = Expr::field("name", FieldOp::In, "Alice");

        assert!(DocumentEvaluator::new(&doc).evaluate(&expr).is_err());
    }
}
