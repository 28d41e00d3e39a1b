//! Query translation from filter expressions to MongoDB query syntax.

use bson::{Bson, Document, doc};

use docmodel_core::{
    error::DocumentStoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Translates filter expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    // `$not` only applies to field operators; `$nor` negates a whole expression.
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let operator = match op {
            FieldOp::Eq => "$eq",
            FieldOp::Ne => "$ne",
            FieldOp::Gt => "$gt",
            FieldOp::Gte => "$gte",
            FieldOp::Lt => "$lt",
            FieldOp::Lte => "$lte",
            FieldOp::In | FieldOp::Nin => {
                if !matches!(value, Bson::Array(_)) {
                    return Err(DocumentStoreError::InvalidDocument(format!(
                        "{op:?} on {field} expects an array"
                    )));
                }

                if op == FieldOp::In { "$in" } else { "$nin" }
            }
        };

        Ok(doc! {
            field: { operator: value.clone() },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmodel_core::query::Filter;

    fn translate(expr: Expr) -> Document {
        MongoQueryTranslator.visit_expr(&expr).unwrap()
    }

    #[test]
    fn field_operators() {
        assert_eq!(translate(Filter::eq("name", "Alice")), doc! { "name": { "$eq": "Alice" } });
        assert_eq!(translate(Filter::lte("age", 30)), doc! { "age": { "$lte": 30 } });
        assert_eq!(
            translate(Filter::not_in("role", ["admin"])),
            doc! { "role": { "$nin": ["admin"] } }
        );
    }

    #[test]
    fn negation_uses_nor() {
        assert_eq!(
            translate(Filter::exists("email").not()),
            doc! { "$nor": [{ "email": { "$exists": true } }] }
        );
    }

    #[test]
    fn conjunctions_nest() {
        assert_eq!(
            translate(Filter::eq("a", 1).and(Filter::eq("b", 2)).or(Filter::eq("c", 3))),
            doc! {
                "$or": [
                    { "$and": [{ "a": { "$eq": 1 } }, { "b": { "$eq": 2 } }] },
                    { "c": { "$eq": 3 } },
                ]
            }
        );
    }

    #[test]
    fn membership_requires_an_array() {
        let expr = Expr::field("role", FieldOp::In, "admin");

        assert!(MongoQueryTranslator.visit_expr(&expr).is_err());
    }
}
