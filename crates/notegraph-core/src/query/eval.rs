use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use super::models::{Predicate, QueryDirective, SortDirection};
use crate::error::DirectiveError;
use crate::model::{DocId, Document, Metadata, FIELD_FILE_NAME, FIELD_FILE_PATH};
use crate::schema::{FieldKind, Schema};
use crate::store::Snapshot;
use crate::utils::{scope_covers, time};

/// One projected document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRow {
    pub id: DocId,
    pub path: String,
    pub fields: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Projected field names, in directive order.
    pub columns: Vec<String>,
    pub rows: Vec<QueryRow>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.id.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Date(NaiveDate),
    Number(f64),
    Text(String),
}

impl SortKey {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            // keys of one field share a mode; this is unreachable in practice
            _ => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SortMode {
    Date,
    Number,
    Text,
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(text_of).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

fn scalar_equals(value: &Value, expected: &str, is_date: bool) -> bool {
    if is_date {
        if let (Some(actual), Some(wanted)) =
            (time::parse_date(value), time::parse_date_str(expected))
        {
            return actual == wanted;
        }
    }
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        _ => false,
    }
}

/// Evaluates directives against one immutable corpus snapshot.
///
/// Nothing is cached: build a new engine from a fresh snapshot after
/// every corpus change.
pub struct QueryEngine<'a> {
    snapshot: &'a Snapshot,
    schema: &'a Schema,
}

impl<'a> QueryEngine<'a> {
    pub fn new(snapshot: &'a Snapshot, schema: &'a Schema) -> Self {
        Self { snapshot, schema }
    }

    /// Evaluate a directive that lives inside `host`. Directives in an
    /// index document must be scoped to at least that index's category.
    pub fn evaluate_in(
        &self,
        directive: &QueryDirective,
        host: &Document,
    ) -> Result<QueryResult, DirectiveError> {
        if let Some(error) = &directive.error {
            return Err(error.clone());
        }
        if host.is_index() && !scope_covers(&directive.scope, host.category_prefix()) {
            return Err(DirectiveError::ScopeTooNarrow {
                scope: directive.scope.clone(),
                category: host.category_prefix().to_string(),
            });
        }
        self.evaluate(directive)
    }

    /// Scope, filter (AND), sort, limit, project.
    pub fn evaluate(&self, directive: &QueryDirective) -> Result<QueryResult, DirectiveError> {
        if let Some(error) = &directive.error {
            return Err(error.clone());
        }
        self.check_fields(directive)?;

        let candidates: Vec<Arc<Document>> = self
            .snapshot
            .by_category(&directive.scope)
            .into_iter()
            .filter(|doc| directive.predicates.iter().all(|p| self.matches(doc, p)))
            .collect();

        let mut ranked = self.rank(candidates, directive);
        if let Some(limit) = directive.limit {
            ranked.truncate(limit);
        }

        let rows = ranked
            .iter()
            .map(|doc| QueryRow {
                id: doc.id.clone(),
                path: doc.path.clone(),
                fields: directive
                    .projection
                    .iter()
                    .map(|field| (field.clone(), doc.field(field).unwrap_or(Value::Null)))
                    .collect(),
            })
            .collect();

        Ok(QueryResult {
            columns: directive.projection.clone(),
            rows,
        })
    }

    fn check_fields(&self, directive: &QueryDirective) -> Result<(), DirectiveError> {
        let mut corpus_fields: Option<BTreeSet<String>> = None;
        let referenced = directive
            .predicates
            .iter()
            .map(|p| p.field.as_str())
            .chain(directive.order.iter().map(|o| o.field.as_str()));

        for field in referenced {
            if field == FIELD_FILE_NAME
                || field == FIELD_FILE_PATH
                || self.schema.field_kind(field).is_some()
            {
                continue;
            }
            let known = corpus_fields.get_or_insert_with(|| self.snapshot.field_names());
            if !known.contains(field) {
                return Err(DirectiveError::UnknownField(field.to_string()));
            }
        }
        Ok(())
    }

    fn is_date_field(&self, field: &str) -> bool {
        matches!(self.schema.field_kind(field), Some(FieldKind::Date))
    }

    fn matches(&self, doc: &Document, predicate: &Predicate) -> bool {
        let Some(value) = doc.field(&predicate.field) else {
            return false;
        };
        let is_date = self.is_date_field(&predicate.field);
        match &value {
            Value::Array(items) => items
                .iter()
                .any(|item| scalar_equals(item, &predicate.value, is_date)),
            other => scalar_equals(other, &predicate.value, is_date),
        }
    }

    fn sort_mode(&self, field: &str, values: &[Option<Value>]) -> SortMode {
        if self.is_date_field(field) {
            return SortMode::Date;
        }
        let mut present = values.iter().flatten().peekable();
        if present.peek().is_none() {
            return SortMode::Text;
        }
        let present: Vec<&Value> = present.collect();
        if present.iter().all(|v| time::parse_date(v).is_some()) {
            SortMode::Date
        } else if present.iter().all(|v| v.is_number()) {
            SortMode::Number
        } else {
            SortMode::Text
        }
    }

    /// Order documents by the directive's sort field. Missing values go
    /// last in both directions; ties fall back to ascending identifier.
    fn rank(&self, docs: Vec<Arc<Document>>, directive: &QueryDirective) -> Vec<Arc<Document>> {
        let Some(order) = &directive.order else {
            let mut docs = docs;
            docs.sort_by(|a, b| a.id.cmp(&b.id));
            return docs;
        };

        let values: Vec<Option<Value>> = docs
            .iter()
            .map(|doc| doc.field(&order.field).filter(|v| !v.is_null()))
            .collect();
        let mode = self.sort_mode(&order.field, &values);

        let mut keyed: Vec<(Option<SortKey>, Arc<Document>)> = values
            .into_iter()
            .zip(docs)
            .map(|(value, doc)| {
                let key = value.and_then(|v| match mode {
                    SortMode::Date => time::parse_date(&v).map(SortKey::Date),
                    SortMode::Number => v.as_f64().map(SortKey::Number),
                    SortMode::Text => Some(SortKey::Text(text_of(&v))),
                });
                (key, doc)
            })
            .collect();

        keyed.sort_by(|(key_a, doc_a), (key_b, doc_b)| {
            let primary = match (key_a, key_b) {
                (Some(a), Some(b)) => {
                    let ordering = a.compare(b);
                    match order.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            primary.then_with(|| doc_a.id.cmp(&doc_b.id))
        });

        keyed.into_iter().map(|(_, doc)| doc).collect()
    }
}
