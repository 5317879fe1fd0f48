//! Metadata validation.
//!
//! Metadata stays a loosely typed map; the schema is a set of field tables
//! keyed by document kind. A document is accepted only if it passes every
//! rule, and all violations are reported together.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::SchemaConfig;
use crate::error::{ValidationError, ValidationErrorKind};
use crate::model::{Document, DocumentKind, Metadata};
use crate::utils::time;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Any value is accepted.
    Any,
    Text,
    TextList,
    Date,
    Enum(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    fn required(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
        }
    }

    fn optional(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    index_tag: String,
    common: Vec<FieldSpec>,
    per_kind: HashMap<DocumentKind, Vec<FieldSpec>>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::from_config(&SchemaConfig::default())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

impl Schema {
    pub fn from_config(config: &SchemaConfig) -> Self {
        let common = vec![
            FieldSpec::required("title", FieldKind::Text),
            FieldSpec::required("category", FieldKind::Text),
            FieldSpec::required("tags", FieldKind::TextList),
            FieldSpec::required("date-created", FieldKind::Date),
            FieldSpec::required("date-updated", FieldKind::Date),
            FieldSpec::optional("difficulty", FieldKind::Enum(config.difficulty_values.clone())),
            FieldSpec::optional("status", FieldKind::Enum(config.status_values.clone())),
            FieldSpec::optional("sources", FieldKind::TextList),
            FieldSpec::optional(
                "type",
                FieldKind::Enum(vec!["topic".to_string(), "index".to_string()]),
            ),
        ];

        let extra = |names: &[String]| -> Vec<FieldSpec> {
            names
                .iter()
                .map(|name| FieldSpec::required(name, FieldKind::Any))
                .collect()
        };

        let mut per_kind = HashMap::new();
        per_kind.insert(DocumentKind::Topic, extra(&config.required_topic_fields));
        per_kind.insert(DocumentKind::Index, extra(&config.required_index_fields));

        Self {
            index_tag: config.index_tag.clone(),
            common,
            per_kind,
        }
    }

    pub fn index_tag(&self) -> &str {
        &self.index_tag
    }

    fn fields_for(&self, kind: DocumentKind) -> impl Iterator<Item = &FieldSpec> {
        self.common
            .iter()
            .chain(self.per_kind.get(&kind).into_iter().flatten())
    }

    /// Type of a schema field, in any document kind.
    pub fn field_kind(&self, name: &str) -> Option<&FieldKind> {
        self.common
            .iter()
            .chain(self.per_kind.values().flatten())
            .find(|spec| spec.name == name)
            .map(|spec| &spec.kind)
    }

    fn has_index_tag(&self, metadata: &Metadata) -> bool {
        metadata
            .get("tags")
            .and_then(|v| v.as_array())
            .is_some_and(|tags| tags.iter().any(|t| t.as_str() == Some(&self.index_tag)))
    }

    fn declares_index(metadata: &Metadata) -> bool {
        metadata.get("type").and_then(|v| v.as_str()) == Some("index")
    }

    pub fn classify(&self, metadata: &Metadata) -> DocumentKind {
        if self.has_index_tag(metadata) || Self::declares_index(metadata) {
            DocumentKind::Index
        } else {
            DocumentKind::Topic
        }
    }

    fn check_field(&self, spec: &FieldSpec, metadata: &Metadata, errors: &mut Vec<ValidationError>) {
        use ValidationErrorKind::*;

        let Some(value) = metadata.get(&spec.name) else {
            if spec.required {
                errors.push(ValidationError::new(MissingField, &spec.name, "is required"));
            }
            return;
        };

        match &spec.kind {
            FieldKind::Any => {}
            FieldKind::Text => match value {
                Value::String(s) if spec.required && s.trim().is_empty() => {
                    errors.push(ValidationError::new(MissingField, &spec.name, "is empty"));
                }
                Value::String(_) => {}
                other => errors.push(ValidationError::new(
                    WrongType,
                    &spec.name,
                    format!("expected a string, found {}", type_name(other)),
                )),
            },
            FieldKind::TextList => match value {
                Value::Array(items) => {
                    if let Some(bad) = items.iter().find(|item| !item.is_string()) {
                        errors.push(ValidationError::new(
                            WrongType,
                            &spec.name,
                            format!("expected a list of strings, found {} entry", type_name(bad)),
                        ));
                    }
                }
                other => errors.push(ValidationError::new(
                    WrongType,
                    &spec.name,
                    format!("expected a list of strings, found {}", type_name(other)),
                )),
            },
            FieldKind::Date => match value {
                Value::String(raw) => {
                    if time::parse_date_str(raw).is_none() {
                        errors.push(ValidationError::new(
                            InvalidDate,
                            &spec.name,
                            format!("`{raw}` is not a date (expected YYYY-MM-DD)"),
                        ));
                    }
                }
                other => errors.push(ValidationError::new(
                    WrongType,
                    &spec.name,
                    format!("expected a date string, found {}", type_name(other)),
                )),
            },
            FieldKind::Enum(allowed) => match value {
                Value::String(s) if allowed.iter().any(|a| a == s) => {}
                Value::String(s) => errors.push(ValidationError::new(
                    InvalidValue,
                    &spec.name,
                    format!("`{s}` is not one of: {}", allowed.join(", ")),
                )),
                other => errors.push(ValidationError::new(
                    WrongType,
                    &spec.name,
                    format!("expected a string, found {}", type_name(other)),
                )),
            },
        }
    }

    /// Accept a document, assigning its kind, or reject it with every violation found.
    pub fn validate(&self, mut doc: Document) -> Result<Document, Vec<ValidationError>> {
        let kind = self.classify(&doc.metadata);
        let mut errors = Vec::new();

        for spec in self.fields_for(kind) {
            self.check_field(spec, &doc.metadata, &mut errors);
        }

        if let (Some(created), Some(updated)) = (doc.date_created(), doc.date_updated()) {
            if updated < created {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidDate,
                    "date-updated",
                    format!("{updated} is earlier than date-created {created}"),
                ));
            }
        }

        if Self::declares_index(&doc.metadata) && !self.has_index_tag(&doc.metadata) {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingField,
                "tags",
                format!("index documents must be tagged `{}`", self.index_tag),
            ));
        }

        if errors.is_empty() {
            doc.kind = kind;
            Ok(doc)
        } else {
            Err(errors)
        }
    }
}
