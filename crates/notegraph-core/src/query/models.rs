use serde::{Deserialize, Serialize};

use crate::error::DirectiveError;
use crate::model::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    List,
    Table,
}

/// `field = value`. On list-valued fields this tests membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    pub direction: SortDirection,
}

/// A declarative filter/sort/limit request embedded in a document.
///
/// Malformed directives are still represented; `error` carries the reason
/// so evaluation can report it instead of silently returning nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDirective {
    pub mode: OutputMode,
    /// Path prefix; empty means the whole corpus.
    pub scope: String,
    pub predicates: Vec<Predicate>,
    pub projection: Vec<String>,
    pub order: Option<SortOrder>,
    pub limit: Option<usize>,
    /// Raw directive text as written in the document.
    pub source: String,
    /// Location of the fenced block inside its host document.
    pub range: Option<TextRange>,
    pub error: Option<DirectiveError>,
}

impl QueryDirective {
    /// Parse directive text. Never fails: problems land in `error`.
    pub fn parse(source: &str) -> Self {
        match super::parse::parse_directive(source) {
            Ok(directive) => directive,
            Err(message) => Self::malformed(source, message),
        }
    }

    pub(crate) fn malformed(source: &str, message: String) -> Self {
        Self {
            mode: OutputMode::List,
            scope: String::new(),
            predicates: Vec::new(),
            projection: Vec::new(),
            order: None,
            limit: None,
            source: source.to_string(),
            range: None,
            error: Some(DirectiveError::Malformed(message)),
        }
    }

    pub fn at(mut self, range: TextRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}
