//! Error taxonomy for the notegraph core.
//!
//! Every failure is scoped to the smallest unit that caused it: one
//! document (`ParseError`, `ValidationError`), one directive
//! (`DirectiveError`). `CorpusError` only covers the I/O boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to split or decode a document's frontmatter block.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum ParseError {
    /// The opening `---` delimiter has no matching closing line.
    #[error("frontmatter block opened on line 1 is never closed")]
    UnterminatedFrontmatter,

    /// The block between the delimiters is not valid YAML.
    #[error("invalid frontmatter: {0}")]
    InvalidFrontmatter(String),

    /// The YAML parsed, but to something other than a mapping.
    #[error("frontmatter must be a mapping, found {0}")]
    FrontmatterNotMapping(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    MissingField,
    WrongType,
    InvalidDate,
    InvalidValue,
}

/// One metadata rule violated by a document.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind:?} `{field}`: {message}")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, field: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// A query directive that cannot produce a result.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum DirectiveError {
    #[error("malformed directive: {0}")]
    Malformed(String),

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("scope `{scope}` does not cover the index category `{category}`")]
    ScopeTooNarrow { scope: String, category: String },
}

/// Errors raised at the storage / configuration boundary.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("incompatible snapshot version {found} (expected {expected})")]
    SnapshotVersion { found: u32, expected: u32 },

    #[error("invalid ignore pattern: {0}")]
    Pattern(#[from] globset::Error),
}
