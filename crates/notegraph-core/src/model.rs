use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::parser::ParseOptions;
use crate::query::QueryDirective;
use crate::utils::{category_of, compute_digest, time};
use crate::ParseError;

/// Frontmatter as a string-keyed map of loosely typed values.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Pseudo-field resolving to a document's identifier.
pub const FIELD_FILE_NAME: &str = "file.name";
/// Pseudo-field resolving to a document's logical path.
pub const FIELD_FILE_PATH: &str = "file.path";

/// Document identifier: the final segment of its logical path,
/// the name wiki links refer to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(pub String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Core internal coordinate system (0-based, UTF-16 columns)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Point,
    pub end: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    WikiLink,         // [[target]]
    EmbeddedWikiLink, // ![[target]]
}

/// A link reference as written in a document body, before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRef {
    pub target: String,
    pub alias: Option<String>,
    pub anchor: Option<String>,
    pub range: TextRange,
    pub kind: LinkKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    #[default]
    Topic,
    Index,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    /// Logical location: corpus-relative, `/`-separated, no extension.
    pub path: String,
    /// Assigned by the validator; documents straight out of the parser are topics.
    pub kind: DocumentKind,
    pub metadata: Metadata,
    /// Raw text following the frontmatter block.
    pub body: String,
    pub links_out: Vec<LinkRef>,
    pub directives: Vec<QueryDirective>,
    /// SHA-256 of the raw text, or of `to_markdown()` after an edit.
    pub digest: String,
}

impl Document {
    /// Directory part of the logical path; empty for root-level documents.
    pub fn category_prefix(&self) -> &str {
        category_of(&self.path)
    }

    pub fn is_index(&self) -> bool {
        self.kind == DocumentKind::Index
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").and_then(|v| v.as_str())
    }

    pub fn tags(&self) -> Vec<&str> {
        self.metadata
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|tags| tags.iter().filter_map(|t| t.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn date_created(&self) -> Option<NaiveDate> {
        self.metadata.get("date-created").and_then(time::parse_date)
    }

    pub fn date_updated(&self) -> Option<NaiveDate> {
        self.metadata.get("date-updated").and_then(time::parse_date)
    }

    /// Field lookup used by queries. `file.name` and `file.path` are
    /// answered from the document itself, everything else from metadata.
    pub fn field(&self, name: &str) -> Option<serde_json::Value> {
        match name {
            FIELD_FILE_NAME => Some(serde_json::Value::String(self.id.0.clone())),
            FIELD_FILE_PATH => Some(serde_json::Value::String(self.path.clone())),
            _ => self.metadata.get(name).cloned(),
        }
    }

    fn stamp_updated(&mut self, today: NaiveDate) {
        // never earlier than date-created
        let date = self
            .date_created()
            .map_or(today, |created| today.max(created));
        self.metadata.insert(
            "date-updated".to_string(),
            serde_json::Value::String(time::format_date(date)),
        );
    }

    fn refresh_digest(&mut self) -> Result<(), serde_yaml::Error> {
        self.digest = compute_digest(&self.to_markdown()?);
        Ok(())
    }

    /// Refresh `date-updated` and the digest.
    pub fn touch(&mut self, today: NaiveDate) -> Result<(), serde_yaml::Error> {
        self.stamp_updated(today);
        self.refresh_digest()
    }

    /// Replace one metadata field, refresh `date-updated` and the digest.
    pub fn set_field(
        &mut self,
        key: &str,
        value: serde_json::Value,
        today: NaiveDate,
    ) -> Result<(), serde_yaml::Error> {
        self.metadata.insert(key.to_string(), value);
        if key != "date-updated" {
            self.stamp_updated(today);
        }
        self.refresh_digest()
    }

    /// Replace the body, refresh `date-updated` and re-extract links and directives.
    pub fn set_body(
        &mut self,
        body: &str,
        today: NaiveDate,
        options: &ParseOptions,
    ) -> Result<(), ParseError> {
        self.body = body.to_string();
        self.stamp_updated(today);

        let text = self
            .to_markdown()
            .map_err(|e| ParseError::InvalidFrontmatter(e.to_string()))?;
        let reparsed = crate::parser::parse_document(&self.path, &text, options)?;
        self.links_out = reparsed.links_out;
        self.directives = reparsed.directives;
        self.digest = reparsed.digest;
        Ok(())
    }

    /// Serialize back to frontmatter + body.
    pub fn to_markdown(&self) -> Result<String, serde_yaml::Error> {
        if self.metadata.is_empty() {
            return Ok(self.body.clone());
        }
        let yaml = serde_yaml::to_string(&self.metadata)?;
        Ok(format!("---\n{yaml}---\n{}", self.body))
    }
}
