//! Notegraph Core Library
//!
//! Document parser, metadata validator, corpus index, link resolver and
//! query engine for a wiki-linked Markdown knowledge base.
//! Disk access is confined to `vfs` and `cache`; everything else is pure logic.
//!

pub mod cache;
pub mod config;
pub mod error;
pub mod line_map;
pub mod links;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod query;
pub mod schema;
pub mod store;
pub mod utils;
pub mod vfs;

pub use config::NotegraphConfig;
pub use error::{CorpusError, DirectiveError, ParseError, ValidationError, ValidationErrorKind};
pub use links::{DanglingLinkWarning, Link, LinkGraph};
pub use model::{DocId, Document, DocumentKind, Metadata};
pub use parser::{parse_document, ParseOptions, WikiLinkFormat};
pub use pipeline::{BatchReport, Pipeline, SourceDocument};
pub use query::{QueryDirective, QueryEngine, QueryResult};
pub use schema::Schema;
pub use store::{Corpus, Snapshot};
