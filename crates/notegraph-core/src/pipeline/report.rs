use serde::Serialize;

use crate::error::{DirectiveError, ParseError, ValidationError};
use crate::links::DanglingLinkWarning;
use crate::model::{DocId, DocumentKind, TextRange};
use crate::query::QueryResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedDocument {
    pub id: DocId,
    pub path: String,
    pub kind: DocumentKind,
}

/// Why a document was kept out of the corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    Parse { error: ParseError },
    Invalid { errors: Vec<ValidationError> },
    DuplicateId { id: DocId, existing_path: String },
    DuplicateIndex { category: String, existing_path: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub path: String,
    pub reason: RejectReason,
}

/// Content changed but `date-updated` did not move forward.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaleDateWarning {
    pub id: DocId,
    pub path: String,
    pub date_updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectiveOutcome {
    pub host: DocId,
    pub host_path: String,
    /// Position of the directive within its host document.
    pub ordinal: usize,
    pub range: Option<TextRange>,
    pub result: Option<QueryResult>,
    pub error: Option<DirectiveError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub accepted: usize,
    pub rejected: usize,
    pub links: usize,
    pub dangling_links: usize,
    pub stale_dates: usize,
    pub directives: usize,
    pub directive_errors: usize,
}

/// Full outcome of one batch run. Never a single pass/fail verdict: every
/// failure is listed against the document or directive that caused it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub accepted: Vec<AcceptedDocument>,
    pub rejected: Vec<Rejection>,
    pub link_count: usize,
    pub dangling_links: Vec<DanglingLinkWarning>,
    pub stale_dates: Vec<StaleDateWarning>,
    pub directives: Vec<DirectiveOutcome>,
}

impl BatchReport {
    pub fn directive_errors(&self) -> impl Iterator<Item = &DirectiveOutcome> {
        self.directives.iter().filter(|d| d.error.is_some())
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            accepted: self.accepted.len(),
            rejected: self.rejected.len(),
            links: self.link_count,
            dangling_links: self.dangling_links.len(),
            stale_dates: self.stale_dates.len(),
            directives: self.directives.len(),
            directive_errors: self.directive_errors().count(),
        }
    }

    /// No rejected documents and no failing directives.
    /// Dangling links and stale dates are warnings and do not count.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.directive_errors().next().is_none()
    }
}
