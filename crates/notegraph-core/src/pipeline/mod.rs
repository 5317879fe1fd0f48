//! Batch pipeline: parse → validate (in parallel) → barrier → index →
//! resolve links → evaluate directives.

use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::NotegraphConfig;
use crate::error::DirectiveError;
use crate::links::LinkGraph;
use crate::model::{DocId, Document};
use crate::parser::{parse_document, ParseOptions};
use crate::query::{QueryDirective, QueryEngine, QueryResult};
use crate::schema::Schema;
use crate::store::{Corpus, Snapshot};
use crate::utils::time;

mod report;

#[cfg(test)]
mod tests;

pub use report::{
    AcceptedDocument, BatchReport, DirectiveOutcome, RejectReason, Rejection, ReportSummary,
    StaleDateWarning,
};

/// Raw input: a logical path and the document text stored there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub path: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

pub struct Pipeline {
    options: ParseOptions,
    schema: Schema,
    corpus: Corpus,
    show_summary: bool,
}

impl Pipeline {
    pub fn new(config: &NotegraphConfig) -> Self {
        Self::with_corpus(config, Corpus::new())
    }

    /// Start from an existing corpus, e.g. one restored from a snapshot file.
    pub fn with_corpus(config: &NotegraphConfig, corpus: Corpus) -> Self {
        Self {
            options: ParseOptions::from_config(config),
            schema: Schema::from_config(&config.schema),
            corpus,
            show_summary: config.logging.show_summary,
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse and validate one document. Touches no shared state.
    fn prepare(&self, source: SourceDocument) -> Result<Document, Rejection> {
        let reject = |reason| Rejection {
            path: source.path.clone(),
            reason,
        };

        let doc = parse_document(&source.path, &source.text, &self.options)
            .map_err(|error| reject(RejectReason::Parse { error }))?;
        let doc = self
            .schema
            .validate(doc)
            .map_err(|errors| reject(RejectReason::Invalid { errors }))?;

        log::debug!(
            "accepted {} ({} links, {} directives)",
            doc.path,
            doc.links_out.len(),
            doc.directives.len()
        );
        Ok(doc)
    }

    fn stale_date(previous: &Document, current: &Document) -> Option<StaleDateWarning> {
        if previous.digest == current.digest {
            return None;
        }
        let advanced = match (previous.date_updated(), current.date_updated()) {
            (Some(before), Some(after)) => after > before,
            _ => true,
        };
        if advanced {
            return None;
        }
        Some(StaleDateWarning {
            id: current.id.clone(),
            path: current.path.clone(),
            date_updated: current.date_updated().map(time::format_date),
        })
    }

    /// Run the whole pipeline over the full document set.
    ///
    /// Documents that were in the corpus but are absent from `sources`, or
    /// are now rejected, are removed.
    pub fn run(&self, sources: Vec<SourceDocument>) -> BatchReport {
        let prepared: Vec<Result<Document, Rejection>> = sources
            .into_par_iter()
            .map(|source| self.prepare(source))
            .collect();

        // Everything below needs the complete batch.
        let mut report = BatchReport::default();
        let mut accepted = Vec::new();
        for outcome in prepared {
            match outcome {
                Ok(doc) => accepted.push(doc),
                Err(rejection) => report.rejected.push(rejection),
            }
        }
        accepted.sort_by(|a, b| a.path.cmp(&b.path));

        let mut ids: HashMap<DocId, String> = HashMap::new();
        let mut index_docs: HashMap<String, String> = HashMap::new();
        let mut unique = Vec::with_capacity(accepted.len());
        for doc in accepted {
            if let Some(existing) = ids.get(&doc.id) {
                report.rejected.push(Rejection {
                    path: doc.path.clone(),
                    reason: RejectReason::DuplicateId {
                        id: doc.id.clone(),
                        existing_path: existing.clone(),
                    },
                });
                continue;
            }
            if doc.is_index() {
                let category = doc.category_prefix().to_string();
                if let Some(existing) = index_docs.get(&category) {
                    report.rejected.push(Rejection {
                        path: doc.path.clone(),
                        reason: RejectReason::DuplicateIndex {
                            category,
                            existing_path: existing.clone(),
                        },
                    });
                    continue;
                }
                index_docs.insert(category, doc.path.clone());
            }
            ids.insert(doc.id.clone(), doc.path.clone());
            unique.push(doc);
        }

        let keep: BTreeSet<DocId> = unique.iter().map(|doc| doc.id.clone()).collect();
        for doc in unique {
            report.accepted.push(AcceptedDocument {
                id: doc.id.clone(),
                path: doc.path.clone(),
                kind: doc.kind,
            });
            let stale = self
                .corpus
                .get(&doc.id)
                .and_then(|previous| Self::stale_date(&previous, &doc));
            report.stale_dates.extend(stale);
            self.corpus.upsert(doc);
        }
        for dropped in self.corpus.retain(&keep) {
            log::debug!("dropped {} from corpus", dropped.path);
        }

        report.rejected.sort_by(|a, b| a.path.cmp(&b.path));
        for rejection in &report.rejected {
            log::warn!("rejected {}: {:?}", rejection.path, rejection.reason);
        }

        let snapshot = self.corpus.snapshot();
        let graph = LinkGraph::resolve(&snapshot);
        report.link_count = graph.links().len();
        report.dangling_links = graph.dangling().to_vec();
        report.directives = self.evaluate_directives(&snapshot);

        if self.show_summary {
            let summary = report.summary();
            log::info!(
                "{} accepted, {} rejected, {} links ({} dangling), {} directives ({} failed)",
                summary.accepted,
                summary.rejected,
                summary.links,
                summary.dangling_links,
                summary.directives,
                summary.directive_errors
            );
        }
        report
    }

    /// Add or replace a single document without touching the rest of the corpus.
    ///
    /// Run `links()` afterwards to see the effect on the link graph.
    pub fn apply(&self, source: SourceDocument) -> Result<AcceptedDocument, Rejection> {
        let doc = self.prepare(source)?;
        let snapshot = self.corpus.snapshot();

        if let Some(existing) = snapshot.get(&doc.id) {
            if existing.path != doc.path {
                return Err(Rejection {
                    path: doc.path.clone(),
                    reason: RejectReason::DuplicateId {
                        id: doc.id.clone(),
                        existing_path: existing.path.clone(),
                    },
                });
            }
        }
        if doc.is_index() {
            let rival = snapshot.iter().find(|other| {
                other.is_index()
                    && other.id != doc.id
                    && other.category_prefix() == doc.category_prefix()
            });
            if let Some(rival) = rival {
                return Err(Rejection {
                    path: doc.path.clone(),
                    reason: RejectReason::DuplicateIndex {
                        category: doc.category_prefix().to_string(),
                        existing_path: rival.path.clone(),
                    },
                });
            }
        }

        let accepted = AcceptedDocument {
            id: doc.id.clone(),
            path: doc.path.clone(),
            kind: doc.kind,
        };
        self.corpus.upsert(doc);
        Ok(accepted)
    }

    pub fn remove(&self, path: &str) -> Option<DocId> {
        self.corpus.remove_path(path).map(|doc| doc.id.clone())
    }

    /// Fresh link graph for the current corpus.
    pub fn links(&self) -> LinkGraph {
        LinkGraph::resolve(&self.corpus.snapshot())
    }

    /// Evaluate an ad-hoc directive against the current corpus.
    pub fn query(&self, directive: &QueryDirective) -> Result<QueryResult, DirectiveError> {
        let snapshot = self.corpus.snapshot();
        QueryEngine::new(&snapshot, &self.schema).evaluate(directive)
    }

    /// Evaluate every directive embedded in the snapshot's documents.
    pub fn evaluate_directives(&self, snapshot: &Snapshot) -> Vec<DirectiveOutcome> {
        let engine = QueryEngine::new(snapshot, &self.schema);
        let mut outcomes = Vec::new();

        for host in snapshot.iter() {
            for (ordinal, directive) in host.directives.iter().enumerate() {
                let (result, error) = match engine.evaluate_in(directive, host) {
                    Ok(result) => (Some(result), None),
                    Err(error) => {
                        log::warn!("{}: directive #{}: {}", host.path, ordinal + 1, error);
                        (None, Some(error))
                    }
                };
                outcomes.push(DirectiveOutcome {
                    host: host.id.clone(),
                    host_path: host.path.clone(),
                    ordinal,
                    range: directive.range,
                    result,
                    error,
                });
            }
        }

        outcomes
    }
}
