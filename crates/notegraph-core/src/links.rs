//! Link resolution over a whole corpus snapshot.
//!
//! The graph is recomputed from scratch on every pass; backlinks are the
//! inverse of the forward edges and are never stored separately.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{DocId, LinkKind, TextRange};
use crate::store::Snapshot;

/// A resolved (or dangling) edge of the link multigraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: DocId,
    pub source_path: String,
    pub target_name: String,
    pub resolved: bool,
    /// Present only when `resolved`.
    pub target: Option<DocId>,
    pub target_path: Option<String>,
    pub alias: Option<String>,
    pub anchor: Option<String>,
    pub kind: LinkKind,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DanglingLinkWarning {
    pub source: DocId,
    pub source_path: String,
    pub target_name: String,
    pub range: TextRange,
}

impl fmt::Display for DanglingLinkWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: link to missing document `{}`",
            self.source_path,
            self.range.start.line + 1,
            self.range.start.col + 1,
            self.target_name
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    links: Vec<Link>,
    outgoing: HashMap<DocId, Vec<usize>>,
    incoming: HashMap<DocId, Vec<usize>>,
    dangling: Vec<DanglingLinkWarning>,
}

impl LinkGraph {
    /// Resolve every link of every document in the snapshot.
    ///
    /// A target matches a document whose identifier or logical path is
    /// exactly `target_name` (case-sensitive). An empty target (`[[#heading]]`)
    /// refers to the source document itself.
    pub fn resolve(snapshot: &Snapshot) -> Self {
        let mut graph = LinkGraph::default();

        for doc in snapshot.iter() {
            for link_ref in &doc.links_out {
                let target = if link_ref.target.is_empty() {
                    Some(doc.clone())
                } else {
                    snapshot
                        .get(&DocId::new(link_ref.target.as_str()))
                        .or_else(|| snapshot.get_by_path(&link_ref.target))
                };

                let index = graph.links.len();
                graph.outgoing.entry(doc.id.clone()).or_default().push(index);

                match &target {
                    Some(target) => {
                        graph.incoming.entry(target.id.clone()).or_default().push(index);
                    }
                    None => {
                        log::warn!(
                            "{}: dangling link to `{}`",
                            doc.path,
                            link_ref.target
                        );
                        graph.dangling.push(DanglingLinkWarning {
                            source: doc.id.clone(),
                            source_path: doc.path.clone(),
                            target_name: link_ref.target.clone(),
                            range: link_ref.range,
                        });
                    }
                }

                graph.links.push(Link {
                    source: doc.id.clone(),
                    source_path: doc.path.clone(),
                    target_name: link_ref.target.clone(),
                    resolved: target.is_some(),
                    target: target.as_ref().map(|t| t.id.clone()),
                    target_path: target.as_ref().map(|t| t.path.clone()),
                    alias: link_ref.alias.clone(),
                    anchor: link_ref.anchor.clone(),
                    kind: link_ref.kind,
                    range: link_ref.range,
                });
            }
        }

        log::debug!(
            "resolved {} links ({} dangling)",
            graph.links.len(),
            graph.dangling.len()
        );
        graph
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn dangling(&self) -> &[DanglingLinkWarning] {
        &self.dangling
    }

    pub fn outgoing(&self, id: &DocId) -> Vec<&Link> {
        self.edges(&self.outgoing, id)
    }

    /// Links pointing at `id`, one per occurrence.
    pub fn backlinks(&self, id: &DocId) -> Vec<&Link> {
        self.edges(&self.incoming, id)
    }

    /// Distinct documents linking to `id`, ordered by identifier.
    pub fn backlink_sources(&self, id: &DocId) -> Vec<DocId> {
        let mut sources: Vec<DocId> = self
            .backlinks(id)
            .into_iter()
            .map(|link| link.source.clone())
            .collect();
        sources.sort();
        sources.dedup();
        sources
    }

    fn edges(&self, table: &HashMap<DocId, Vec<usize>>, id: &DocId) -> Vec<&Link> {
        table
            .get(id)
            .map(|indices| indices.iter().map(|&i| &self.links[i]).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_document, ParseOptions};
    use crate::store::Corpus;

    fn corpus(docs: &[(&str, &str)]) -> Corpus {
        let corpus = Corpus::new();
        for (path, text) in docs {
            corpus.upsert(parse_document(path, text, &ParseOptions::default()).unwrap());
        }
        corpus
    }

    #[test]
    fn test_resolves_by_identifier_and_path() {
        let corpus = corpus(&[
            ("a/Source", "[[Target]] and [[b/Target]] and [[Target|alias]]"),
            ("b/Target", "no links"),
        ]);
        let graph = LinkGraph::resolve(&corpus.snapshot());

        let outgoing = graph.outgoing(&DocId::new("Source"));
        assert_eq!(outgoing.len(), 3);
        assert!(outgoing.iter().all(|l| l.resolved));
        assert!(outgoing
            .iter()
            .all(|l| l.target_path.as_deref() == Some("b/Target")));
        assert_eq!(outgoing[2].alias.as_deref(), Some("alias"));
        assert!(graph.dangling().is_empty());
    }

    #[test]
    fn test_matching_is_exact_and_case_sensitive() {
        let corpus = corpus(&[("Source", "[[target]] [[Targ]]"), ("Target", "")]);
        let graph = LinkGraph::resolve(&corpus.snapshot());

        assert!(graph.links().iter().all(|l| !l.resolved));
        assert!(graph.links().iter().all(|l| l.target_path.is_none()));
        assert_eq!(graph.dangling().len(), 2);
    }

    #[test]
    fn test_one_warning_per_dangling_link() {
        let corpus = corpus(&[("A", "see [[Missing]]"), ("B", "[[A]]")]);
        let graph = LinkGraph::resolve(&corpus.snapshot());

        assert_eq!(graph.dangling().len(), 1);
        let warning = &graph.dangling()[0];
        assert_eq!(warning.source, DocId::new("A"));
        assert_eq!(warning.target_name, "Missing");
        assert_eq!(warning.to_string(), "A:1:5: link to missing document `Missing`");
    }

    #[test]
    fn test_backlinks_are_inverse_of_outgoing() {
        let corpus = corpus(&[
            ("A", "[[C]] [[C]]"),
            ("B", "[[C]]"),
            ("C", "[[A]]"),
        ]);
        let graph = LinkGraph::resolve(&corpus.snapshot());
        let c = DocId::new("C");

        // multigraph: both links from A are kept
        assert_eq!(graph.backlinks(&c).len(), 3);
        assert_eq!(
            graph.backlink_sources(&c),
            vec![DocId::new("A"), DocId::new("B")]
        );
        assert_eq!(graph.backlink_sources(&DocId::new("A")), vec![c]);
        assert!(graph.backlinks(&DocId::new("B")).is_empty());
    }

    #[test]
    fn test_self_anchor_link_resolves_to_source() {
        let corpus = corpus(&[("Doc", "jump to [[#Usage]]")]);
        let graph = LinkGraph::resolve(&corpus.snapshot());

        let link = &graph.links()[0];
        assert!(link.resolved);
        assert_eq!(link.target, Some(DocId::new("Doc")));
        assert_eq!(link.anchor.as_deref(), Some("Usage"));
    }

    #[test]
    fn test_links_follow_corpus_changes() {
        let corpus = corpus(&[("A", "[[B]]")]);
        assert_eq!(LinkGraph::resolve(&corpus.snapshot()).dangling().len(), 1);

        corpus.upsert(parse_document("B", "", &ParseOptions::default()).unwrap());
        let graph = LinkGraph::resolve(&corpus.snapshot());
        assert!(graph.dangling().is_empty());
        assert_eq!(graph.backlink_sources(&DocId::new("B")), vec![DocId::new("A")]);
    }
}
