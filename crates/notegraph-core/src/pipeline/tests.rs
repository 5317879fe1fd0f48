use std::fs;

use tempfile::TempDir;

use super::*;
use crate::error::{ParseError, ValidationErrorKind};
use crate::model::DocumentKind;
use crate::vfs::{load_sources, PhysicalFileSystem};

fn frontmatter(category: &str, title: &str, extra: &str) -> String {
    format!(
        "---\ntitle: {title}\ncategory: {category}\ntags: [{category}]\ndate-created: 2023-01-10\ndate-updated: 2023-02-01\n{extra}---\n"
    )
}

fn source(path: &str, text: impl Into<String>) -> SourceDocument {
    SourceDocument::new(path, text)
}

fn pipeline() -> Pipeline {
    Pipeline::new(&NotegraphConfig::default())
}

fn index_source(category: &str, name: &str, directive: &str) -> SourceDocument {
    let text = format!(
        "---\ntitle: {name}\ncategory: {category}\ntags: [index]\ndate-created: 2023-01-01\ndate-updated: 2023-01-01\n---\n# {name}\n\n```query\n{directive}\n```\n"
    );
    source(&format!("{category}/{name}"), text)
}

#[test]
fn test_index_directive_lists_matching_topics() {
    let pipeline = pipeline();
    let report = pipeline.run(vec![
        index_source("lang", "Lang Index", "LIST FROM \"lang\" WHERE status = evergreen"),
        source(
            "lang/Ownership",
            frontmatter("lang", "Ownership", "status: evergreen\n") + "Body",
        ),
        source(
            "lang/Lifetimes",
            frontmatter("lang", "Lifetimes", "status: seedling\n") + "Body",
        ),
    ]);

    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.accepted.len(), 3);
    let index = report
        .accepted
        .iter()
        .find(|a| a.id == DocId::new("Lang Index"))
        .unwrap();
    assert_eq!(index.kind, DocumentKind::Index);

    assert_eq!(report.directives.len(), 1);
    let outcome = &report.directives[0];
    assert_eq!(outcome.host, DocId::new("Lang Index"));
    assert_eq!(outcome.ordinal, 0);
    assert!(outcome.range.is_some());
    assert_eq!(outcome.result.as_ref().unwrap().ids(), vec!["Ownership"]);
}

#[test]
fn test_dangling_link_warns_once_and_corpus_stays_queryable() {
    let pipeline = pipeline();
    let report = pipeline.run(vec![
        source("a/A", frontmatter("a", "A", "") + "See [[Missing]] and [[B]]."),
        source("a/B", frontmatter("a", "B", "") + "Back to [[A]]."),
    ]);

    assert!(report.is_clean());
    assert_eq!(report.link_count, 2);
    assert_eq!(report.dangling_links.len(), 1);
    let warning = &report.dangling_links[0];
    assert_eq!(warning.source, DocId::new("A"));
    assert_eq!(warning.target_name, "Missing");

    let result = pipeline.query(&QueryDirective::parse("LIST FROM a")).unwrap();
    assert_eq!(result.ids(), vec!["A", "B"]);
    assert_eq!(
        pipeline.links().backlink_sources(&DocId::new("A")),
        vec![DocId::new("B")]
    );
}

#[test]
fn test_invalid_document_is_rejected_and_not_indexed() {
    let pipeline = pipeline();
    let untitled = "---\ncategory: a\ntags: []\ndate-created: 2023-01-10\ndate-updated: 2023-02-01\n---\nBody";
    let report = pipeline.run(vec![
        source("a/Untitled", untitled),
        source("a/Fine", frontmatter("a", "Fine", "")),
    ]);

    assert!(!report.is_clean());
    assert_eq!(report.rejected.len(), 1);
    let rejection = &report.rejected[0];
    assert_eq!(rejection.path, "a/Untitled");
    match &rejection.reason {
        RejectReason::Invalid { errors } => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].kind, ValidationErrorKind::MissingField);
            assert_eq!(errors[0].field, "title");
        }
        other => panic!("unexpected reason {other:?}"),
    }

    let ids: Vec<String> = pipeline
        .corpus()
        .by_category("a")
        .iter()
        .map(|d| d.id.to_string())
        .collect();
    assert_eq!(ids, vec!["Fine"]);
}

#[test]
fn test_dates_out_of_order_are_rejected() {
    let text = frontmatter("a", "Backwards", "").replace("2023-02-01", "2022-12-31");
    let report = pipeline().run(vec![source("a/Backwards", text)]);

    match &report.rejected[0].reason {
        RejectReason::Invalid { errors } => {
            assert_eq!(errors[0].kind, ValidationErrorKind::InvalidDate);
            assert_eq!(errors[0].field, "date-updated");
        }
        other => panic!("unexpected reason {other:?}"),
    }
    assert!(report.accepted.is_empty());
}

#[test]
fn test_parse_error_does_not_affect_other_documents() {
    let pipeline = pipeline();
    let report = pipeline.run(vec![
        source("a/Broken", "---\ntitle: never closed\n"),
        source("a/Fine", frontmatter("a", "Fine", "")),
    ]);

    assert_eq!(
        report.rejected,
        vec![Rejection {
            path: "a/Broken".into(),
            reason: RejectReason::Parse {
                error: ParseError::UnterminatedFrontmatter
            },
        }]
    );
    assert_eq!(pipeline.corpus().len(), 1);
}

#[test]
fn test_accepted_document_round_trips_through_markdown() {
    let pipeline = pipeline();
    let text = frontmatter("a", "Round", "status: budding\nsources: [book]\n")
        + "# Round\n\n[[Other|alias]] text\n";
    pipeline.run(vec![source("a/Round", text)]);

    let original = pipeline.corpus().get(&DocId::new("Round")).unwrap();
    let rewritten = original.to_markdown().unwrap();
    let reparsed = pipeline.apply(source("a/Round", rewritten)).unwrap();
    assert_eq!(reparsed.kind, DocumentKind::Topic);

    let again = pipeline.corpus().get(&DocId::new("Round")).unwrap();
    assert_eq!(again.metadata, original.metadata);
    assert_eq!(again.body, original.body);
    // ranges shift with the re-serialized frontmatter; targets do not
    let targets = |doc: &Document| -> Vec<(String, Option<String>)> {
        doc.links_out
            .iter()
            .map(|l| (l.target.clone(), l.alias.clone()))
            .collect()
    };
    assert_eq!(targets(&again), targets(&original));
}

#[test]
fn test_limit_caps_result_size() {
    let pipeline = pipeline();
    let sources = (0..5)
        .map(|i| source(&format!("n/Note{i}"), frontmatter("n", &format!("Note {i}"), "")))
        .collect();
    pipeline.run(sources);

    for (limit, expected) in [(0, 0), (3, 3), (5, 5), (9, 5)] {
        let directive = QueryDirective::parse(&format!("LIST FROM n LIMIT {limit}"));
        assert_eq!(pipeline.query(&directive).unwrap().len(), expected);
    }
}

#[test]
fn test_duplicate_identifier_keeps_first_path() {
    let report = pipeline().run(vec![
        source("b/Note", frontmatter("b", "Second", "")),
        source("a/Note", frontmatter("a", "First", "")),
    ]);

    assert_eq!(report.accepted.len(), 1);
    assert_eq!(report.accepted[0].path, "a/Note");
    assert_eq!(
        report.rejected[0].reason,
        RejectReason::DuplicateId {
            id: DocId::new("Note"),
            existing_path: "a/Note".into()
        }
    );
}

#[test]
fn test_second_index_in_category_is_rejected() {
    let pipeline = pipeline();
    let report = pipeline.run(vec![
        index_source("lang", "A Index", "LIST FROM lang"),
        index_source("lang", "B Index", "LIST FROM lang"),
        index_source("lang/rust", "Rust Index", "LIST FROM \"lang/rust\""),
    ]);

    assert_eq!(report.accepted.len(), 2);
    assert_eq!(
        report.rejected[0].reason,
        RejectReason::DuplicateIndex {
            category: "lang".into(),
            existing_path: "lang/A Index".into()
        }
    );

    let rejection = pipeline
        .apply(index_source("lang", "C Index", "LIST FROM lang"))
        .unwrap_err();
    assert!(matches!(rejection.reason, RejectReason::DuplicateIndex { .. }));
}

#[test]
fn test_narrow_index_scope_is_reported_per_directive() {
    let pipeline = pipeline();
    let text = "---\ntitle: Lang\ncategory: lang\ntags: [index]\ndate-created: 2023-01-01\ndate-updated: 2023-01-01\n---\n```query\nLIST FROM \"lang/rust\"\n```\n\n```query\nLIST WHERE a = 1 OR b = 2\n```\n\n```query\nTABLE title FROM lang\n```\n";
    let report = pipeline.run(vec![
        source("lang/Lang", text),
        source("lang/rust/Traits", frontmatter("lang/rust", "Traits", "")),
    ]);

    assert!(report.rejected.is_empty());
    assert!(!report.is_clean());
    assert_eq!(report.summary().directive_errors, 2);

    let outcomes = &report.directives;
    assert!(matches!(
        outcomes[0].error,
        Some(DirectiveError::ScopeTooNarrow { .. })
    ));
    assert!(matches!(outcomes[1].error, Some(DirectiveError::Malformed(_))));
    let table = outcomes[2].result.as_ref().unwrap();
    assert_eq!(table.columns, vec!["title"]);
    assert_eq!(table.ids(), vec!["Lang", "Traits"]);
}

#[test]
fn test_rerun_flags_content_change_without_new_date() {
    let pipeline = pipeline();
    pipeline.run(vec![source("a/Note", frontmatter("a", "Note", "") + "v1")]);

    let report = pipeline.run(vec![source("a/Note", frontmatter("a", "Note", "") + "v2")]);
    assert_eq!(report.stale_dates.len(), 1);
    assert_eq!(report.stale_dates[0].date_updated.as_deref(), Some("2023-02-01"));

    let bumped = frontmatter("a", "Note", "").replace("2023-02-01", "2023-03-01") + "v3";
    let report = pipeline.run(vec![source("a/Note", bumped)]);
    assert!(report.stale_dates.is_empty());

    // unchanged content is never stale
    let same = frontmatter("a", "Note", "").replace("2023-02-01", "2023-03-01") + "v3";
    assert!(pipeline.run(vec![source("a/Note", same)]).stale_dates.is_empty());
}

#[test]
fn test_rerun_drops_missing_and_newly_rejected_documents() {
    let pipeline = pipeline();
    pipeline.run(vec![
        source("a/Keep", frontmatter("a", "Keep", "")),
        source("a/Gone", frontmatter("a", "Gone", "")),
        source("a/Breaks", frontmatter("a", "Breaks", "")),
    ]);
    assert_eq!(pipeline.corpus().len(), 3);

    let report = pipeline.run(vec![
        source("a/Keep", frontmatter("a", "Keep", "")),
        source("a/Breaks", "---\ntitle: [unclosed\n---\n"),
    ]);

    assert_eq!(report.rejected.len(), 1);
    let ids: Vec<DocId> = pipeline.corpus().all().iter().map(|d| d.id.clone()).collect();
    assert_eq!(ids, vec![DocId::new("Keep")]);
}

#[test]
fn test_apply_and_remove_single_documents() {
    let pipeline = pipeline();
    pipeline.run(vec![source("a/A", frontmatter("a", "A", "") + "[[B]]")]);
    assert_eq!(pipeline.links().dangling().len(), 1);

    let accepted = pipeline.apply(source("a/B", frontmatter("a", "B", ""))).unwrap();
    assert_eq!(accepted.id, DocId::new("B"));
    assert!(pipeline.links().dangling().is_empty());

    let clash = pipeline
        .apply(source("b/B", frontmatter("b", "B", "")))
        .unwrap_err();
    assert!(matches!(clash.reason, RejectReason::DuplicateId { .. }));

    assert_eq!(pipeline.remove("a/B"), Some(DocId::new("B")));
    assert_eq!(pipeline.remove("a/B"), None);
    assert_eq!(pipeline.links().dangling().len(), 1);
}

#[test]
fn test_set_body_refreshes_date_and_links() {
    let pipeline = pipeline();
    pipeline.run(vec![source("a/Note", frontmatter("a", "Note", "") + "[[Old]]")]);

    let mut doc = (*pipeline.corpus().get(&DocId::new("Note")).unwrap()).clone();
    let today = chrono::NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
    doc.set_body("[[New]] and [[Newer]]", today, pipeline.options())
        .unwrap();

    assert_eq!(doc.date_updated(), Some(today));
    let targets: Vec<&str> = doc.links_out.iter().map(|l| l.target.as_str()).collect();
    assert_eq!(targets, vec!["New", "Newer"]);

    let accepted = pipeline
        .apply(source("a/Note", doc.to_markdown().unwrap()))
        .unwrap();
    assert_eq!(accepted.path, "a/Note");
    assert_eq!(pipeline.links().dangling().len(), 2);
}

#[test]
fn test_run_over_directory_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("lang/rust")).unwrap();
    fs::write(
        root.join("lang/Lang Index.md"),
        index_source("lang", "Lang Index", "TABLE title FROM lang SORT title DESC").text,
    )
    .unwrap();
    fs::write(
        root.join("lang/rust/Traits.md"),
        frontmatter("lang/rust", "Traits", "") + "Uses [[Generics]].",
    )
    .unwrap();
    fs::write(
        root.join("lang/rust/Generics.md"),
        frontmatter("lang/rust", "Generics", ""),
    )
    .unwrap();

    let config = NotegraphConfig::default();
    let sources = load_sources(&PhysicalFileSystem, root, &config.corpus).unwrap();
    let report = Pipeline::new(&config).run(sources);

    assert!(report.is_clean(), "{report:?}");
    assert!(report.dangling_links.is_empty());
    assert_eq!(report.link_count, 1);
    let result = report.directives[0].result.as_ref().unwrap();
    assert_eq!(result.ids(), vec!["Traits", "Lang Index", "Generics"]);
}
