//! Plain-text output.

use std::io::{self, Write};

use serde_json::Value;

use notegraph_core::pipeline::{DirectiveOutcome, RejectReason};
use notegraph_core::{BatchReport, Link, QueryResult};

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| cell(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

pub fn write_report(out: &mut dyn Write, report: &BatchReport) -> io::Result<()> {
    for rejection in &report.rejected {
        match &rejection.reason {
            RejectReason::Parse { error } => {
                writeln!(out, "{}: rejected: {}", rejection.path, error)?;
            }
            RejectReason::Invalid { errors } => {
                for error in errors {
                    writeln!(out, "{}: rejected: {}", rejection.path, error)?;
                }
            }
            RejectReason::DuplicateId { id, existing_path } => {
                writeln!(
                    out,
                    "{}: rejected: identifier `{}` already used by {}",
                    rejection.path, id, existing_path
                )?;
            }
            RejectReason::DuplicateIndex {
                category,
                existing_path,
            } => {
                writeln!(
                    out,
                    "{}: rejected: category `{}` already has index {}",
                    rejection.path, category, existing_path
                )?;
            }
        }
    }

    for warning in &report.dangling_links {
        writeln!(out, "{warning}")?;
    }
    for stale in &report.stale_dates {
        writeln!(
            out,
            "{}: content changed but date-updated is still {}",
            stale.path,
            stale.date_updated.as_deref().unwrap_or("unset")
        )?;
    }
    for outcome in report.directive_errors() {
        if let Some(error) = &outcome.error {
            writeln!(
                out,
                "{}: directive #{}: {}",
                outcome.host_path,
                outcome.ordinal + 1,
                error
            )?;
        }
    }

    let summary = report.summary();
    writeln!(
        out,
        "{} accepted, {} rejected, {} links ({} dangling), {} stale dates, {} directives ({} failed)",
        summary.accepted,
        summary.rejected,
        summary.links,
        summary.dangling_links,
        summary.stale_dates,
        summary.directives,
        summary.directive_errors
    )
}

pub fn write_result(out: &mut dyn Write, result: &QueryResult) -> io::Result<()> {
    let header: Vec<&str> = std::iter::once("id")
        .chain(result.columns.iter().map(String::as_str))
        .collect();
    writeln!(out, "{}", header.join(" | "))?;
    for row in &result.rows {
        let cells: Vec<String> = std::iter::once(row.id.to_string())
            .chain(result.columns.iter().map(|c| cell(row.fields.get(c))))
            .collect();
        writeln!(out, "{}", cells.join(" | "))?;
    }
    Ok(())
}

/// Which end of a link to print.
#[derive(Debug, Clone, Copy)]
pub enum LinkSide {
    Source,
    Target,
}

pub fn write_links(out: &mut dyn Write, links: &[&Link], side: LinkSide) -> io::Result<()> {
    for link in links {
        let position = format!(
            "{}:{}:{}",
            link.source_path,
            link.range.start.line + 1,
            link.range.start.col + 1
        );
        match side {
            LinkSide::Source => writeln!(out, "{} {}", position, link.source)?,
            LinkSide::Target => match &link.target_path {
                Some(path) => writeln!(out, "{} -> {}", position, path)?,
                None => writeln!(out, "{} -> {} (missing)", position, link.target_name)?,
            },
        }
    }
    Ok(())
}

pub fn write_outcomes(out: &mut dyn Write, outcomes: &[&DirectiveOutcome]) -> io::Result<()> {
    for outcome in outcomes {
        writeln!(out, "## {} #{}", outcome.host_path, outcome.ordinal + 1)?;
        match (&outcome.result, &outcome.error) {
            (Some(result), _) => write_result(out, result)?,
            (None, Some(error)) => writeln!(out, "error: {error}")?,
            (None, None) => {}
        }
        writeln!(out)?;
    }
    Ok(())
}
