//! Command-line front end for notegraph.
//!
//! Every subcommand rebuilds the corpus from disk, runs the batch pipeline
//! and reports on the result.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use notegraph_core::cache::CorpusState;
use notegraph_core::vfs::{load_sources, FileSystem, PhysicalFileSystem};
use notegraph_core::{BatchReport, DocId, NotegraphConfig, Pipeline, QueryDirective};

mod render;


#[derive(Parser, Debug)]
#[command(
    name = "notegraph",
    about = "Validate, index and query a wiki-linked Markdown knowledge base",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Corpus root directory.
    #[arg(long, short = 'r', value_name = "DIR", default_value = ".", global = true)]
    pub root: PathBuf,

    /// Config file to use instead of `<root>/notegraph.yml`.
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Emit JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Log per-document progress.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full pipeline and print the batch report.
    Check,
    /// Evaluate an ad-hoc directive, e.g. `LIST FROM "lang" SORT title`.
    Query { directive: String },
    /// Documents linking to a document.
    Backlinks { id: String },
    /// Outgoing links of a document, resolved or dangling.
    Links { id: String },
    /// Evaluate every directive embedded in index documents.
    Render,
    /// Write the accepted corpus and its links as JSON.
    Snapshot {
        /// Defaults to the configured snapshot path under the root.
        out: Option<PathBuf>,
    },
}

/// Process exit status of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Clean,
    /// The command ran but found rejected documents or failing directives.
    Problems,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Status::Clean => 0,
            Status::Problems => 1,
        }
    }

    fn from_clean(clean: bool) -> Self {
        if clean {
            Status::Clean
        } else {
            Status::Problems
        }
    }
}

fn load_config(cli: &Cli, fs: &dyn FileSystem) -> Result<NotegraphConfig> {
    match &cli.config {
        Some(path) => {
            let content = fs
                .read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            NotegraphConfig::from_yaml(&content)
                .with_context(|| format!("parsing config {}", path.display()))
        }
        None => NotegraphConfig::load(&cli.root, fs).context("loading notegraph.yml"),
    }
}

fn build(cli: &Cli, fs: &dyn FileSystem) -> Result<(NotegraphConfig, Pipeline, BatchReport)> {
    let config = load_config(cli, fs)?;
    log::debug!("corpus `{}` at {}", config.corpus.name, cli.root.display());
    let sources = load_sources(fs, &cli.root, &config.corpus)
        .with_context(|| format!("scanning {}", cli.root.display()))?;
    let pipeline = Pipeline::new(&config);
    let report = pipeline.run(sources);
    Ok((config, pipeline, report))
}

fn emit_json(out: &mut dyn Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn require_document(pipeline: &Pipeline, id: &str) -> Result<DocId> {
    let id = DocId::new(id);
    if !pipeline.corpus().snapshot().contains(&id) {
        bail!("no accepted document named `{id}`");
    }
    Ok(id)
}

fn snapshot_target(root: &Path, config: &NotegraphConfig, out: Option<&PathBuf>) -> PathBuf {
    match out {
        Some(path) => path.clone(),
        None => root.join(&config.corpus.snapshot_path),
    }
}

pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<Status> {
    run_with(cli, &PhysicalFileSystem, out)
}

pub fn run_with(cli: &Cli, fs: &dyn FileSystem, out: &mut dyn Write) -> Result<Status> {
    let (config, pipeline, report) = build(cli, fs)?;

    match &cli.command {
        Command::Check => {
            if cli.json {
                emit_json(out, &report)?;
            } else {
                render::write_report(out, &report)?;
            }
            Ok(Status::from_clean(report.is_clean()))
        }
        Command::Query { directive } => {
            let directive = QueryDirective::parse(directive);
            match pipeline.query(&directive) {
                Ok(result) if cli.json => emit_json(out, &result)?,
                Ok(result) => render::write_result(out, &result)?,
                Err(error) if cli.json => {
                    emit_json(out, &error)?;
                    return Ok(Status::Problems);
                }
                Err(error) => {
                    writeln!(out, "error: {error}")?;
                    return Ok(Status::Problems);
                }
            }
            Ok(Status::Clean)
        }
        Command::Backlinks { id } => {
            let id = require_document(&pipeline, id)?;
            let graph = pipeline.links();
            let links = graph.backlinks(&id);
            if cli.json {
                emit_json(out, &links)?;
            } else {
                render::write_links(out, &links, render::LinkSide::Source)?;
            }
            Ok(Status::Clean)
        }
        Command::Links { id } => {
            let id = require_document(&pipeline, id)?;
            let graph = pipeline.links();
            let links = graph.outgoing(&id);
            if cli.json {
                emit_json(out, &links)?;
            } else {
                render::write_links(out, &links, render::LinkSide::Target)?;
            }
            Ok(Status::Clean)
        }
        Command::Render => {
            let snapshot = pipeline.corpus().snapshot();
            let outcomes: Vec<_> = report
                .directives
                .iter()
                .filter(|outcome| snapshot.get(&outcome.host).is_some_and(|d| d.is_index()))
                .collect();
            if cli.json {
                emit_json(out, &outcomes)?;
            } else {
                render::write_outcomes(out, &outcomes)?;
            }
            Ok(Status::from_clean(outcomes.iter().all(|o| o.error.is_none())))
        }
        Command::Snapshot { out: target } => {
            let target = snapshot_target(&cli.root, &config, target.as_ref());
            let state = CorpusState::capture(&pipeline.corpus().snapshot());
            state
                .save(&target, fs)
                .with_context(|| format!("writing snapshot {}", target.display()))?;
            writeln!(
                out,
                "wrote {} documents and {} links to {}",
                state.documents.len(),
                state.links.len(),
                target.display()
            )?;
            Ok(Status::Clean)
        }
    }
}
