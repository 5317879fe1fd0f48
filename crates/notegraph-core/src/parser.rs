use crate::error::ParseError;
use crate::line_map::LineMap;
use crate::model::{Document, DocumentKind, LinkKind, LinkRef, Metadata};
use crate::query::QueryDirective;
use crate::utils::{compute_digest, doc_id_of};
use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

/// WikiLink format used by different note-taking conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WikiLinkFormat {
    /// Obsidian: [[target#anchor|alias]]
    #[default]
    TargetFirst,
    /// Dendron: [[alias|target#anchor]]
    AliasFirst,
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub wikilink_format: WikiLinkFormat,
    /// Fence info strings that mark a code block as a query directive.
    pub fence_tags: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            wikilink_format: WikiLinkFormat::TargetFirst,
            fence_tags: vec!["query".to_string(), "dataview".to_string()],
        }
    }
}

impl ParseOptions {
    pub fn from_config(config: &crate::NotegraphConfig) -> Self {
        Self {
            wikilink_format: config.links.format,
            fence_tags: config.query.fence_tags.clone(),
        }
    }

    fn is_directive_fence(&self, info: &str) -> bool {
        let tag = info.split_whitespace().next().unwrap_or_default();
        self.fence_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Split a leading `---` delimited block from the body.
///
/// Returns the raw YAML (if any) and the byte offset where the body starts.
fn split_frontmatter(text: &str) -> Result<(Option<&str>, usize), ParseError> {
    let start = if text.starts_with('\u{feff}') { 3 } else { 0 };
    let rest = &text[start..];

    let (first_line, first_len) = match rest.find('\n') {
        Some(i) => (&rest[..i], i + 1),
        None => (rest, rest.len()),
    };
    if first_line.trim_end_matches('\r') != "---" {
        return Ok((None, 0));
    }

    let yaml_start = start + first_len;
    let mut offset = yaml_start;
    for line in text[yaml_start..].split_inclusive('\n') {
        let trimmed = line.trim_end_matches(&['\n', '\r'][..]);
        if trimmed == "---" || trimmed == "..." {
            return Ok((Some(&text[yaml_start..offset]), offset + line.len()));
        }
        offset += line.len();
    }

    Err(ParseError::UnterminatedFrontmatter)
}

fn parse_metadata(yaml: &str) -> Result<Metadata, ParseError> {
    let value: serde_json::Value = serde_yaml::from_str(yaml)
        .map_err(|e| ParseError::InvalidFrontmatter(e.to_string()))?;

    match value {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(Metadata::new()),
        serde_json::Value::Array(_) => Err(ParseError::FrontmatterNotMapping("a list".into())),
        other => Err(ParseError::FrontmatterNotMapping(format!("scalar `{other}`"))),
    }
}

struct PendingLink {
    left: String,
    start: usize,
    embedded: bool,
    text: String,
}

struct PendingDirective {
    start: usize,
    source: String,
}

struct BodyScan {
    links: Vec<LinkRef>,
    directives: Vec<QueryDirective>,
}

/// Extract wiki links and directive blocks from the body starting at `body_offset`.
/// Code blocks that are not directives, and inline code, are skipped wholesale.
fn scan_body(text: &str, body_offset: usize, options: &ParseOptions) -> BodyScan {
    let mut md_options = Options::empty();
    md_options.insert(Options::ENABLE_TABLES);
    md_options.insert(Options::ENABLE_FOOTNOTES);
    md_options.insert(Options::ENABLE_STRIKETHROUGH);
    md_options.insert(Options::ENABLE_TASKLISTS);
    md_options.insert(Options::ENABLE_WIKILINKS);

    let body = &text[body_offset..];
    let line_map = LineMap::new(text);
    let parser = Parser::new_ext(body, md_options);

    let mut links = Vec::new();
    let mut directives = Vec::new();
    let mut pending_link: Option<PendingLink> = None;
    let mut pending_directive: Option<PendingDirective> = None;

    for (event, range) in parser.into_offset_iter() {
        let start = body_offset + range.start;
        let end = body_offset + range.end;

        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info)))
                if options.is_directive_fence(&info) =>
            {
                pending_directive = Some(PendingDirective {
                    start,
                    source: String::new(),
                });
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(directive) = pending_directive.take() {
                    let range = line_map.range(directive.start, end);
                    directives.push(QueryDirective::parse(&directive.source).at(range));
                }
            }

            Event::Start(Tag::Link {
                link_type: LinkType::WikiLink { .. },
                dest_url,
                ..
            }) => {
                pending_link = Some(PendingLink {
                    left: dest_url.to_string(),
                    start,
                    embedded: false,
                    text: String::new(),
                });
            }
            Event::Start(Tag::Image {
                link_type: LinkType::WikiLink { .. },
                dest_url,
                ..
            }) => {
                pending_link = Some(PendingLink {
                    left: dest_url.to_string(),
                    start,
                    embedded: true,
                    text: String::new(),
                });
            }
            Event::End(TagEnd::Link) | Event::End(TagEnd::Image) => {
                if let Some(link) = pending_link.take() {
                    // pulldown_cmark may report the range ending before the closing `]]`
                    let mut end_offset = end;
                    while end_offset < text.len() && text.as_bytes()[end_offset] == b']' {
                        end_offset += 1;
                    }
                    links.push(build_link(link, end_offset, &line_map, options.wikilink_format));
                }
            }

            Event::Text(content) | Event::Code(content) => {
                if let Some(directive) = pending_directive.as_mut() {
                    directive.source.push_str(&content);
                } else if let Some(link) = pending_link.as_mut() {
                    link.text.push_str(&content);
                }
            }
            _ => {}
        }
    }

    BodyScan { links, directives }
}

fn build_link(
    link: PendingLink,
    end_offset: usize,
    line_map: &LineMap,
    format: WikiLinkFormat,
) -> LinkRef {
    // inside table cells the pipe is written `\|`; the backslash stays on the left part
    let left = link.left.trim().trim_end_matches('\\').trim_end();
    let right = link.text.trim();

    let (mut target, alias) = if left == right || right.is_empty() {
        (left.to_string(), None)
    } else {
        match format {
            WikiLinkFormat::AliasFirst => (right.to_string(), Some(left.to_string())),
            WikiLinkFormat::TargetFirst => (left.to_string(), Some(right.to_string())),
        }
    };

    let mut anchor = None;
    if let Some(pos) = target.find('#') {
        anchor = Some(target[pos + 1..].to_string());
        target.truncate(pos);
    }

    LinkRef {
        target: target.trim().to_string(),
        alias,
        anchor,
        range: line_map.range(link.start, end_offset),
        kind: if link.embedded {
            LinkKind::EmbeddedWikiLink
        } else {
            LinkKind::WikiLink
        },
    }
}

/// Parse raw document text into a `Document`.
///
/// The result is unvalidated: `kind` is always `Topic` until the schema
/// classifies it.
pub fn parse_document(
    path: &str,
    text: &str,
    options: &ParseOptions,
) -> Result<Document, ParseError> {
    let (yaml, body_offset) = split_frontmatter(text)?;
    let metadata = match yaml {
        Some(yaml) => parse_metadata(yaml)?,
        None => Metadata::new(),
    };

    let scan = scan_body(text, body_offset, options);

    Ok(Document {
        id: doc_id_of(path),
        path: path.to_string(),
        kind: DocumentKind::Topic,
        metadata,
        body: text[body_offset..].to_string(),
        links_out: scan.links,
        directives: scan.directives,
        digest: compute_digest(text),
    })
}
