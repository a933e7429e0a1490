use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, trace};

use super::rewrite::rewrite_references;
use super::types::{Citation, ParseResult};

pub const OPEN_TAG: &str = "<citations>";
pub const CLOSE_TAG: &str = "</citations>";

/// Wire shape of one citation line. Every field is optional so that `null`
/// and missing values decode and get validated afterwards.
#[derive(Debug, Deserialize)]
struct CitationLine {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    snippet: Option<String>,
}

/// A located `<citations>` block: byte range of the whole block in the
/// source text, plus the inner body.
struct Block<'a> {
    start: usize,
    end: usize,
    body: &'a str,
}

/// Parse every citation block in `content` and rewrite reference markers.
///
/// Complete blocks anywhere in the text are parsed, and so is a trailing
/// block whose closing tag has not arrived yet, so links resolve while the
/// agent is still streaming. Lines that are not (yet) valid JSON are skipped.
pub fn parse_citations(content: &str) -> ParseResult {
    if content.is_empty() {
        return ParseResult {
            citations: vec![],
            clean_content: content.to_string(),
        };
    }

    let (blocks, dangling) = locate_blocks(content);

    let mut citations = Vec::new();
    let mut seen_urls = HashSet::new();
    for body in blocks.iter().map(|b| b.body).chain(dangling.as_ref().map(|d| d.body)) {
        collect_citations(body, &mut seen_urls, &mut citations);
    }

    let stripped = strip_blocks(content, &blocks, dangling.as_ref());
    let clean_content = rewrite_references(&stripped, &citations);

    debug!(
        complete_blocks = blocks.len(),
        dangling = dangling.is_some(),
        citations = citations.len(),
        "Parsed citations"
    );

    ParseResult {
        citations,
        clean_content,
    }
}

/// `parse_citations` for callers that may not have any text yet.
pub fn parse_citations_opt(content: Option<&str>) -> ParseResult {
    parse_citations(content.unwrap_or_default())
}

/// Find complete `<citations>...</citations>` blocks (non-greedy, in order)
/// and a trailing open block with no closing tag after it.
fn locate_blocks(content: &str) -> (Vec<Block<'_>>, Option<Block<'_>>) {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = content[cursor..].find(OPEN_TAG) {
        let start = cursor + rel;
        let body_start = start + OPEN_TAG.len();
        match content[body_start..].find(CLOSE_TAG) {
            Some(close_rel) => {
                let body_end = body_start + close_rel;
                let end = body_end + CLOSE_TAG.len();
                blocks.push(Block {
                    start,
                    end,
                    body: &content[body_start..body_end],
                });
                cursor = end;
            }
            None => {
                let dangling = Block {
                    start,
                    end: content.len(),
                    body: &content[body_start..],
                };
                return (blocks, Some(dangling));
            }
        }
    }

    (blocks, None)
}

fn strip_blocks(content: &str, blocks: &[Block<'_>], dangling: Option<&Block<'_>>) -> String {
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for block in blocks.iter().chain(dangling) {
        out.push_str(&content[cursor..block.start]);
        cursor = block.end;
    }
    out.push_str(&content[cursor..]);
    out.trim().to_string()
}

fn collect_citations(body: &str, seen_urls: &mut HashSet<String>, out: &mut Vec<Citation>) {
    for line in body.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            continue;
        }
        let Some(citation) = decode_line(trimmed) else {
            trace!(line = trimmed, "Skipping incomplete citation line");
            continue;
        };
        // First occurrence of a URL wins
        if seen_urls.insert(citation.url.clone()) {
            out.push(citation);
        }
    }
}

fn decode_line(line: &str) -> Option<Citation> {
    let raw: CitationLine = serde_json::from_str(line).ok()?;
    let id = raw.id.filter(|s| !s.is_empty())?;
    let url = raw.url.filter(|s| !s.is_empty())?;
    Some(Citation {
        id,
        title: raw.title.unwrap_or_default(),
        url,
        snippet: raw.snippet.unwrap_or_default(),
    })
}
