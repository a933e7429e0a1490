use std::collections::HashMap;

use super::map::domain_of;
use super::types::Citation;

const MARKER_PREFIX: &str = "[cite-";

/// A `[cite-N]` reference marker located in a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker<'a> {
    pub start: usize,
    pub end: usize,
    /// The referenced citation id, e.g. "cite-3".
    pub id: &'a str,
}

/// Iterate over every reference marker in `text`.
///
/// A marker directly followed by `(` is the text of an ordinary markdown
/// link (`[cite-1](https://...)`) and is not reported.
pub fn find_markers(text: &str) -> impl Iterator<Item = Marker<'_>> + '_ {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        while let Some(rel) = text[cursor..].find(MARKER_PREFIX) {
            let start = cursor + rel;
            let digits_start = start + MARKER_PREFIX.len();
            let digits_len = text[digits_start..]
                .bytes()
                .take_while(|b| b.is_ascii_digit())
                .count();
            let close = digits_start + digits_len;
            cursor = start + 1;

            if digits_len == 0 || text.as_bytes().get(close) != Some(&b']') {
                continue;
            }
            let end = close + 1;
            if text.as_bytes().get(end) == Some(&b'(') {
                cursor = end;
                continue;
            }
            cursor = end;
            return Some(Marker {
                start,
                end,
                // Skip the leading '['
                id: &text[start + 1..close],
            });
        }
        None
    })
}

/// Replace every `[cite-N]` whose id is known with `[title](url)`.
///
/// The link text falls back to the URL's domain when the title is empty.
/// Markers with no matching citation are left verbatim.
pub fn rewrite_references(text: &str, citations: &[Citation]) -> String {
    if citations.is_empty() {
        return text.to_string();
    }

    let mut by_id: HashMap<&str, &Citation> = HashMap::with_capacity(citations.len());
    for citation in citations {
        by_id.entry(citation.id.as_str()).or_insert(citation);
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for marker in find_markers(text) {
        let Some(citation) = by_id.get(marker.id) else {
            continue;
        };
        out.push_str(&text[cursor..marker.start]);
        out.push_str(&citation_link(citation));
        cursor = marker.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn citation_link(citation: &Citation) -> String {
    let text = if citation.title.is_empty() {
        domain_of(&citation.url)
    } else {
        citation.title.clone()
    };
    format!("[{}]({})", escape_link_text(&text), link_target(&citation.url))
}

/// Backslash-escape brackets so a title cannot close the link text early.
pub fn escape_link_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A URL as a markdown link target. URLs with parentheses or whitespace
/// are wrapped in `<...>` so the first `)` does not end the target.
fn link_target(url: &str) -> String {
    if url.contains(|c: char| c == '(' || c == ')' || c.is_whitespace()) {
        format!("<{}>", url)
    } else {
        url.to_string()
    }
}
