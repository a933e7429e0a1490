use std::collections::HashSet;

use crate::citations::rewrite::escape_link_text;
use crate::citations::{domain_of, is_external_url, synthetic_citation, Citation, CitationMap};

/// Link texts that say nothing about the target and lose to the domain.
const GENERIC_LINK_TEXTS: &[&str] = &["Source", "来源"];

const SNIPPET_MAX_CHARS: usize = 120;

/// Result of running the link hook over a markdown body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotatedLinks {
    pub text: String,
    /// Citations actually linked from the body, in order of first use.
    pub sources: Vec<Citation>,
}

/// Label for a citation link: the citation title, then the author's link
/// text unless it is a generic placeholder, then the domain.
pub fn display_text(citation: Option<&Citation>, link_text: &str, href: &str) -> String {
    if let Some(c) = citation.filter(|c| !c.title.is_empty()) {
        return c.title.clone();
    }
    let link_text = link_text.trim();
    if !link_text.is_empty() && !GENERIC_LINK_TEXTS.contains(&link_text) {
        return link_text.to_string();
    }
    domain_of(href)
}

/// Rewrite markdown links whose target is a known citation (or, with
/// `synthetic_external`, any external URL) into citation links.
///
/// Citation links get a resolved label and an angle-bracketed target so
/// Discord does not unfurl an embed for every source. Images and links to
/// unknown targets are copied through untouched.
pub fn annotate_links(markdown: &str, map: &CitationMap, synthetic_external: bool) -> AnnotatedLinks {
    let mut out = String::with_capacity(markdown.len());
    let mut sources = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = 0;

    while let Some(link) = next_link(markdown, cursor) {
        out.push_str(&markdown[cursor..link.start]);
        cursor = link.end;

        let original = &markdown[link.start..link.end];
        if link.is_image {
            out.push_str(original);
            continue;
        }

        let link_text = unescape_link_text(link.text);
        let citation = match map.get(link.href) {
            Some(c) => c.clone(),
            None if synthetic_external && is_external_url(link.href) => {
                synthetic_citation(link.href, &link_text)
            }
            None => {
                out.push_str(original);
                continue;
            }
        };

        let label = display_text(Some(&citation), &link_text, link.href);
        out.push_str(&format!("[{}](<{}>)", escape_link_text(&label), link.href));
        if seen.insert(citation.url.clone()) {
            sources.push(citation);
        }
    }
    out.push_str(&markdown[cursor..]);

    AnnotatedLinks { text: out, sources }
}

/// `**Sources:**` list for the citations linked from a reply.
pub fn sources_footer(sources: &[Citation]) -> String {
    let mut out = String::from("**Sources:**");
    for citation in sources {
        let label = display_text(Some(citation), "", &citation.url);
        out.push_str(&format!("\n- [{}](<{}>)", escape_link_text(&label), citation.url));
        let snippet = citation.snippet.trim();
        if !snippet.is_empty() {
            out.push_str(": ");
            out.push_str(&truncate_chars(snippet, SNIPPET_MAX_CHARS));
        }
    }
    out
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

struct MarkdownLink<'a> {
    start: usize,
    end: usize,
    text: &'a str,
    href: &'a str,
    is_image: bool,
}

/// Find the next inline `[text](href)` link at or after `from`.
///
/// Link text may not span lines or contain unescaped brackets. The target
/// is either `<...>` or a run without whitespace in which parentheses
/// must balance.
fn next_link(markdown: &str, from: usize) -> Option<MarkdownLink<'_>> {
    let bytes = markdown.as_bytes();
    let mut search = from;
    loop {
        let open = search + markdown[search..].find('[')?;
        search = open + 1;
        if open > from && bytes[open - 1] == b'\\' {
            continue;
        }

        let text_start = open + 1;
        let Some(close) = link_text_end(bytes, text_start) else {
            continue;
        };
        if bytes.get(close + 1) != Some(&b'(') {
            continue;
        }
        let Some((href_start, href_end, end)) = link_target_span(markdown, close + 2) else {
            continue;
        };

        let is_image = open > from && bytes[open - 1] == b'!';
        return Some(MarkdownLink {
            start: if is_image { open - 1 } else { open },
            end,
            text: &markdown[text_start..close],
            href: &markdown[href_start..href_end],
            is_image,
        });
    }
}

/// Index of the `]` that closes link text starting at `start`.
fn link_text_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b']' => return Some(i),
            b'[' | b'\n' => return None,
            _ => i += 1,
        }
    }
    None
}

/// Span of the target starting right after `(`: href start, href end, and
/// the index just past the closing `)`.
fn link_target_span(markdown: &str, start: usize) -> Option<(usize, usize, usize)> {
    let bytes = markdown.as_bytes();
    if bytes.get(start) == Some(&b'<') {
        let rel = markdown[start + 1..].find(|c: char| c == '>' || c == '\n')?;
        let gt = start + 1 + rel;
        if rel == 0 || bytes[gt] != b'>' || bytes.get(gt + 1) != Some(&b')') {
            return None;
        }
        return Some((start + 1, gt, gt + 2));
    }

    let mut depth = 0usize;
    for (i, b) in bytes.get(start..)?.iter().enumerate() {
        match *b {
            b'(' => depth += 1,
            b')' if depth == 0 => {
                return (i > 0).then_some((start, start + i, start + i + 1));
            }
            b')' => depth -= 1,
            b if b.is_ascii_whitespace() => return None,
            _ => {}
        }
    }
    None
}

fn unescape_link_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::build_citation_map;

    fn cite(id: &str, title: &str, url: &str, snippet: &str) -> Citation {
        Citation {
            id: id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            snippet: snippet.to_string(),
        }
    }

    #[test]
    fn test_display_text_priority() {
        let titled = cite("cite-1", "Title", "https://a.com", "");
        let untitled = cite("cite-2", "", "https://www.b.com/x", "");
        assert_eq!(display_text(Some(&titled), "Text", "https://a.com"), "Title");
        assert_eq!(display_text(Some(&untitled), "Text", &untitled.url), "Text");
        assert_eq!(display_text(Some(&untitled), "Source", &untitled.url), "b.com");
        assert_eq!(display_text(None, "来源", "https://www.b.com/x"), "b.com");
        assert_eq!(display_text(None, "  ", "https://c.io"), "c.io");
    }

    #[test]
    fn test_annotate_known_citation() {
        let map = build_citation_map(&[cite("cite-1", "Docs", "https://docs.rs", "")]);
        let out = annotate_links("See [Source](https://docs.rs) now.", &map, false);
        assert_eq!(out.text, "See [Docs](<https://docs.rs>) now.");
        assert_eq!(out.sources.len(), 1);
    }

    #[test]
    fn test_annotate_leaves_unknown_links() {
        let map = CitationMap::new();
        let input = "A [link](https://a.com) and [rel](/path) and [x] (y)";
        let out = annotate_links(input, &map, false);
        assert_eq!(out.text, input);
        assert!(out.sources.is_empty());
    }

    #[test]
    fn test_annotate_synthetic_external() {
        let map = CitationMap::new();
        let out = annotate_links("[Rust](https://www.rust-lang.org) [rel](/p)", &map, true);
        assert_eq!(out.text, "[Rust](<https://www.rust-lang.org>) [rel](/p)");
        assert_eq!(out.sources.len(), 1);
        assert!(out.sources[0].id.starts_with("link-"));
    }

    #[test]
    fn test_annotate_skips_images() {
        let map = build_citation_map(&[cite("cite-1", "Img", "https://a.com/i.png", "")]);
        let input = "![alt](https://a.com/i.png)";
        let out = annotate_links(input, &map, true);
        assert_eq!(out.text, input);
        assert!(out.sources.is_empty());
    }

    #[test]
    fn test_annotate_dedups_sources() {
        let map = build_citation_map(&[cite("cite-1", "A", "https://a.com", "")]);
        let out = annotate_links("[A](https://a.com) [again](https://a.com)", &map, false);
        assert_eq!(out.text, "[A](<https://a.com>) [A](<https://a.com>)");
        assert_eq!(out.sources.len(), 1);
    }

    #[test]
    fn test_annotate_target_with_parens() {
        let url = "https://en.wikipedia.org/wiki/Rust_(programming_language)";
        let map = build_citation_map(&[cite("cite-1", "Rust", url, "")]);
        let expected = format!("[Rust](<{}>).", url);

        let bare = annotate_links(&format!("[Rust]({}).", url), &map, false);
        assert_eq!(bare.text, expected);
        assert_eq!(bare.sources.len(), 1);

        let bracketed = annotate_links(&format!("[Rust](<{}>).", url), &map, false);
        assert_eq!(bracketed.text, expected);
        assert_eq!(bracketed.sources.len(), 1);
    }

    #[test]
    fn test_annotate_escaped_link_text() {
        let map = build_citation_map(&[cite("cite-1", "", "https://a.com", "")]);
        let out = annotate_links("See [Rust \\[2024\\] Guide](https://a.com).", &map, false);
        assert_eq!(out.text, "See [Rust \\[2024\\] Guide](<https://a.com>).");
        assert_eq!(out.sources.len(), 1);
    }

    #[test]
    fn test_unbalanced_or_escaped_links_left_alone() {
        let map = build_citation_map(&[cite("cite-1", "A", "https://a.com", "")]);
        let input = "\\[A](https://a.com) and [A](https://a.com(x)";
        let out = annotate_links(input, &map, false);
        assert_eq!(out.text, input);
        assert!(out.sources.is_empty());
    }

    #[test]
    fn test_sources_footer_with_snippet() {
        let long = "x".repeat(130);
        let footer = sources_footer(&[
            cite("cite-1", "A", "https://a.com", "short"),
            cite("cite-2", "", "https://www.b.com", &long),
        ]);
        let expected = format!(
            "**Sources:**\n- [A](<https://a.com>): short\n- [b.com](<https://www.b.com>): {}...",
            "x".repeat(120)
        );
        assert_eq!(footer, expected);
    }
}
