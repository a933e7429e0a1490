pub mod chunk;
pub mod links;

use tracing::debug;

use crate::citations::parse::OPEN_TAG;
use crate::citations::{
    build_citation_map, domain_of, parse_citations, parse_citations_opt,
    should_suppress_display, Citation, CitationMap, ParseResult,
};

/// Presentation switches for a rendered frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Render external links outside the citation block as citations too.
    pub synthetic_external: bool,
    /// Append a list of the cited sources under the body.
    pub sources_footer: bool,
    /// How many discovered titles the loading placeholder lists.
    pub max_placeholder_titles: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            synthetic_external: false,
            sources_footer: true,
            max_placeholder_titles: 8,
        }
    }
}

/// One parse pass plus the URL lookup built from it.
#[derive(Debug, Clone, Default)]
pub struct ParsedCitations {
    pub citations: Vec<Citation>,
    pub clean_content: String,
    pub citation_map: CitationMap,
}

impl ParsedCitations {
    pub fn parse(raw: &str) -> Self {
        Self::from_result(parse_citations(raw))
    }

    pub fn parse_opt(raw: Option<&str>) -> Self {
        Self::from_result(parse_citations_opt(raw))
    }

    fn from_result(result: ParseResult) -> Self {
        let citation_map = build_citation_map(&result.citations);
        Self {
            citations: result.citations,
            clean_content: result.clean_content,
            citation_map,
        }
    }
}

/// What the client should show for the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Citations are still settling; show a placeholder listing what arrived so far.
    Loading { citations: Vec<Citation> },
    /// Safe to show.
    Body { text: String },
}

impl Frame {
    pub fn is_loading(&self) -> bool {
        matches!(self, Frame::Loading { .. })
    }

    /// Discord-ready text for this frame.
    pub fn to_message(&self, options: &RenderOptions) -> String {
        match self {
            Frame::Loading { citations } => loading_message(citations, options.max_placeholder_titles),
            Frame::Body { text } => text.clone(),
        }
    }
}

/// Turns successive snapshots of a streamed reply into frames.
///
/// Holds the last parse keyed by its raw input so that ticks with no new
/// text do not reparse.
pub struct FrameRenderer {
    options: RenderOptions,
    cache: Option<(String, ParsedCitations)>,
}

impl FrameRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            cache: None,
        }
    }

    /// Parse `raw`, reusing the previous result when the input is unchanged.
    pub fn parsed(&mut self, raw: &str) -> &ParsedCitations {
        if !matches!(&self.cache, Some((key, _)) if key == raw) {
            self.cache = None;
        }
        let entry = self
            .cache
            .get_or_insert_with(|| (raw.to_string(), ParsedCitations::parse(raw)));
        &entry.1
    }

    pub fn render(&mut self, raw: &str, is_streaming: bool) -> Frame {
        let options = self.options;
        let parsed = self.parsed(raw);
        render_parsed(raw, parsed, is_streaming, &options)
    }
}

/// Build the frame for an already parsed snapshot.
pub fn render_parsed(
    raw: &str,
    parsed: &ParsedCitations,
    is_streaming: bool,
    options: &RenderOptions,
) -> Frame {
    if should_suppress_display(raw, &parsed.clean_content, is_streaming) {
        debug!(
            citations = parsed.citations.len(),
            is_streaming, "Suppressing frame until citations settle"
        );
        return Frame::Loading {
            citations: parsed.citations.clone(),
        };
    }

    let body = if is_streaming {
        hold_back_partial_syntax(&parsed.clean_content)
    } else {
        parsed.clean_content.as_str()
    };

    let annotated = links::annotate_links(body, &parsed.citation_map, options.synthetic_external);
    let mut text = annotated.text;
    if options.sources_footer && !annotated.sources.is_empty() {
        text.push_str("\n\n");
        text.push_str(&links::sources_footer(&annotated.sources));
    }
    Frame::Body { text }
}

/// Cut a trailing fragment that could still grow into `<citations>` or a
/// `[cite-N]` marker, so half-arrived syntax is never shown.
pub fn hold_back_partial_syntax(text: &str) -> &str {
    let mut end = text.len();

    for len in (1..OPEN_TAG.len()).rev() {
        if text[..end].ends_with(&OPEN_TAG[..len]) {
            end -= len;
            break;
        }
    }

    if let Some(bracket) = text[..end].rfind('[') {
        if is_partial_marker(&text[bracket..end]) {
            end = bracket;
        }
    }

    text[..end].trim_end()
}

/// `[`, `[c`, ... `[cite-`, or `[cite-` followed only by digits.
fn is_partial_marker(tail: &str) -> bool {
    const PREFIX: &str = "[cite-";
    if tail.len() <= PREFIX.len() {
        return PREFIX.starts_with(tail);
    }
    tail.starts_with(PREFIX) && tail[PREFIX.len()..].bytes().all(|b| b.is_ascii_digit())
}

fn loading_message(citations: &[Citation], max_titles: usize) -> String {
    let mut out = match citations.len() {
        0 => "*Loading citations...*".to_string(),
        1 => "*Loading 1 citation...*".to_string(),
        n => format!("*Loading {} citations...*", n),
    };
    for citation in citations.iter().take(max_titles) {
        let label = if citation.title.is_empty() {
            domain_of(&citation.url)
        } else {
            citation.title.clone()
        };
        out.push_str(&format!("\n- {}", label));
    }
    if citations.len() > max_titles {
        out.push_str(&format!("\n- ... and {} more", citations.len() - max_titles));
    }
    out
}
