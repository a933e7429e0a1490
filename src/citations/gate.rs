use super::parse::{CLOSE_TAG, OPEN_TAG};
use super::rewrite::find_markers;

/// True while the text has an opening `<citations>` tag and no closing tag.
pub fn is_citations_block_incomplete(content: &str) -> bool {
    content.contains(OPEN_TAG) && !content.contains(CLOSE_TAG)
}

/// True when rewriting left at least one `[cite-N]` marker in place.
pub fn has_unresolved_markers(clean_content: &str) -> bool {
    find_markers(clean_content).next().is_some()
}

/// True if an opening `<citations>` tag appears anywhere, closed or not.
pub fn has_citations_block(content: &str) -> bool {
    content.contains(OPEN_TAG)
}

/// Decide whether the current snapshot must be replaced by a loading
/// placeholder.
///
/// Unresolved markers always suppress, whether or not the stream is still
/// running. While streaming, any `<citations>` tag in the raw text also
/// suppresses until the stream ends.
pub fn should_suppress_display(raw: &str, clean_content: &str, is_streaming: bool) -> bool {
    if has_unresolved_markers(clean_content) {
        return true;
    }
    is_streaming && has_citations_block(raw)
}
