use serde::{Deserialize, Serialize};

/// A single source reference emitted by the agent inside a `<citations>` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Upstream identifier, e.g. "cite-1". Unique within one message.
    pub id: String,
    /// Human-readable source title. May be empty.
    #[serde(default)]
    pub title: String,
    /// Canonical URL. Natural key for dedup and lookup.
    pub url: String,
    /// Short excerpt. May be empty.
    #[serde(default)]
    pub snippet: String,
}

/// Output of one parse pass over a text blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    /// Citations in order of first appearance.
    pub citations: Vec<Citation>,
    /// Input with citation blocks removed and resolvable markers rewritten as links.
    pub clean_content: String,
}
