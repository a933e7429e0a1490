//! Citation handling for streamed agent replies.
//!
//! The agent embeds a line-oriented block in its markdown output:
//!
//! ```text
//! <citations>
//! {"id": "cite-1", "title": "Page Title", "url": "https://example.com", "snippet": "..."}
//! </citations>
//! ```
//!
//! and refers to entries inline as `[cite-1]`. Everything here is a pure
//! function of its input and is re-run on every rendered frame.

pub mod gate;
pub mod map;
pub mod parse;
pub mod rewrite;
pub mod types;

pub use gate::{is_citations_block_incomplete, should_suppress_display};
pub use map::{build_citation_map, domain_of, is_external_url, synthetic_citation, CitationMap};
pub use parse::{parse_citations, parse_citations_opt};
pub use types::{Citation, ParseResult};
