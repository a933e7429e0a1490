use std::collections::HashMap;

use url::Url;

use super::types::Citation;

/// URL -> citation lookup used by the link hook at render time.
pub type CitationMap = HashMap<String, Citation>;

/// Build a lookup keyed by URL. Later duplicates overwrite earlier ones;
/// the extractor already guarantees unique URLs.
pub fn build_citation_map(citations: &[Citation]) -> CitationMap {
    citations
        .iter()
        .map(|c| (c.url.clone(), c.clone()))
        .collect()
}

/// Hostname of `url` without a leading `www.`, or `url` itself when it
/// does not parse or has no host.
pub fn domain_of(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    match parsed.host_str() {
        Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
        None => url.to_string(),
    }
}

pub fn is_external_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Placeholder citation for a plain markdown link found outside any
/// citation block. The id is derived from the URL so it is stable across
/// frames.
pub fn synthetic_citation(url: &str, fallback_title: &str) -> Citation {
    let hash = blake3::hash(url.as_bytes()).to_hex();
    let title = match fallback_title.trim() {
        "" => domain_of(url),
        t => t.to_string(),
    };
    Citation {
        id: format!("link-{}", &hash[..12]),
        title,
        url: url.to_string(),
        snippet: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://www.example.com/path"), "example.com");
        assert_eq!(domain_of("http://docs.rs/tokio"), "docs.rs");
        assert_eq!(domain_of("https://wwwx.example.com"), "wwwx.example.com");
        assert_eq!(domain_of("not a url"), "not a url");
        assert_eq!(domain_of(""), "");
    }

    #[test]
    fn test_is_external_url() {
        assert!(is_external_url("https://a.com"));
        assert!(is_external_url("http://a.com"));
        assert!(!is_external_url("mailto:x@a.com"));
        assert!(!is_external_url("/relative/path"));
        assert!(!is_external_url("HTTPS://A.COM"));
    }

    #[test]
    fn test_build_citation_map_last_write_wins() {
        let a = Citation {
            id: "cite-1".to_string(),
            title: "A".to_string(),
            url: "https://a.com".to_string(),
            snippet: String::new(),
        };
        let b = Citation {
            id: "cite-2".to_string(),
            title: "B".to_string(),
            ..a.clone()
        };
        let map = build_citation_map(&[a, b]);
        assert_eq!(map.len(), 1);
        assert_eq!(map["https://a.com"].id, "cite-2");
    }

    #[test]
    fn test_synthetic_citation() {
        let c = synthetic_citation("https://www.rust-lang.org/learn", "  Learn Rust ");
        assert_eq!(c.title, "Learn Rust");
        assert_eq!(c.url, "https://www.rust-lang.org/learn");
        assert!(c.snippet.is_empty());
        assert!(c.id.starts_with("link-"));
        assert_eq!(c.id.len(), "link-".len() + 12);

        let again = synthetic_citation("https://www.rust-lang.org/learn", "");
        assert_eq!(again.id, c.id);
        assert_eq!(again.title, "rust-lang.org");
    }
}
