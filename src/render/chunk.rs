/// Discord rejects messages over 2000 characters; leave some headroom.
pub const MESSAGE_LIMIT: usize = 1990;

/// Split `text` into pieces of at most `max` bytes, preferring to break
/// after a newline, then after a space.
pub fn split_chunks(text: &str, max: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max {
            chunks.push(remaining);
            break;
        }
        let limit = floor_char_boundary(remaining, max);
        let split_at = remaining[..limit]
            .rfind('\n')
            .or_else(|| remaining[..limit].rfind(' '))
            .map(|i| i + 1)
            .unwrap_or(limit);
        // A single char wider than `max` still has to go somewhere
        let split_at = if split_at == 0 {
            remaining.chars().next().map(char::len_utf8).unwrap_or(remaining.len())
        } else {
            split_at
        };
        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    chunks
}

/// Fit a still-growing reply into one editable message by keeping its head.
pub fn truncate_for_edit(text: &str, max: usize) -> String {
    const ELLIPSIS: &str = "\n...";
    if text.len() <= max {
        return text.to_string();
    }
    let cut = floor_char_boundary(text, max.saturating_sub(ELLIPSIS.len()));
    format!("{}{}", &text[..cut], ELLIPSIS)
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(split_chunks("hello", 10), vec!["hello"]);
        assert!(split_chunks("", 10).is_empty());
    }

    #[test]
    fn test_split_prefers_newline() {
        let chunks = split_chunks("aaaa\nbbbb cccc", 10);
        assert_eq!(chunks, vec!["aaaa\n", "bbbb cccc"]);
    }

    #[test]
    fn test_split_falls_back_to_space_then_hard_cut() {
        assert_eq!(split_chunks("aaa bbb ccc", 8), vec!["aaa bbb ", "ccc"]);
        assert_eq!(split_chunks("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        let text = "ééééé";
        let chunks = split_chunks(text, 3);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.len() <= 3));
    }

    #[test]
    fn test_truncate_for_edit() {
        assert_eq!(truncate_for_edit("short", 10), "short");
        assert_eq!(truncate_for_edit("0123456789abc", 10), "012345\n...");
        let out = truncate_for_edit("éééééé", 8);
        assert!(out.len() <= 8);
        assert!(out.ends_with("..."));
    }
}
