//! Board reference normalization.
//!
//! Users may paste a board id, a short link, or a board URL such as
//! `https://trello.com/b/ttDOjGp5/yappy-trello`. Only the id-bearing path
//! segment of a URL is extracted here; the remote resolves everything else.

use std::sync::OnceLock;

use regex::Regex;

fn board_url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(?:https?://)?[^/\s]+/b/([A-Za-z0-9]+)(?:/\S*)?$").ok())
        .as_ref()
}

/// The string to hand to the remote board lookup for a user-supplied reference.
pub fn board_lookup_key(reference: &str) -> String {
    let trimmed = reference.trim();
    board_url_pattern()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::board_lookup_key;

    #[test]
    fn passes_bare_ids_through() {
        assert_eq!(board_lookup_key("ttDOjGp5"), "ttDOjGp5");
        assert_eq!(
            board_lookup_key("5803ba32d0514d27823abf3b"),
            "5803ba32d0514d27823abf3b"
        );
    }

    #[test]
    fn extracts_short_link_from_urls() {
        assert_eq!(board_lookup_key("https://trello.com/b/ttDOjGp5"), "ttDOjGp5");
        assert_eq!(
            board_lookup_key("https://trello.com/b/ttDOjGp5/yappy-trello"),
            "ttDOjGp5"
        );
        assert_eq!(board_lookup_key("trello.com/b/ttDOjGp5/"), "ttDOjGp5");
    }

    #[test]
    fn leaves_unrecognized_strings_alone() {
        assert_eq!(board_lookup_key("https://example.com/boards"), "https://example.com/boards");
        assert_eq!(board_lookup_key("  spaced  "), "spaced");
    }
}
