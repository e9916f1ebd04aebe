//! Command-line style tokenizer for chat input.

/// Split `raw` on whitespace, keeping double-quoted spans together.
///
/// Quote characters are dropped. An unterminated quote runs to the end of the
/// input instead of failing.
pub fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for ch in raw.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::tokenize;

    #[test]
    fn keeps_quoted_span_together() {
        assert_eq!(tokenize(r#"a "b c" d"#), vec!["a", "b c", "d"]);
    }

    #[test]
    fn empty_and_blank_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t \n").is_empty());
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        assert_eq!(tokenize(r#""unterminated"#), vec!["unterminated"]);
        assert_eq!(tokenize(r#"init "my board  "#), vec!["init", "my board  "]);
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(tokenize("  init \t ttDOjGp5   "), vec!["init", "ttDOjGp5"]);
    }

    #[test]
    fn quotes_inside_words_and_empty_quotes() {
        assert_eq!(tokenize(r#"ab"c d"e"#), vec!["abc de"]);
        assert_eq!(tokenize(r#"x "" y"#), vec!["x", "", "y"]);
    }
}
