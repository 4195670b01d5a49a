pub(crate) fn normalize_text(text: &str) -> String {
    text.to_ascii_lowercase()
}

/// Whitespace tokens with surrounding punctuation stripped. Casing is kept.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| {
            token.trim_matches(|c: char| !(c.is_alphanumeric() || matches!(c, '/' | '-' | '\'')))
        })
        .map(|token| token.trim_end_matches("'s"))
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
        .collect()
}

pub(crate) fn lowercase_tokens(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|token| normalize_text(&token)).collect()
}

pub(crate) fn contains_any(tokens: &[String], words: &[&str]) -> bool {
    tokens.iter().any(|token| words.contains(&token.as_str()))
}

#[cfg(test)]
mod tests {
    use super::{lowercase_tokens, tokenize};

    #[test]
    fn tokenize_strips_punctuation_but_keeps_case() {
        assert_eq!(
            tokenize("Book a flight to Paris, please!"),
            vec!["Book", "a", "flight", "to", "Paris", "please"]
        );
        assert_eq!(tokenize("on 12/25/2025."), vec!["on", "12/25/2025"]);
    }

    #[test]
    fn lowercase_tokens_normalize() {
        assert_eq!(lowercase_tokens("HOTEL in Rome"), vec!["hotel", "in", "rome"]);
    }
}
