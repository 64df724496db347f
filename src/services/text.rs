use regex::Regex;
use std::sync::OnceLock;

fn whitespace() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"))
}

/// Lowercases `text` and collapses every whitespace run to a single space.
///
/// Applied to both page text and rule patterns so that line breaks or double
/// spaces on either side never prevent a match.
pub fn normalize_text(text: &str) -> String {
    whitespace().replace_all(text, " ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("Chapter\n\t ONE"), "chapter one");
        assert_eq!(normalize_text(" Lead  "), " lead ");
        assert_eq!(normalize_text(""), "");
    }
}
