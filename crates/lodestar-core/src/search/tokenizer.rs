//! Tokenization for keyword ranking.

use regex::Regex;
use std::sync::LazyLock;

/// Runs of CJK unified ideographs, or runs of other word characters.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\u{4e00}-\u{9fff}]+|[\w--[\u{4e00}-\u{9fff}]]+").expect("valid token pattern")
});

/// Splits text into index terms.
///
/// The same tokenizer must be used for the corpus and for queries.
pub trait TextTokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Tokenizer name for logs.
    fn name(&self) -> &'static str;
}

/// Lower-cased Unicode word tokens, with contiguous CJK ideographs kept as
/// one token.
///
/// No stemming and no stop words: `"mammal"` and `"mammals"` are different
/// terms.
///
/// ```
/// use lodestar_core::search::tokenizer::{TextTokenizer, UnicodeWordTokenizer};
///
/// let tokens = UnicodeWordTokenizer.tokenize("Cats are MAMMALS, 猫は哺乳類");
/// assert_eq!(tokens, vec!["cats", "are", "mammals", "猫", "は", "哺乳類"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeWordTokenizer;

impl TextTokenizer for UnicodeWordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        TOKEN_RE
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    fn name(&self) -> &'static str {
        "unicode-word"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_strips_punctuation() {
        let tokens = UnicodeWordTokenizer.tokenize("Hello, World! It's 2024.");
        assert_eq!(tokens, vec!["hello", "world", "it", "s", "2024"]);
    }

    #[test]
    fn test_no_stemming() {
        assert_eq!(UnicodeWordTokenizer.tokenize("mammal"), vec!["mammal"]);
        assert_eq!(UnicodeWordTokenizer.tokenize("mammals"), vec!["mammals"]);
    }

    #[test]
    fn test_cjk_runs_split_from_latin() {
        let tokens = UnicodeWordTokenizer.tokenize("rust语言编程abc");
        assert_eq!(tokens, vec!["rust", "语言编程", "abc"]);
    }

    #[test]
    fn test_underscores_and_digits_are_word_chars() {
        let tokens = UnicodeWordTokenizer.tokenize("snake_case v2");
        assert_eq!(tokens, vec!["snake_case", "v2"]);
    }

    #[test]
    fn test_empty_and_symbols() {
        assert!(UnicodeWordTokenizer.tokenize("").is_empty());
        assert!(UnicodeWordTokenizer.tokenize("  -- !! ").is_empty());
    }
}
