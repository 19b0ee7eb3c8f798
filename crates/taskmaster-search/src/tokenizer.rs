//! Word tokenizer for task text and search terms.
//!
//! - Lower-cases the text
//! - Splits on whitespace
//! - Strips a fixed punctuation set from both ends of each word
//! - Drops words shorter than the configured minimum
//!
//! No stemming, no Unicode segmentation beyond whitespace.

use taskmaster_types::{QueryNormalization, TaskRecord};

/// Characters removed from both ends of every word.
pub const STRIP_CHARS: &[char] = &[
    '.', ',', '!', '?', ';', ':', '(', ')', '[', ']', '{', '}', '"', '\'', '-',
];

/// Default minimum token length in characters.
pub const DEFAULT_MIN_TOKEN_CHARS: usize = 3;

/// Normalize a single word: lower-case and strip edge punctuation.
///
/// # Example
/// ```
/// use taskmaster_search::tokenizer::normalize_word;
///
/// assert_eq!(normalize_word("(Report!)"), "report");
/// assert_eq!(normalize_word("don't"), "don't");
/// ```
pub fn normalize_word(word: &str) -> String {
    word.to_lowercase().trim_matches(STRIP_CHARS).to_string()
}

#[derive(Debug, Clone, Copy)]
pub struct Tokenizer {
    min_chars: usize,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_TOKEN_CHARS)
    }
}

impl Tokenizer {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    /// Split text into tokens, keeping repeats and their order.
    ///
    /// Words that strip down to nothing are dropped whatever `min_chars` is.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(normalize_word)
            .filter(|w| !w.is_empty() && w.chars().count() >= self.min_chars)
            .collect()
    }

    /// Tokens of a task: title tokens followed by description tokens.
    ///
    /// The two fields are tokenized independently, so a word present in
    /// both yields two tokens.
    pub fn tokenize_record(&self, record: &TaskRecord) -> Vec<String> {
        let mut tokens = self.tokenize(&record.title);
        tokens.extend(self.tokenize(&record.description));
        tokens
    }

    /// Turn one caller-supplied search term into lookup keys.
    pub fn query_keys(&self, term: &str, mode: QueryNormalization) -> Vec<String> {
        match mode {
            QueryNormalization::Unified => self.tokenize(term),
            QueryNormalization::TrimOnly => {
                let key = term.to_lowercase().trim().to_string();
                if key.is_empty() {
                    Vec::new()
                } else {
                    vec![key]
                }
            }
        }
    }
}
