//! Stopword policy.
//!
//! A collection declares a preset plus explicit additions and removals. The
//! resulting [`StopFilter`] drops query terms that should not influence BM25
//! scores.
//!
//! # Examples
//!
//! ```
//! use halberd::analysis::stop::{StopFilter, StopwordConfig, StopwordPreset};
//!
//! let config = StopwordConfig {
//!     preset: StopwordPreset::En,
//!     additions: vec!["vector".to_string()],
//!     removals: vec!["not".to_string()],
//! };
//! let filter = StopFilter::from_config(&config);
//! assert!(filter.is_stop_word("the"));
//! assert!(filter.is_stop_word("vector"));
//! assert!(!filter.is_stop_word("not"));
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::analysis::token::Token;

/// Default English stop words list.
const DEFAULT_ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Built-in stopword lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopwordPreset {
    /// Common English function words.
    #[default]
    En,
    /// No built-in stopwords.
    None,
}

impl StopwordPreset {
    fn words(&self) -> &'static [&'static str] {
        match self {
            StopwordPreset::En => DEFAULT_ENGLISH_STOP_WORDS,
            StopwordPreset::None => &[],
        }
    }
}

/// Stopword settings of a collection's inverted index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopwordConfig {
    pub preset: StopwordPreset,
    pub additions: Vec<String>,
    pub removals: Vec<String>,
}

/// A filter that removes stop words from a token sequence.
#[derive(Debug, Clone, Default)]
pub struct StopFilter {
    stop_words: HashSet<String>,
}

impl StopFilter {
    /// Build the effective stopword set: preset, plus additions, minus removals.
    pub fn from_config(config: &StopwordConfig) -> Self {
        let mut stop_words: HashSet<String> =
            config.preset.words().iter().map(|w| w.to_string()).collect();
        for word in &config.additions {
            stop_words.insert(word.to_lowercase());
        }
        for word in &config.removals {
            stop_words.remove(&word.to_lowercase());
        }
        StopFilter { stop_words }
    }

    /// Check if a word is a stop word. Matching is case-insensitive.
    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word) || self.stop_words.contains(&word.to_lowercase())
    }

    /// Drop stop words from a token sequence.
    pub fn filter(&self, tokens: impl Iterator<Item = Token>) -> Vec<Token> {
        tokens
            .filter(|token| !self.is_stop_word(&token.text))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stop_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stop_words.is_empty()
    }
}
