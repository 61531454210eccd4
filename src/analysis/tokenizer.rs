//! Tokenizers for indexing and querying text properties.
//!
//! The four tokenizations mirror the ones a collection can declare:
//!
//! | Tokenization | Splits on                  | Lowercases |
//! |--------------|----------------------------|------------|
//! | `Word`       | Unicode word boundaries    | yes        |
//! | `Lowercase`  | whitespace                 | yes        |
//! | `Whitespace` | whitespace                 | no         |
//! | `Field`      | nothing (whole trimmed value) | no      |
//!
//! # Examples
//!
//! ```
//! use halberd::analysis::tokenizer::{Tokenization, Tokenizer};
//!
//! let terms: Vec<String> = Tokenization::Word
//!     .tokenize("Hello, Vector-DB world!")
//!     .map(|t| t.text)
//!     .collect();
//! assert_eq!(terms, vec!["hello", "vector", "db", "world"]);
//! ```

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token::{Token, TokenStream};

/// Trait for tokenizers that convert text into tokens.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> TokenStream;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

/// How a text property is split into terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tokenization {
    /// Unicode word segments, lowercased; punctuation dropped.
    #[default]
    Word,
    /// Whitespace-separated, lowercased.
    Lowercase,
    /// Whitespace-separated, case preserved.
    Whitespace,
    /// The whole trimmed value as a single term.
    Field,
}

impl Tokenizer for Tokenization {
    fn tokenize(&self, text: &str) -> TokenStream {
        let terms: Vec<String> = match self {
            Tokenization::Word => text
                .unicode_words()
                .flat_map(|word| split_joiners(word))
                .map(|word| word.to_lowercase())
                .collect(),
            Tokenization::Lowercase => text
                .split_whitespace()
                .map(|word| word.to_lowercase())
                .collect(),
            Tokenization::Whitespace => text.split_whitespace().map(str::to_string).collect(),
            Tokenization::Field => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Vec::new()
                } else {
                    vec![trimmed.to_string()]
                }
            }
        };

        Box::new(
            terms
                .into_iter()
                .enumerate()
                .map(|(position, text)| Token::new(text, position)),
        )
    }

    fn name(&self) -> &'static str {
        match self {
            Tokenization::Word => "word",
            Tokenization::Lowercase => "lowercase",
            Tokenization::Whitespace => "whitespace",
            Tokenization::Field => "field",
        }
    }
}

/// UAX #29 keeps `vector_db` and `don't` together; word tokenization keeps
/// only alphanumeric runs.
fn split_joiners(word: &str) -> impl Iterator<Item = &str> {
    word.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
}
