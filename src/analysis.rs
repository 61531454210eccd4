//! Text analysis for the inverted index.
//!
//! A collection's inverted index configuration picks a [`Tokenization`]
//! (how text becomes terms) and a stopword policy (which query terms are
//! ignored when scoring). Stopwords are applied at query time only, so a
//! reconfigured stopword list takes effect without re-indexing.

pub mod stop;
pub mod token;
pub mod tokenizer;

pub use stop::{StopFilter, StopwordConfig, StopwordPreset};
pub use token::{Token, TokenStream};
pub use tokenizer::{Tokenization, Tokenizer};
