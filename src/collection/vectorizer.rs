//! Built-in vectorizers.
//!
//! A vector space may declare a vectorizer so that objects without an explicit
//! vector, and hybrid queries without an explicit embedding, can still be
//! placed in the space.

use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::analysis::{Tokenization, Tokenizer};

/// How text becomes a vector for a space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Vectorizer {
    /// Vectors must be supplied by the caller.
    #[default]
    None,
    /// Feature hashing of word terms into a fixed number of buckets.
    Hashing {
        #[serde(default)]
        seed: u64,
    },
}

impl Vectorizer {
    /// Whether this vectorizer can embed text.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Vectorizer::None)
    }

    /// Embed `text` into a vector of `dimension` components.
    ///
    /// Returns `None` when no vectorizer is configured. Text without any
    /// terms maps to the zero vector.
    pub fn vectorize(&self, text: &str, dimension: usize) -> Option<Vec<f32>> {
        match self {
            Vectorizer::None => None,
            Vectorizer::Hashing { seed } => Some(hash_embed(text, dimension, *seed)),
        }
    }
}

fn hash_embed(text: &str, dimension: usize, seed: u64) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimension];
    if dimension == 0 {
        return vector;
    }

    for token in Tokenization::Word.tokenize(text) {
        let mut hasher = XxHash64::with_seed(seed);
        hasher.write(token.text.as_bytes());
        let hash = hasher.finish();
        let bucket = (hash % dimension as u64) as usize;
        let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}
