//! BM25 relevance scoring.

use serde::{Deserialize, Serialize};

/// BM25 parameters of a collection's inverted index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    /// K1 parameter for BM25 (term frequency saturation).
    pub k1: f32,

    /// B parameter for BM25 (field length normalization).
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Bm25Params { k1: 1.2, b: 0.75 }
    }
}

/// Field-wide statistics needed to score one term.
#[derive(Debug, Clone, Copy)]
pub struct TermStats {
    /// Number of documents that have the field.
    pub doc_count: u64,
    /// Number of those documents containing the term.
    pub doc_freq: u64,
    /// Average field length in terms.
    pub avg_field_length: f64,
}

/// Scores a single (term, document) pair.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Scorer {
    params: Bm25Params,
}

impl Bm25Scorer {
    pub fn new(params: Bm25Params) -> Self {
        Bm25Scorer { params }
    }

    /// Inverse document frequency, `ln(1 + (N - n + 0.5) / (n + 0.5))`.
    ///
    /// Always positive, so a matching term never lowers a score.
    pub fn idf(&self, stats: &TermStats) -> f64 {
        let n = stats.doc_freq as f64;
        let total = stats.doc_count as f64;
        (1.0 + (total - n + 0.5) / (n + 0.5)).ln()
    }

    /// BM25 contribution of one term occurring `tf` times in a field of `field_length` terms.
    pub fn score(&self, tf: u32, field_length: u32, stats: &TermStats) -> f64 {
        if tf == 0 {
            return 0.0;
        }

        let k1 = self.params.k1 as f64;
        let b = self.params.b as f64;
        let tf = tf as f64;
        let avg_len = if stats.avg_field_length > 0.0 {
            stats.avg_field_length
        } else {
            1.0
        };
        let doc_len = field_length as f64;

        let tf_component = (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * (doc_len / avg_len)));

        self.idf(stats) * tf_component
    }
}
