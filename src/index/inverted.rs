//! Inverted index over the searchable text properties of a collection.
//!
//! Each property gets its own postings and length statistics, tokenized with
//! the property's tokenization. BM25 scores are computed per property and
//! summed.

use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;

use crate::analysis::{StopFilter, Tokenization, Tokenizer};
use crate::index::bm25::{Bm25Scorer, TermStats};

/// Postings and statistics for one property.
#[derive(Debug, Clone)]
pub struct FieldIndex {
    tokenization: Tokenization,
    /// term -> (ordinal -> term frequency)
    postings: AHashMap<String, BTreeMap<u32, u32>>,
    /// ordinal -> field length in terms
    lengths: AHashMap<u32, u32>,
    /// ordinal -> distinct terms, for removal
    doc_terms: AHashMap<u32, Vec<String>>,
    total_length: u64,
}

impl FieldIndex {
    fn new(tokenization: Tokenization) -> Self {
        FieldIndex {
            tokenization,
            postings: AHashMap::new(),
            lengths: AHashMap::new(),
            doc_terms: AHashMap::new(),
            total_length: 0,
        }
    }

    /// Tokenization used for this property.
    pub fn tokenization(&self) -> Tokenization {
        self.tokenization
    }

    /// Number of documents that have this property.
    pub fn doc_count(&self) -> usize {
        self.lengths.len()
    }

    /// Average number of terms per document.
    pub fn avg_length(&self) -> f64 {
        if self.lengths.is_empty() {
            0.0
        } else {
            self.total_length as f64 / self.lengths.len() as f64
        }
    }

    /// Number of documents containing the term.
    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, BTreeMap::len)
    }

    fn add(&mut self, ordinal: u32, texts: &[&str]) {
        let mut frequencies: BTreeMap<String, u32> = BTreeMap::new();
        let mut length = 0u32;
        for text in texts {
            for token in self.tokenization.tokenize(text) {
                *frequencies.entry(token.text).or_insert(0) += 1;
                length += 1;
            }
        }
        if length == 0 {
            return;
        }

        for (term, tf) in &frequencies {
            self.postings
                .entry(term.clone())
                .or_default()
                .insert(ordinal, *tf);
        }
        self.lengths.insert(ordinal, length);
        self.doc_terms
            .insert(ordinal, frequencies.into_keys().collect());
        self.total_length += length as u64;
    }

    fn remove(&mut self, ordinal: u32) {
        let Some(length) = self.lengths.remove(&ordinal) else {
            return;
        };
        self.total_length -= length as u64;
        for term in self.doc_terms.remove(&ordinal).unwrap_or_default() {
            if let Some(postings) = self.postings.get_mut(&term) {
                postings.remove(&ordinal);
                if postings.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
    }
}

/// A BM25 match for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordMatch {
    pub ordinal: u32,
    pub score: f64,
    /// Matched `property:term` pairs, sorted.
    pub matched: BTreeSet<String>,
}

/// Inverted index over all searchable text properties.
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    fields: BTreeMap<String, FieldIndex>,
}

impl InvertedIndex {
    /// Create an index for the given `(property, tokenization)` pairs.
    pub fn new<'a>(fields: impl IntoIterator<Item = (&'a str, Tokenization)>) -> Self {
        InvertedIndex {
            fields: fields
                .into_iter()
                .map(|(name, tokenization)| (name.to_string(), FieldIndex::new(tokenization)))
                .collect(),
        }
    }

    /// Index the text values of one document. Properties without a field are ignored.
    pub fn add_document(&mut self, ordinal: u32, texts: &BTreeMap<String, Vec<&str>>) {
        for (property, values) in texts {
            if let Some(field) = self.fields.get_mut(property) {
                field.add(ordinal, values);
            }
        }
    }

    /// Remove a document from every field.
    pub fn remove_document(&mut self, ordinal: u32) {
        for field in self.fields.values_mut() {
            field.remove(ordinal);
        }
    }

    /// Get a field by property name.
    pub fn field(&self, property: &str) -> Option<&FieldIndex> {
        self.fields.get(property)
    }

    /// Property names with a field.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Score every document matching at least one query term.
    ///
    /// The query is tokenized per property with that property's tokenization;
    /// stop words are dropped and repeated query terms count once.
    pub fn score(&self, query: &str, stop_filter: &StopFilter, scorer: &Bm25Scorer) -> Vec<KeywordMatch> {
        let mut matches: BTreeMap<u32, KeywordMatch> = BTreeMap::new();

        for (property, field) in &self.fields {
            let terms: BTreeSet<String> = stop_filter
                .filter(field.tokenization.tokenize(query))
                .into_iter()
                .map(|token| token.text)
                .collect();

            for term in terms {
                let Some(postings) = field.postings.get(&term) else {
                    continue;
                };
                let stats = TermStats {
                    doc_count: field.doc_count() as u64,
                    doc_freq: postings.len() as u64,
                    avg_field_length: field.avg_length(),
                };
                for (&ordinal, &tf) in postings {
                    let length = field.lengths.get(&ordinal).copied().unwrap_or(0);
                    let entry = matches.entry(ordinal).or_insert_with(|| KeywordMatch {
                        ordinal,
                        score: 0.0,
                        matched: BTreeSet::new(),
                    });
                    entry.score += scorer.score(tf, length, &stats);
                    entry.matched.insert(format!("{property}:{term}"));
                }
            }
        }

        matches.into_values().collect()
    }
}
