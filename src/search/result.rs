//! Search hits and result sets.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collection::value::PropertyValue;

/// What a hit's score measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    /// Vector distance; lower is better.
    Distance,
    /// BM25 relevance; higher is better.
    Bm25,
    /// Hybrid fused score in [0, 1]; higher is better.
    Fused,
}

impl ScoreKind {
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, ScoreKind::Distance)
    }
}

/// Optional per-hit metadata. A field is present only when the producing
/// path computes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certainty: Option<f32>,
    /// BM25 score, raw.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_score: Option<f32>,
    /// Normalized vector component of a fused score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain_score: Option<String>,
}

/// A hit as produced by the ranking engine, before assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub id: Uuid,
    pub score: f32,
    pub kind: ScoreKind,
    pub metadata: HitMetadata,
    pub properties: BTreeMap<String, PropertyValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RawHit {
    /// Whether this hit outranks `other` under its score kind.
    pub fn beats(&self, other: &RawHit) -> bool {
        if self.kind.higher_is_better() {
            self.score > other.score
        } else {
            self.score < other.score
        }
    }
}

/// A ranked, rendered search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub id: Uuid,
    pub score: f32,
    pub score_kind: ScoreKind,
    pub metadata: HitMetadata,
    pub properties: BTreeMap<String, PropertyValue>,
    /// Canonical display text of every property.
    pub rendered: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ordered hits of one search, with timing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub hits: Vec<Hit>,
    pub elapsed: Duration,
    pub message: String,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Elapsed time in milliseconds, with sub-millisecond precision.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Hit ids in rank order.
    pub fn ids(&self) -> Vec<Uuid> {
        self.hits.iter().map(|h| h.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_conversions() {
        let results = ResultSet {
            hits: Vec::new(),
            elapsed: Duration::from_micros(3_250),
            message: "Found 0 results".to_string(),
        };
        assert!((results.elapsed_ms() - 3.25).abs() < 1e-9);
        assert!((results.elapsed_secs() - 0.00325).abs() < 1e-12);
        assert!(results.is_empty());
    }

    #[test]
    fn test_beats_respects_score_kind() {
        let hit = |score, kind| RawHit {
            id: Uuid::nil(),
            score,
            kind,
            metadata: HitMetadata::default(),
            properties: BTreeMap::new(),
            created_at: DateTime::<Utc>::MIN_UTC,
            updated_at: DateTime::<Utc>::MIN_UTC,
        };
        assert!(hit(0.1, ScoreKind::Distance).beats(&hit(0.2, ScoreKind::Distance)));
        assert!(hit(2.0, ScoreKind::Bm25).beats(&hit(1.0, ScoreKind::Bm25)));
        assert!(!hit(0.5, ScoreKind::Fused).beats(&hit(0.5, ScoreKind::Fused)));
    }
}
