//! Distance metrics for vector spaces.

use serde::{Deserialize, Serialize};

/// Distance metrics for vector similarity calculation.
///
/// Every metric is expressed as a distance: smaller is closer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine distance (1 - cosine similarity), in [0, 2].
    #[default]
    Cosine,
    /// Negated dot product.
    Dot,
    /// Squared Euclidean distance.
    L2Squared,
    /// Manhattan (L1) distance.
    Manhattan,
    /// Number of differing components.
    Hamming,
}

impl DistanceMetric {
    /// Calculate the distance between two vectors of equal length.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());

        match self {
            DistanceMetric::Cosine => {
                // f64 accumulation keeps large finite components from overflowing.
                let (mut dot_product, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
                for (&x, &y) in a.iter().zip(b.iter()) {
                    let (x, y) = (f64::from(x), f64::from(y));
                    dot_product += x * y;
                    norm_a += x * x;
                    norm_b += y * y;
                }

                if norm_a == 0.0 || norm_b == 0.0 {
                    1.0 // Maximum distance for zero vectors
                } else {
                    let similarity = dot_product / (norm_a.sqrt() * norm_b.sqrt());
                    (1.0 - similarity).clamp(0.0, 2.0) as f32
                }
            }
            DistanceMetric::Dot => -a.iter().zip(b.iter()).map(|(x, y)| x * y).sum::<f32>(),
            DistanceMetric::L2Squared => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f32>(),
            DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum(),
            DistanceMetric::Hamming => a.iter().zip(b.iter()).filter(|(x, y)| x != y).count() as f32,
        }
    }

    /// Certainty in [0, 1], a monotonic transform of distance.
    ///
    /// Only defined for cosine distance.
    pub fn certainty(&self, distance: f32) -> Option<f32> {
        match self {
            DistanceMetric::Cosine => Some((1.0 - distance / 2.0).clamp(0.0, 1.0)),
            _ => None,
        }
    }

    /// Get the name of this metric.
    pub fn name(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Dot => "dot",
            DistanceMetric::L2Squared => "l2_squared",
            DistanceMetric::Manhattan => "manhattan",
            DistanceMetric::Hamming => "hamming",
        }
    }
}
