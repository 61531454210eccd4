//! Hybrid score fusion.
//!
//! Each route's scores are normalized over that route's own candidates, then
//! blended as `alpha * vector + (1 - alpha) * keyword`. A candidate found
//! only by a route whose weight is zero is left out, so the boundary alphas
//! reproduce the single-route orderings exactly.

use std::collections::HashMap;

use uuid::Uuid;

use crate::config::ScoreNormalization;

/// A candidate from one route, best first. Higher `raw` is better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteHit {
    pub id: Uuid,
    pub raw: f64,
}

/// A route's contribution to a fused score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Component {
    pub raw: f64,
    pub normalized: f64,
}

/// A fused candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedHit {
    pub id: Uuid,
    pub score: f64,
    pub keyword: Option<Component>,
    pub vector: Option<Component>,
}

/// Put route scores on a common scale. `scores` are in route rank order.
pub fn normalize(scores: &[f64], strategy: ScoreNormalization) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }

    match strategy {
        ScoreNormalization::MinMax => {
            let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
            let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let range = max - min;
            if range > 0.0 {
                scores.iter().map(|s| (s - min) / range).collect()
            } else {
                vec![1.0; scores.len()]
            }
        }
        ScoreNormalization::ZScore => {
            let n = scores.len() as f64;
            let mean = scores.iter().sum::<f64>() / n;
            let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
            let std_dev = variance.sqrt();
            if std_dev > 0.0 {
                // three standard deviations either side map onto [0, 1]
                scores
                    .iter()
                    .map(|s| ((s - mean) / std_dev + 3.0) / 6.0)
                    .collect()
            } else {
                vec![1.0; scores.len()]
            }
        }
        ScoreNormalization::Rank => (0..scores.len())
            .map(|rank| 1.0 / (60.0 + rank as f64 + 1.0))
            .collect(),
    }
}

/// Fuse keyword and vector candidates and order them best first, ties by id.
pub fn fuse(
    keyword: &[RouteHit],
    vector: &[RouteHit],
    alpha: f64,
    strategy: ScoreNormalization,
) -> Vec<FusedHit> {
    let mut fused: HashMap<Uuid, FusedHit> = HashMap::new();

    let mut add_route = |hits: &[RouteHit], weight: f64, is_vector: bool| {
        if weight <= 0.0 {
            return;
        }
        let raw: Vec<f64> = hits.iter().map(|h| h.raw).collect();
        for (hit, normalized) in hits.iter().zip(normalize(&raw, strategy)) {
            let entry = fused.entry(hit.id).or_insert(FusedHit {
                id: hit.id,
                score: 0.0,
                keyword: None,
                vector: None,
            });
            let component = Some(Component {
                raw: hit.raw,
                normalized,
            });
            if is_vector {
                entry.vector = component;
            } else {
                entry.keyword = component;
            }
        }
    };
    add_route(keyword, 1.0 - alpha, false);
    add_route(vector, alpha, true);

    let mut hits: Vec<FusedHit> = fused
        .into_values()
        .map(|mut hit| {
            let k = hit.keyword.map_or(0.0, |c| c.normalized);
            let v = hit.vector.map_or(0.0, |c| c.normalized);
            hit.score = alpha * v + (1.0 - alpha) * k;
            hit
        })
        .collect();

    hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
    hits
}
