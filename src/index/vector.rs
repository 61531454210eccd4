//! Vector index trait shared by the exact and approximate implementations.

use std::cmp::Ordering;
use std::fmt::Debug;

use crate::error::Result;
use crate::index::distance::DistanceMetric;

/// A candidate returned by a vector index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Ordinal of the object inside its collection index.
    pub ordinal: u32,
    /// Distance to the query under the index metric.
    pub distance: f32,
}

impl Neighbor {
    pub fn new(ordinal: u32, distance: f32) -> Self {
        Neighbor { ordinal, distance }
    }

    /// Closest first, ordinal as tie-break.
    pub fn cmp_by_distance(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.ordinal.cmp(&other.ordinal))
    }
}

/// Trait for vector indexes.
pub trait VectorIndex: Send + Sync + Debug {
    /// Add a vector under the given ordinal.
    fn insert(&mut self, ordinal: u32, vector: Vec<f32>) -> Result<()>;

    /// Remove the vector stored under the ordinal.
    fn remove(&mut self, ordinal: u32) -> bool;

    /// Approximate search for the `k` closest vectors, exploring `ef` candidates.
    fn search(&self, query: &[f32], k: usize, ef: usize) -> Vec<Neighbor>;

    /// Exhaustive search for the `k` closest vectors.
    fn search_exact(&self, query: &[f32], k: usize) -> Vec<Neighbor>;

    /// Number of vectors in the index.
    fn len(&self) -> usize;

    /// Check if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimension.
    fn dimension(&self) -> usize;

    /// Distance metric used by this index.
    fn metric(&self) -> DistanceMetric;
}

/// Exhaustive scan shared by both index kinds.
pub(crate) fn brute_force<'a>(
    metric: DistanceMetric,
    query: &[f32],
    k: usize,
    vectors: impl Iterator<Item = (u32, &'a [f32])>,
) -> Vec<Neighbor> {
    let mut neighbors: Vec<Neighbor> = vectors
        .map(|(ordinal, vector)| Neighbor::new(ordinal, metric.distance(query, vector)))
        .collect();
    neighbors.sort_by(Neighbor::cmp_by_distance);
    neighbors.truncate(k);
    neighbors
}
