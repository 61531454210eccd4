//! Flat vector index for exact nearest neighbor search.

use std::collections::BTreeMap;

use crate::error::{HalberdError, Result};
use crate::index::distance::DistanceMetric;
use crate::index::vector::{Neighbor, VectorIndex, brute_force};

/// Flat index that scans every stored vector.
#[derive(Debug)]
pub struct FlatIndex {
    dimension: usize,
    metric: DistanceMetric,
    vectors: BTreeMap<u32, Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        FlatIndex {
            dimension,
            metric,
            vectors: BTreeMap::new(),
        }
    }
}

impl VectorIndex for FlatIndex {
    fn insert(&mut self, ordinal: u32, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(HalberdError::schema(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimension
            )));
        }
        self.vectors.insert(ordinal, vector);
        Ok(())
    }

    fn remove(&mut self, ordinal: u32) -> bool {
        self.vectors.remove(&ordinal).is_some()
    }

    fn search(&self, query: &[f32], k: usize, _ef: usize) -> Vec<Neighbor> {
        self.search_exact(query, k)
    }

    fn search_exact(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        brute_force(
            self.metric,
            query,
            k,
            self.vectors.iter().map(|(o, v)| (*o, v.as_slice())),
        )
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}
