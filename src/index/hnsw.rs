//! HNSW (Hierarchical Navigable Small World) index for approximate vector search.
//!
//! HNSW builds a multi-layer proximity graph where each layer contains a subset
//! of the nodes from the layer below. Search descends greedily from the sparse
//! top layer and widens to `ef` candidates on layer 0.
//!
//! Layer assignment uses a seeded RNG and candidate ties break on the node
//! ordinal, so the same insert sequence always yields the same graph and the
//! same search results.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{HalberdError, Result};
use crate::index::distance::DistanceMetric;
use crate::index::vector::{Neighbor, VectorIndex, brute_force};

/// Configuration for HNSW index construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Maximum number of connections per node in layer 0.
    pub m: usize,
    /// Maximum number of connections per node in higher layers (typically m/2).
    pub m_l: usize,
    /// Multiplier that controls the probability of layer assignment.
    pub ml: f64,
    /// Size of the candidate set during construction.
    pub ef_construction: usize,
    /// Random seed for reproducible layer assignment.
    pub seed: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: 16,
            m_l: 8,
            ml: 1.0 / (2.0_f64.ln()),
            ef_construction: 128,
            seed: 42,
        }
    }
}

impl HnswConfig {
    /// Set the M parameter (connections per node).
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self.m_l = (m / 2).max(1);
        self
    }

    /// Set the ef_construction parameter.
    pub fn with_ef_construction(mut self, ef_construction: usize) -> Self {
        self.ef_construction = ef_construction;
        self
    }

    /// Set the layer assignment seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if self.m == 0 {
            return Err(HalberdError::schema("HNSW m must be > 0"));
        }
        if self.ef_construction < self.m {
            return Err(HalberdError::schema("HNSW ef_construction must be >= m"));
        }
        Ok(())
    }
}

/// A node in the HNSW graph.
#[derive(Debug, Clone)]
struct HnswNode {
    vector: Vec<f32>,
    /// connections[layer] lists the ordinals linked at that layer.
    connections: Vec<Vec<u32>>,
    max_layer: usize,
}

impl HnswNode {
    fn new(vector: Vec<f32>, max_layer: usize) -> Self {
        Self {
            vector,
            connections: vec![Vec::new(); max_layer + 1],
            max_layer,
        }
    }

    fn add_connection(&mut self, layer: usize, ordinal: u32) {
        if let Some(links) = self.connections.get_mut(layer)
            && !links.contains(&ordinal)
        {
            links.push(ordinal);
        }
    }

    fn remove_connection(&mut self, layer: usize, ordinal: u32) {
        if let Some(links) = self.connections.get_mut(layer) {
            links.retain(|&o| o != ordinal);
        }
    }

    fn get_connections(&self, layer: usize) -> &[u32] {
        self.connections
            .get(layer)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Priority queue entry for HNSW search.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SearchCandidate {
    distance: f32,
    ordinal: u32,
}

impl Eq for SearchCandidate {}

impl PartialOrd for SearchCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.ordinal.cmp(&other.ordinal))
    }
}

/// HNSW index implementation for approximate nearest neighbor search.
#[derive(Debug)]
pub struct HnswIndex {
    config: HnswConfig,
    dimension: usize,
    metric: DistanceMetric,
    /// Nodes indexed by ordinal.
    nodes: Vec<Option<HnswNode>>,
    entry_point: Option<u32>,
    max_layer: usize,
    len: usize,
    rng: StdRng,
}

impl HnswIndex {
    /// Create a new HNSW index.
    pub fn new(dimension: usize, metric: DistanceMetric, config: HnswConfig) -> Result<Self> {
        config.validate()?;
        if dimension == 0 {
            return Err(HalberdError::schema("dimension must be > 0"));
        }

        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            dimension,
            metric,
            nodes: Vec::new(),
            entry_point: None,
            max_layer: 0,
            len: 0,
            rng,
        })
    }

    fn node(&self, ordinal: u32) -> Option<&HnswNode> {
        self.nodes.get(ordinal as usize).and_then(Option::as_ref)
    }

    fn max_connections(&self, layer: usize) -> usize {
        if layer == 0 {
            self.config.m
        } else {
            self.config.m_l
        }
    }

    /// Randomly select a layer for a new node using the ml parameter.
    fn select_layer(&mut self) -> usize {
        let uniform_random: f64 = self.rng.random();
        // random() is in [0, 1); keep ln() finite
        let uniform_random = uniform_random.max(f64::MIN_POSITIVE);
        (-uniform_random.ln() * self.config.ml).floor() as usize
    }

    /// Search for the closest nodes to a query within a single layer.
    fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[u32],
        num_closest: usize,
        layer: usize,
    ) -> Vec<SearchCandidate> {
        let mut visited = HashSet::new();
        let mut candidates = BinaryHeap::new(); // min-heap via Reverse
        let mut dynamic_candidates = BinaryHeap::new(); // max-heap, farthest on top

        for &entry in entry_points {
            if let Some(node) = self.node(entry)
                && visited.insert(entry)
            {
                let candidate = SearchCandidate {
                    distance: self.metric.distance(query, &node.vector),
                    ordinal: entry,
                };
                candidates.push(Reverse(candidate));
                dynamic_candidates.push(candidate);
            }
        }

        while let Some(Reverse(current)) = candidates.pop() {
            if let Some(farthest) = dynamic_candidates.peek()
                && current.distance > farthest.distance
                && dynamic_candidates.len() >= num_closest
            {
                break;
            }

            let Some(current_node) = self.node(current.ordinal) else {
                continue;
            };
            for &neighbor in current_node.get_connections(layer) {
                if !visited.insert(neighbor) {
                    continue;
                }
                let Some(neighbor_node) = self.node(neighbor) else {
                    continue;
                };
                let candidate = SearchCandidate {
                    distance: self.metric.distance(query, &neighbor_node.vector),
                    ordinal: neighbor,
                };

                if dynamic_candidates.len() < num_closest {
                    dynamic_candidates.push(candidate);
                    candidates.push(Reverse(candidate));
                } else if let Some(farthest) = dynamic_candidates.peek()
                    && candidate < *farthest
                {
                    dynamic_candidates.pop();
                    dynamic_candidates.push(candidate);
                    candidates.push(Reverse(candidate));
                }
            }
        }

        // into_sorted_vec is ascending, i.e. closest first
        dynamic_candidates.into_sorted_vec()
    }

    /// Greedy descent through the upper layers, returning layer-`floor` entry points.
    fn descend(&self, query: &[f32], entry_point: u32, top: usize, floor: usize) -> Vec<u32> {
        let mut current_closest = vec![entry_point];
        let mut layer = top;
        while layer > floor {
            current_closest = self
                .search_layer(query, &current_closest, 1, layer)
                .into_iter()
                .map(|c| c.ordinal)
                .collect();
            layer -= 1;
        }
        current_closest
    }

    /// Keep only the closest `max_connections` links of a node at a layer.
    fn prune_connections(&mut self, ordinal: u32, layer: usize, max_connections: usize) {
        let Some(node) = self.node(ordinal) else {
            return;
        };
        let links = node.get_connections(layer);
        if links.len() <= max_connections {
            return;
        }

        let mut candidates: Vec<SearchCandidate> = links
            .iter()
            .filter_map(|&neighbor| {
                self.node(neighbor).map(|n| SearchCandidate {
                    distance: self.metric.distance(&node.vector, &n.vector),
                    ordinal: neighbor,
                })
            })
            .collect();
        candidates.sort();
        let kept: Vec<u32> = candidates
            .into_iter()
            .take(max_connections)
            .map(|c| c.ordinal)
            .collect();

        if let Some(Some(node)) = self.nodes.get_mut(ordinal as usize) {
            node.connections[layer] = kept;
        }
    }

    /// Connect a new node to the existing graph, starting from `entry_point`.
    fn connect_new_node(&mut self, ordinal: u32, entry_point: u32, graph_top: usize) {
        let Some(new_node) = self.node(ordinal) else {
            return;
        };
        let vector = new_node.vector.clone();
        let node_layer = new_node.max_layer;

        let mut current_closest = self.descend(&vector, entry_point, graph_top, node_layer);

        for layer in (0..=node_layer.min(graph_top)).rev() {
            let m = self.max_connections(layer);
            let ef = self.config.ef_construction.max(m);

            let candidates = self.search_layer(&vector, &current_closest, ef, layer);
            let selected: Vec<u32> = candidates
                .iter()
                .filter(|c| c.ordinal != ordinal)
                .take(m)
                .map(|c| c.ordinal)
                .collect();

            if let Some(Some(node)) = self.nodes.get_mut(ordinal as usize) {
                for &neighbor in &selected {
                    node.add_connection(layer, neighbor);
                }
            }
            for &neighbor in &selected {
                let over_limit = match self.nodes.get_mut(neighbor as usize) {
                    Some(Some(node)) => {
                        node.add_connection(layer, ordinal);
                        node.get_connections(layer).len() > m
                    }
                    _ => false,
                };
                if over_limit {
                    self.prune_connections(neighbor, layer, m);
                }
            }

            if !candidates.is_empty() {
                current_closest = candidates.iter().map(|c| c.ordinal).collect();
            }
        }
    }

    /// Pick the node with the highest layer (lowest ordinal on ties).
    fn find_new_entry_point(&mut self) {
        self.entry_point = None;
        self.max_layer = 0;

        for (ordinal, node) in self.nodes.iter().enumerate() {
            if let Some(node) = node
                && (self.entry_point.is_none() || node.max_layer > self.max_layer)
            {
                self.max_layer = node.max_layer;
                self.entry_point = Some(ordinal as u32);
            }
        }
    }
}

impl VectorIndex for HnswIndex {
    fn insert(&mut self, ordinal: u32, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(HalberdError::schema(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimension
            )));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(HalberdError::schema(
                "vector contains NaN or infinite values",
            ));
        }

        if self.node(ordinal).is_some() {
            self.remove(ordinal);
        }

        let layer = self.select_layer();
        let slot = ordinal as usize;
        if self.nodes.len() <= slot {
            self.nodes.resize_with(slot + 1, || None);
        }
        self.nodes[slot] = Some(HnswNode::new(vector, layer));
        self.len += 1;

        match self.entry_point {
            None => {
                self.entry_point = Some(ordinal);
                self.max_layer = layer;
            }
            Some(entry_point) => {
                let graph_top = self.max_layer;
                self.connect_new_node(ordinal, entry_point, graph_top);
                if layer > graph_top {
                    self.entry_point = Some(ordinal);
                    self.max_layer = layer;
                }
            }
        }

        Ok(())
    }

    fn remove(&mut self, ordinal: u32) -> bool {
        let Some(node) = self
            .nodes
            .get_mut(ordinal as usize)
            .and_then(Option::take)
        else {
            return false;
        };

        for layer in 0..=node.max_layer {
            for &neighbor in node.get_connections(layer) {
                if let Some(Some(other)) = self.nodes.get_mut(neighbor as usize) {
                    other.remove_connection(layer, ordinal);
                }
            }
        }
        self.len -= 1;

        if self.entry_point == Some(ordinal) {
            self.find_new_entry_point();
        }
        true
    }

    fn search(&self, query: &[f32], k: usize, ef: usize) -> Vec<Neighbor> {
        let Some(entry_point) = self.entry_point else {
            return Vec::new();
        };
        if k == 0 || query.len() != self.dimension {
            return Vec::new();
        }

        let ef = ef.max(k);
        let entry = self.descend(query, entry_point, self.max_layer, 0);

        self.search_layer(query, &entry, ef, 0)
            .into_iter()
            .take(k)
            .map(|c| Neighbor::new(c.ordinal, c.distance))
            .collect()
    }

    fn search_exact(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        brute_force(
            self.metric,
            query,
            k,
            self.nodes
                .iter()
                .enumerate()
                .filter_map(|(o, n)| n.as_ref().map(|n| (o as u32, n.vector.as_slice()))),
        )
    }

    fn len(&self) -> usize {
        self.len
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_index(config: HnswConfig) -> HnswIndex {
        let mut index = HnswIndex::new(2, DistanceMetric::L2Squared, config).unwrap();
        let mut ordinal = 0;
        for x in 0..10 {
            for y in 0..10 {
                index.insert(ordinal, vec![x as f32, y as f32]).unwrap();
                ordinal += 1;
            }
        }
        index
    }

    #[test]
    fn test_hnsw_config() {
        let config = HnswConfig::default().with_m(32);
        assert_eq!(config.m, 32);
        assert_eq!(config.m_l, 16);
        assert!(config.validate().is_ok());

        let config = HnswConfig::default().with_m(64).with_ef_construction(10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_search_finds_nearest() {
        let index = grid_index(HnswConfig::default());
        assert_eq!(index.len(), 100);

        let hits = index.search(&[3.1, 4.2], 3, 64);
        assert_eq!(hits.len(), 3);
        // (3, 4) is ordinal 34
        assert_eq!(hits[0].ordinal, 34);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_matches_exact_search_on_small_graph() {
        let index = grid_index(HnswConfig::default());
        let query = [7.4, 1.6];
        let approx: Vec<u32> = index.search(&query, 5, 100).iter().map(|n| n.ordinal).collect();
        let exact: Vec<u32> = index
            .search_exact(&query, 5)
            .iter()
            .map(|n| n.ordinal)
            .collect();
        assert_eq!(approx, exact);
    }

    #[test]
    fn test_deterministic_with_same_seed() {
        let a = grid_index(HnswConfig::default().with_seed(7));
        let b = grid_index(HnswConfig::default().with_seed(7));
        let query = [5.5, 5.5];
        assert_eq!(a.search(&query, 10, 16), b.search(&query, 10, 16));
    }

    #[test]
    fn test_remove_vector() {
        let mut index = grid_index(HnswConfig::default());
        assert!(index.remove(34));
        assert!(!index.remove(34));
        assert_eq!(index.len(), 99);

        let hits = index.search(&[3.0, 4.0], 1, 64);
        assert_ne!(hits[0].ordinal, 34);
    }

    #[test]
    fn test_remove_entry_point_keeps_index_searchable() {
        let mut index =
            HnswIndex::new(2, DistanceMetric::Cosine, HnswConfig::default()).unwrap();
        index.insert(0, vec![1.0, 0.0]).unwrap();
        index.insert(1, vec![0.0, 1.0]).unwrap();
        let entry = index.entry_point.unwrap();
        index.remove(entry);

        let hits = index.search(&[1.0, 1.0], 5, 10);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_empty_index_and_bad_input() {
        let mut index =
            HnswIndex::new(3, DistanceMetric::Cosine, HnswConfig::default()).unwrap();
        assert!(index.search(&[1.0, 0.0, 0.0], 5, 10).is_empty());
        assert!(index.insert(0, vec![1.0, 0.0]).is_err());
        assert!(index.insert(0, vec![f32::NAN, 0.0, 0.0]).is_err());
    }
}
