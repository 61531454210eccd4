//! Per-collection storage: objects plus their keyword and vector indexes.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use uuid::Uuid;

use crate::collection::object::StoredObject;
use crate::collection::schema::{CollectionConfig, VectorIndexKind, VectorSpace};
use crate::error::Result;
use crate::index::flat::FlatIndex;
use crate::index::hnsw::HnswIndex;
use crate::index::inverted::InvertedIndex;
use crate::index::vector::{Neighbor, VectorIndex};

/// Availability of a collection index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatus {
    Ready,
    Unavailable { reason: String },
}

/// Build the vector index backing a space.
pub fn build_vector_index(space: &VectorSpace) -> Result<Box<dyn VectorIndex>> {
    Ok(match space.index.kind {
        VectorIndexKind::Hnsw => Box::new(HnswIndex::new(
            space.dimension,
            space.metric,
            space.index.hnsw_config(),
        )?),
        VectorIndexKind::Flat => Box::new(FlatIndex::new(space.dimension, space.metric)),
    })
}

/// Objects of one collection and the indexes over them.
///
/// Every object lives under an ordinal; replacing an object retires its old
/// ordinal and indexes the new version under a fresh one.
#[derive(Debug)]
pub struct CollectionIndex {
    status: IndexStatus,
    objects: Vec<Option<StoredObject>>,
    ordinals: HashMap<Uuid, u32>,
    inverted: InvertedIndex,
    vectors: BTreeMap<String, Box<dyn VectorIndex>>,
}

impl CollectionIndex {
    /// Create empty indexes for a collection definition.
    pub fn new(config: &CollectionConfig) -> Result<Self> {
        let inverted = InvertedIndex::new(
            config
                .keyword_properties()
                .map(|p| (p.name.as_str(), p.tokenization)),
        );
        let vectors = config
            .vector_spaces
            .iter()
            .map(|space| Ok((space.name.clone(), build_vector_index(space)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(CollectionIndex {
            status: IndexStatus::Ready,
            objects: Vec::new(),
            ordinals: HashMap::new(),
            inverted,
            vectors,
        })
    }

    pub fn status(&self) -> &IndexStatus {
        &self.status
    }

    pub fn set_status(&mut self, status: IndexStatus) {
        self.status = status;
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.ordinals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordinals.is_empty()
    }

    /// Get an object by id.
    pub fn get(&self, id: &Uuid) -> Option<&StoredObject> {
        self.ordinals.get(id).and_then(|&o| self.object(o))
    }

    /// Get an object by ordinal.
    pub fn object(&self, ordinal: u32) -> Option<&StoredObject> {
        self.objects.get(ordinal as usize).and_then(Option::as_ref)
    }

    /// Iterate live objects in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = &StoredObject> {
        self.objects.iter().flatten()
    }

    pub fn inverted(&self) -> &InvertedIndex {
        &self.inverted
    }

    pub fn vector_index(&self, space: &str) -> Option<&dyn VectorIndex> {
        self.vectors.get(space).map(|index| index.as_ref())
    }

    /// Insert or replace an object. A replaced object keeps its creation time.
    pub fn upsert(&mut self, mut object: StoredObject, config: &CollectionConfig) -> Result<u32> {
        if let Some(previous) = self.get(&object.id) {
            object.created_at = previous.created_at;
        }

        let ordinal = self.objects.len() as u32;
        for (space, vector) in &object.vectors {
            if let Some(index) = self.vectors.get_mut(space) {
                index.insert(ordinal, vector.clone())?;
            }
        }
        self.remove(&object.id);

        self.inverted
            .add_document(ordinal, &object.keyword_texts(config));
        self.ordinals.insert(object.id, ordinal);
        self.objects.push(Some(object));
        Ok(ordinal)
    }

    /// Remove an object by id.
    pub fn remove(&mut self, id: &Uuid) -> bool {
        let Some(ordinal) = self.ordinals.remove(id) else {
            return false;
        };
        self.inverted.remove_document(ordinal);
        for index in self.vectors.values_mut() {
            index.remove(ordinal);
        }
        if let Some(slot) = self.objects.get_mut(ordinal as usize) {
            *slot = None;
        }
        true
    }

    /// Nearest objects in a space.
    ///
    /// Exhaustive below `flat_search_cutoff` objects, graph search above it.
    pub fn nearest(&self, space: &VectorSpace, query: &[f32], k: usize) -> Vec<Neighbor> {
        let Some(index) = self.vectors.get(&space.name) else {
            return Vec::new();
        };
        if index.len() <= space.index.flat_search_cutoff {
            return index.search_exact(query, k);
        }
        let neighbors = index.search(query, k, space.index.effective_ef(k));
        if neighbors.len() < k.min(index.len()) {
            // Removals can leave nodes unreachable from the entry point.
            debug!(
                "Graph search in '{}' returned {} of {k} neighbors; scanning",
                space.name,
                neighbors.len()
            );
            return index.search_exact(query, k);
        }
        neighbors
    }
}
