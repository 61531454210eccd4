//! In-memory indexes backing each collection.
//!
//! - [`inverted`]: per-property postings for BM25 keyword search
//! - [`hnsw`] and [`flat`]: approximate and exact vector search
//! - [`store`]: the objects of one collection tied to all of its indexes

pub mod bm25;
pub mod distance;
pub mod flat;
pub mod hnsw;
pub mod inverted;
pub mod store;
pub mod vector;

pub use bm25::{Bm25Params, Bm25Scorer};
pub use distance::DistanceMetric;
pub use flat::FlatIndex;
pub use hnsw::{HnswConfig, HnswIndex};
pub use inverted::{InvertedIndex, KeywordMatch};
pub use store::{CollectionIndex, IndexStatus};
pub use vector::{Neighbor, VectorIndex};
