//! Collections: schemas, objects and the registry that holds them.

pub mod loader;
pub mod object;
pub mod registry;
pub mod schema;
pub mod value;
pub mod vectorizer;

pub use loader::{Dataset, DatasetCollection};
pub use object::{ObjectInput, StoredObject};
pub use registry::{CollectionRegistry, CollectionSource, IndexHandle};
pub use schema::{
    CollectionConfig, ConfigUpdate, DataKind, DeletionStrategy, InvertedIndexConfig,
    MultiTenancyConfig, Property, Quantization, ReplicationConfig, VectorIndexConfig,
    VectorIndexKind, VectorIndexUpdate, VectorSpace,
};
pub use value::PropertyValue;
pub use vectorizer::Vectorizer;
