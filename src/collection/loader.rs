//! JSON dataset loading.
//!
//! A dataset file lists collections with their definitions and objects:
//!
//! ```json
//! {
//!   "collections": [
//!     {
//!       "config": { "name": "Articles", "properties": [{"name": "title", "data_kind": "text"}] },
//!       "objects": [{ "properties": { "title": "Hello" } }]
//!     }
//!   ]
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::collection::object::ObjectInput;
use crate::collection::registry::CollectionRegistry;
use crate::collection::schema::CollectionConfig;
use crate::error::Result;

/// One collection of a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetCollection {
    pub config: CollectionConfig,
    #[serde(default)]
    pub objects: Vec<ObjectInput>,
}

/// A set of collections with their objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub collections: Vec<DatasetCollection>,
}

impl Dataset {
    /// Read a dataset from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let dataset = serde_json::from_reader(BufReader::new(file))?;
        Ok(dataset)
    }

    /// Parse a dataset from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Create every collection in `registry` and insert its objects.
    pub fn load_into(self, registry: &CollectionRegistry) -> Result<()> {
        for collection in self.collections {
            let name = collection.config.name.clone();
            registry.create_collection(collection.config)?;
            let count = collection.objects.len();
            registry.insert_objects(&name, collection.objects)?;
            info!("Loaded {count} objects into '{name}'");
        }
        Ok(())
    }

    /// Build a fresh registry holding this dataset.
    pub fn into_registry(self) -> Result<CollectionRegistry> {
        let registry = CollectionRegistry::new();
        self.load_into(&registry)?;
        Ok(registry)
    }
}
