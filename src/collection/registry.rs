//! Registry of named collections.
//!
//! Queries take shared read locks; collection changes and object writes take
//! exclusive locks on only the collection they touch. An [`IndexHandle`]
//! pins the config snapshot current at lookup time, so a reconfiguration
//! applies to queries started after it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use parking_lot::{RwLock, RwLockReadGuard};
use uuid::Uuid;

use crate::collection::object::ObjectInput;
use crate::collection::schema::{CollectionConfig, ConfigUpdate};
use crate::error::{HalberdError, Result};
use crate::index::{CollectionIndex, IndexStatus};

/// Read access to collections, as needed by query execution.
pub trait CollectionSource: Send + Sync {
    /// Current schema of a collection.
    fn get_schema(&self, name: &str) -> Result<Arc<CollectionConfig>>;

    /// Handle for searching a collection.
    fn get_index_handle(&self, name: &str) -> Result<IndexHandle>;

    /// Collection names in ascending order.
    fn list_collections(&self) -> Vec<String>;
}

/// A searchable view of one collection.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    config: Arc<CollectionConfig>,
    index: Arc<RwLock<CollectionIndex>>,
}

impl IndexHandle {
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Config snapshot taken when the handle was created.
    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Shared lock on the collection's objects and indexes.
    pub fn read(&self) -> RwLockReadGuard<'_, CollectionIndex> {
        self.index.read()
    }
}

#[derive(Debug)]
struct Collection {
    config: RwLock<Arc<CollectionConfig>>,
    index: Arc<RwLock<CollectionIndex>>,
}

impl Collection {
    fn handle(&self) -> IndexHandle {
        IndexHandle {
            config: self.config.read().clone(),
            index: self.index.clone(),
        }
    }
}

/// Named collections held in memory.
#[derive(Debug, Default)]
pub struct CollectionRegistry {
    collections: RwLock<BTreeMap<String, Arc<Collection>>>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| HalberdError::collection_not_found(name))
    }

    /// Create a collection. Fails if the name is taken or the definition is invalid.
    pub fn create_collection(&self, config: CollectionConfig) -> Result<()> {
        config.validate()?;
        let index = CollectionIndex::new(&config)?;

        let mut collections = self.collections.write();
        if collections.contains_key(&config.name) {
            return Err(HalberdError::schema(format!(
                "collection '{}' already exists",
                config.name
            )));
        }

        info!(
            "Created collection '{}' ({} properties, {} vector spaces)",
            config.name,
            config.properties.len(),
            config.vector_spaces.len()
        );
        collections.insert(
            config.name.clone(),
            Arc::new(Collection {
                config: RwLock::new(Arc::new(config)),
                index: Arc::new(RwLock::new(index)),
            }),
        );
        Ok(())
    }

    /// Remove a collection. Handles already taken stay usable until dropped.
    pub fn drop_collection(&self, name: &str) -> Result<()> {
        self.collections
            .write()
            .remove(name)
            .ok_or_else(|| HalberdError::collection_not_found(name))?;
        info!("Dropped collection '{name}'");
        Ok(())
    }

    /// Apply a settings update to a collection.
    pub fn reconfigure(&self, name: &str, update: &ConfigUpdate) -> Result<Arc<CollectionConfig>> {
        let collection = self.collection(name)?;
        let mut config = collection.config.write();
        let updated = Arc::new(update.apply(&config)?);
        *config = updated.clone();
        info!("Reconfigured collection '{name}'");
        Ok(updated)
    }

    /// Insert or replace objects. The batch is validated in full before any write.
    pub fn insert_objects(&self, name: &str, objects: Vec<ObjectInput>) -> Result<Vec<Uuid>> {
        let collection = self.collection(name)?;
        let config = collection.config.read().clone();
        let now = Utc::now();
        let stored = objects
            .into_iter()
            .map(|input| input.into_stored(&config, now))
            .collect::<Result<Vec<_>>>()?;

        let mut index = collection.index.write();
        let mut ids = Vec::with_capacity(stored.len());
        for object in stored {
            ids.push(object.id);
            index.upsert(object, &config)?;
        }
        debug!("Inserted {} objects into '{name}'", ids.len());
        Ok(ids)
    }

    /// Delete an object. Returns whether it existed.
    pub fn delete_object(&self, name: &str, id: &Uuid) -> Result<bool> {
        let collection = self.collection(name)?;
        let removed = collection.index.write().remove(id);
        Ok(removed)
    }

    /// Mark a collection's index available or unavailable.
    pub fn set_index_status(&self, name: &str, status: IndexStatus) -> Result<()> {
        let collection = self.collection(name)?;
        info!("Index of '{name}' is now {status:?}");
        collection.index.write().set_status(status);
        Ok(())
    }

    /// Number of live objects in a collection.
    pub fn object_count(&self, name: &str) -> Result<usize> {
        Ok(self.collection(name)?.index.read().len())
    }

    pub fn len(&self) -> usize {
        self.collections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.read().is_empty()
    }
}

impl CollectionSource for CollectionRegistry {
    fn get_schema(&self, name: &str) -> Result<Arc<CollectionConfig>> {
        Ok(self.collection(name)?.config.read().clone())
    }

    fn get_index_handle(&self, name: &str) -> Result<IndexHandle> {
        Ok(self.collection(name)?.handle())
    }

    fn list_collections(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }
}
