//! Objects stored in a collection.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::collection::schema::CollectionConfig;
use crate::collection::value::PropertyValue;
use crate::error::{HalberdError, Result};

/// An object as held by a collection index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredObject {
    pub id: Uuid,
    pub properties: BTreeMap<String, PropertyValue>,
    /// One vector per space, keyed by space name.
    #[serde(skip)]
    pub vectors: HashMap<String, Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredObject {
    /// Text fragments of each keyword-searchable property.
    pub fn keyword_texts(&self, config: &CollectionConfig) -> BTreeMap<String, Vec<&str>> {
        config
            .keyword_properties()
            .filter_map(|p| {
                self.properties
                    .get(&p.name)
                    .map(|v| (p.name.clone(), v.texts()))
            })
            .filter(|(_, texts)| !texts.is_empty())
            .collect()
    }
}

/// An object to insert, in the dataset JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectInput {
    pub id: Option<Uuid>,
    pub properties: BTreeMap<String, Value>,
    pub vectors: HashMap<String, Vec<f32>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ObjectInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_vector(mut self, space: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(space.into(), vector);
        self
    }

    /// Validate against the schema and produce the stored form.
    ///
    /// Spaces with a vectorizer embed the object's searchable text when no
    /// vector is given; every other space requires an explicit vector.
    pub fn into_stored(self, config: &CollectionConfig, now: DateTime<Utc>) -> Result<StoredObject> {
        let mut properties = BTreeMap::new();
        for (name, value) in &self.properties {
            let property = config.property(name).ok_or_else(|| {
                HalberdError::schema(format!(
                    "collection '{}' has no property '{name}'",
                    config.name
                ))
            })?;
            if value.is_null() {
                continue;
            }
            properties.insert(name.clone(), PropertyValue::from_json(property, value)?);
        }

        let mut vectors = HashMap::new();
        for (space_name, vector) in self.vectors {
            let space = config.vector_space(&space_name).ok_or_else(|| {
                HalberdError::schema(format!(
                    "collection '{}' has no vector space '{space_name}'",
                    config.name
                ))
            })?;
            if vector.len() != space.dimension {
                return Err(HalberdError::schema(format!(
                    "vector for space '{space_name}' has {} dimensions, expected {}",
                    vector.len(),
                    space.dimension
                )));
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(HalberdError::schema(format!(
                    "vector for space '{space_name}' contains NaN or infinite values"
                )));
            }
            vectors.insert(space_name, vector);
        }

        let mut object = StoredObject {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            properties,
            vectors,
            created_at: self.created_at.unwrap_or(now),
            updated_at: self.updated_at.unwrap_or(now),
        };

        let missing: Vec<_> = config
            .vector_spaces
            .iter()
            .filter(|s| !object.vectors.contains_key(&s.name))
            .collect();
        if let Some(space) = missing.iter().find(|s| !s.vectorizer.is_enabled()) {
            return Err(HalberdError::schema(format!(
                "object {} has no vector for space '{}'",
                object.id, space.name
            )));
        }
        if !missing.is_empty() {
            let text = object
                .keyword_texts(config)
                .into_values()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            for space in missing {
                if let Some(vector) = space.vectorizer.vectorize(&text, space.dimension) {
                    object.vectors.insert(space.name.clone(), vector);
                }
            }
        }

        Ok(object)
    }
}
