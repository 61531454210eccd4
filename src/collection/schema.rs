//! Collection definitions.
//!
//! A [`CollectionConfig`] is the full schema of a collection: its typed
//! properties, its named vector spaces with their index settings, and the
//! inverted-index, replication and multi-tenancy settings. Configs are plain
//! data and deserialize from the dataset JSON format.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::analysis::{StopwordConfig, Tokenization};
use crate::collection::vectorizer::Vectorizer;
use crate::error::{HalberdError, Result};
use crate::index::{Bm25Params, DistanceMetric, HnswConfig};

/// Data type of a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Text,
    Number,
    Int,
    Boolean,
    Date,
    Uuid,
    /// Reference to an object in another collection.
    Reference { target: String },
    /// Nested object, rendered as canonical JSON.
    Object,
}

impl DataKind {
    pub fn is_text(&self) -> bool {
        matches!(self, DataKind::Text)
    }

    pub fn name(&self) -> &str {
        match self {
            DataKind::Text => "text",
            DataKind::Number => "number",
            DataKind::Int => "int",
            DataKind::Boolean => "boolean",
            DataKind::Date => "date",
            DataKind::Uuid => "uuid",
            DataKind::Reference { target } => target,
            DataKind::Object => "object",
        }
    }
}

fn default_true() -> bool {
    true
}

/// A typed property of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub data_kind: DataKind,
    /// Whether the property holds a list of values.
    #[serde(default)]
    pub array: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether text values take part in keyword search.
    #[serde(default = "default_true")]
    pub searchable: bool,
    #[serde(default)]
    pub tokenization: Tokenization,
}

impl Property {
    pub fn new(name: impl Into<String>, data_kind: DataKind) -> Self {
        Property {
            name: name.into(),
            data_kind,
            array: false,
            description: None,
            searchable: true,
            tokenization: Tokenization::default(),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Property::new(name, DataKind::Text)
    }

    pub fn with_array(mut self, array: bool) -> Self {
        self.array = array;
        self
    }

    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    pub fn with_tokenization(mut self, tokenization: Tokenization) -> Self {
        self.tokenization = tokenization;
        self
    }

    /// Whether this property feeds the inverted index.
    pub fn is_keyword_searchable(&self) -> bool {
        self.searchable && self.data_kind.is_text()
    }

    /// Type name as shown in schema listings, e.g. `text[]`.
    pub fn type_name(&self) -> String {
        if self.array {
            format!("{}[]", self.data_kind.name())
        } else {
            self.data_kind.name().to_string()
        }
    }
}

/// Kind of vector index backing a space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorIndexKind {
    #[default]
    Hnsw,
    Flat,
}

/// Vector compression settings. Recorded and validated; vectors are stored uncompressed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Quantization {
    #[default]
    None,
    /// Product quantization.
    Pq {
        segments: usize,
        #[serde(default = "default_centroids")]
        centroids: usize,
    },
    /// Binary quantization.
    Bq,
    /// Scalar quantization.
    Sq,
}

fn default_centroids() -> usize {
    256
}

/// Vector index settings of one space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexConfig {
    pub kind: VectorIndexKind,
    /// Maximum connections per node on layer 0.
    pub max_connections: usize,
    pub ef_construction: usize,
    /// Fixed search breadth; `None` selects dynamic ef.
    pub ef: Option<usize>,
    pub dynamic_ef_factor: usize,
    pub dynamic_ef_min: usize,
    pub dynamic_ef_max: usize,
    /// Below this many objects, searches scan exhaustively.
    pub flat_search_cutoff: usize,
    pub seed: u64,
    pub quantization: Quantization,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        VectorIndexConfig {
            kind: VectorIndexKind::Hnsw,
            max_connections: 32,
            ef_construction: 128,
            ef: None,
            dynamic_ef_factor: 8,
            dynamic_ef_min: 100,
            dynamic_ef_max: 500,
            flat_search_cutoff: 40_000,
            seed: 42,
            quantization: Quantization::None,
        }
    }
}

impl VectorIndexConfig {
    /// Search breadth for a request of `limit` results.
    pub fn effective_ef(&self, limit: usize) -> usize {
        match self.ef {
            Some(ef) => ef.max(limit),
            None => limit
                .saturating_mul(self.dynamic_ef_factor)
                .clamp(self.dynamic_ef_min, self.dynamic_ef_max)
                .max(limit),
        }
    }

    /// Graph construction parameters.
    pub fn hnsw_config(&self) -> HnswConfig {
        HnswConfig::default()
            .with_m(self.max_connections)
            .with_ef_construction(self.ef_construction)
            .with_seed(self.seed)
    }
}

/// A named vector space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSpace {
    pub name: String,
    pub dimension: usize,
    #[serde(default)]
    pub metric: DistanceMetric,
    #[serde(default)]
    pub index: VectorIndexConfig,
    #[serde(default)]
    pub vectorizer: Vectorizer,
}

impl VectorSpace {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        VectorSpace {
            name: name.into(),
            dimension,
            metric: DistanceMetric::default(),
            index: VectorIndexConfig::default(),
            vectorizer: Vectorizer::default(),
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_index(mut self, index: VectorIndexConfig) -> Self {
        self.index = index;
        self
    }

    pub fn with_vectorizer(mut self, vectorizer: Vectorizer) -> Self {
        self.vectorizer = vectorizer;
        self
    }
}

/// Inverted index settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvertedIndexConfig {
    pub bm25: Bm25Params,
    pub stopwords: StopwordConfig,
}

/// How replicas resolve deletion conflicts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStrategy {
    #[default]
    NoAutomatedResolution,
    DeleteOnConflict,
    TimeBasedResolution,
}

/// Replication settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    pub factor: usize,
    pub async_enabled: bool,
    pub deletion_strategy: DeletionStrategy,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        ReplicationConfig {
            factor: 1,
            async_enabled: false,
            deletion_strategy: DeletionStrategy::default(),
        }
    }
}

/// Multi-tenancy settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiTenancyConfig {
    pub enabled: bool,
    pub auto_tenant_creation: bool,
    pub auto_tenant_activation: bool,
}

/// The schema of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub vector_spaces: Vec<VectorSpace>,
    #[serde(default)]
    pub inverted_index: InvertedIndexConfig,
    #[serde(default)]
    pub replication: ReplicationConfig,
    #[serde(default)]
    pub multi_tenancy: MultiTenancyConfig,
}

impl CollectionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        CollectionConfig {
            name: name.into(),
            description: None,
            properties: Vec::new(),
            vector_spaces: Vec::new(),
            inverted_index: InvertedIndexConfig::default(),
            replication: ReplicationConfig::default(),
            multi_tenancy: MultiTenancyConfig::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_vector_space(mut self, space: VectorSpace) -> Self {
        self.vector_spaces.push(space);
        self
    }

    pub fn with_inverted_index(mut self, inverted_index: InvertedIndexConfig) -> Self {
        self.inverted_index = inverted_index;
        self
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn vector_space(&self, name: &str) -> Option<&VectorSpace> {
        self.vector_spaces.iter().find(|s| s.name == name)
    }

    /// Text properties that feed keyword search.
    pub fn keyword_properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(|p| p.is_keyword_searchable())
    }

    /// Comma-separated space names, for error messages.
    pub fn space_names(&self) -> String {
        self.vector_spaces
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Check the definition for internal consistency.
    pub fn validate(&self) -> Result<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(HalberdError::schema("collection name must not be empty"));
        }
        if !name.starts_with(|c: char| c.is_ascii_alphabetic())
            || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(HalberdError::schema(format!(
                "collection name '{}' must start with a letter and contain only letters, digits and '_'",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for property in &self.properties {
            if property.name.trim().is_empty() {
                return Err(HalberdError::schema(format!(
                    "collection '{}' has a property with an empty name",
                    self.name
                )));
            }
            if !seen.insert(property.name.as_str()) {
                return Err(HalberdError::schema(format!(
                    "collection '{}' declares property '{}' twice",
                    self.name, property.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for space in &self.vector_spaces {
            if !seen.insert(space.name.as_str()) {
                return Err(HalberdError::schema(format!(
                    "collection '{}' declares vector space '{}' twice",
                    self.name, space.name
                )));
            }
            validate_space(&self.name, space)?;
        }

        let bm25 = &self.inverted_index.bm25;
        validate_bm25(&self.name, bm25.k1, bm25.b)?;

        if self.replication.factor == 0 {
            return Err(HalberdError::schema(format!(
                "collection '{}' replication factor must be >= 1",
                self.name
            )));
        }
        Ok(())
    }
}

fn validate_space(collection: &str, space: &VectorSpace) -> Result<()> {
    if space.name.trim().is_empty() {
        return Err(HalberdError::schema(format!(
            "collection '{collection}' has a vector space with an empty name"
        )));
    }
    if space.dimension == 0 {
        return Err(HalberdError::schema(format!(
            "vector space '{}' of '{collection}' must have dimension > 0",
            space.name
        )));
    }

    let index = &space.index;
    if space.index.kind == VectorIndexKind::Hnsw {
        if index.max_connections < 2 {
            return Err(HalberdError::schema(format!(
                "vector space '{}': max_connections must be >= 2",
                space.name
            )));
        }
        index.hnsw_config().validate()?;
    }
    validate_dynamic_ef(&space.name, index)?;
    if let Quantization::Pq { segments, centroids } = index.quantization
        && (segments == 0 || space.dimension % segments != 0 || centroids == 0)
    {
        return Err(HalberdError::schema(format!(
            "vector space '{}': {segments} PQ segments do not divide dimension {}",
            space.name, space.dimension
        )));
    }
    Ok(())
}

fn validate_dynamic_ef(space: &str, index: &VectorIndexConfig) -> Result<()> {
    if index.ef == Some(0) {
        return Err(HalberdError::schema(format!(
            "vector space '{space}': ef must be > 0"
        )));
    }
    if index.dynamic_ef_factor == 0
        || index.dynamic_ef_min == 0
        || index.dynamic_ef_min > index.dynamic_ef_max
    {
        return Err(HalberdError::schema(format!(
            "vector space '{space}': dynamic ef requires factor > 0 and 0 < min <= max"
        )));
    }
    Ok(())
}

fn validate_bm25(collection: &str, k1: f32, b: f32) -> Result<()> {
    if !(k1.is_finite() && k1 >= 0.0) || !(0.0..=1.0).contains(&b) {
        return Err(HalberdError::schema(format!(
            "collection '{collection}': bm25 requires k1 >= 0 and 0 <= b <= 1"
        )));
    }
    Ok(())
}

/// Search-time settings of one vector space that can change after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorIndexUpdate {
    /// `Some(None)` switches back to dynamic ef.
    pub ef: Option<Option<usize>>,
    pub dynamic_ef_factor: Option<usize>,
    pub dynamic_ef_min: Option<usize>,
    pub dynamic_ef_max: Option<usize>,
    pub flat_search_cutoff: Option<usize>,
}

/// Mutable settings of an existing collection.
///
/// Properties, vector dimensions and index kinds are fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub description: Option<String>,
    pub bm25_b: Option<f32>,
    pub bm25_k1: Option<f32>,
    pub stopwords: Option<StopwordConfig>,
    pub vector_index: BTreeMap<String, VectorIndexUpdate>,
    pub replication_async_enabled: Option<bool>,
    pub replication_deletion_strategy: Option<DeletionStrategy>,
    pub auto_tenant_creation: Option<bool>,
    pub auto_tenant_activation: Option<bool>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ConfigUpdate::default()
    }

    /// Produce the updated config, leaving `config` untouched on error.
    pub fn apply(&self, config: &CollectionConfig) -> Result<CollectionConfig> {
        let mut updated = config.clone();

        if let Some(description) = &self.description {
            updated.description = Some(description.clone());
        }
        if let Some(b) = self.bm25_b {
            updated.inverted_index.bm25.b = b;
        }
        if let Some(k1) = self.bm25_k1 {
            updated.inverted_index.bm25.k1 = k1;
        }
        if let Some(stopwords) = &self.stopwords {
            updated.inverted_index.stopwords = stopwords.clone();
        }

        for (space_name, change) in &self.vector_index {
            let space = updated
                .vector_spaces
                .iter_mut()
                .find(|s| &s.name == space_name)
                .ok_or_else(|| {
                    HalberdError::schema(format!(
                        "collection '{}' has no vector space named '{space_name}'",
                        config.name
                    ))
                })?;
            let index = &mut space.index;
            if let Some(ef) = change.ef {
                index.ef = ef;
            }
            if let Some(factor) = change.dynamic_ef_factor {
                index.dynamic_ef_factor = factor;
            }
            if let Some(min) = change.dynamic_ef_min {
                index.dynamic_ef_min = min;
            }
            if let Some(max) = change.dynamic_ef_max {
                index.dynamic_ef_max = max;
            }
            if let Some(cutoff) = change.flat_search_cutoff {
                index.flat_search_cutoff = cutoff;
            }
        }

        if let Some(enabled) = self.replication_async_enabled {
            updated.replication.async_enabled = enabled;
        }
        if let Some(strategy) = self.replication_deletion_strategy {
            updated.replication.deletion_strategy = strategy;
        }

        if self.auto_tenant_creation.is_some() || self.auto_tenant_activation.is_some() {
            if !updated.multi_tenancy.enabled {
                return Err(HalberdError::schema(format!(
                    "collection '{}' does not have multi-tenancy enabled",
                    config.name
                )));
            }
            if let Some(creation) = self.auto_tenant_creation {
                updated.multi_tenancy.auto_tenant_creation = creation;
            }
            if let Some(activation) = self.auto_tenant_activation {
                updated.multi_tenancy.auto_tenant_activation = activation;
            }
        }

        updated.validate()?;
        Ok(updated)
    }
}
