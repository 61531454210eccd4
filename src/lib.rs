//! # Halberd
//!
//! Query execution for a vector database: keyword (BM25), vector (ANN) and
//! hybrid search over in-memory collections, plus an agent layer that
//! answers natural-language questions across several collections.
//!
//! ## Pipeline
//!
//! - [`query::QueryNormalizer`] validates raw requests into a [`query::QueryIntent`]
//! - [`search::RankingEngine`] runs the intent against a collection's indexes
//! - [`search::ResultAssembler`] deduplicates, renders and times the hits
//! - [`agent::AgentOrchestrator`] plans and runs sub-queries concurrently
//!
//! [`service::QueryService`] ties them together over a
//! [`collection::CollectionRegistry`].

pub mod agent;
pub mod analysis;
pub mod cli;
pub mod collection;
pub mod config;
pub mod error;
pub mod index;
pub mod query;
pub mod search;
pub mod service;

pub mod prelude {
    pub use crate::agent::{AgentAnswer, AgentOrchestrator, AgentState};
    pub use crate::collection::{
        CollectionConfig, CollectionRegistry, CollectionSource, Dataset, ObjectInput, Property,
        VectorSpace, Vectorizer,
    };
    pub use crate::config::HalberdConfig;
    pub use crate::error::{HalberdError, Result, ValidationError};
    pub use crate::query::{QueryIntent, QueryKind, QueryParams};
    pub use crate::search::{Hit, ResultSet};
    pub use crate::service::QueryService;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
