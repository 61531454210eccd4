//! Query intents and their validation.

pub mod intent;
pub mod normalizer;

pub use intent::{
    AgentQuery, HybridQuery, KeywordQuery, QueryIntent, QueryKind, QueryParams, TargetVector,
    VectorQuery,
};
pub use normalizer::{QueryNormalizer, parse_vector, resolve_space};
