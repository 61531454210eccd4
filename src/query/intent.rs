//! Validated query intents.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The kind of search a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Keyword,
    Vector,
    Hybrid,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryKind::Keyword => "keyword",
            QueryKind::Vector => "vector",
            QueryKind::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

/// An embedding aimed at one named vector space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetVector {
    pub space: String,
    pub vector: Vec<f32>,
}

impl TargetVector {
    pub fn new(space: impl Into<String>, vector: Vec<f32>) -> Self {
        TargetVector {
            space: space.into(),
            vector,
        }
    }
}

/// BM25 search over the searchable text properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordQuery {
    pub text: String,
    pub limit: usize,
}

/// Nearest-neighbour search. Several targets join by minimum distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorQuery {
    pub targets: Vec<TargetVector>,
    pub limit: usize,
}

/// Keyword and vector search fused with weight `alpha` on the vector side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridQuery {
    pub text: String,
    pub target: TargetVector,
    pub alpha: f32,
    pub limit: usize,
}

/// A natural-language question over several collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentQuery {
    pub question: String,
    pub collections: Vec<String>,
    pub system_prompt: Option<String>,
    pub timeout: Duration,
}

/// A validated request, ready for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryIntent {
    Keyword(KeywordQuery),
    Vector(VectorQuery),
    Hybrid(HybridQuery),
    Agent(AgentQuery),
}

impl QueryIntent {
    /// Search kind, `None` for agent intents.
    pub fn kind(&self) -> Option<QueryKind> {
        match self {
            QueryIntent::Keyword(_) => Some(QueryKind::Keyword),
            QueryIntent::Vector(_) => Some(QueryKind::Vector),
            QueryIntent::Hybrid(_) => Some(QueryKind::Hybrid),
            QueryIntent::Agent(_) => None,
        }
    }

    /// Requested number of hits, `None` for agent intents.
    pub fn limit(&self) -> Option<usize> {
        match self {
            QueryIntent::Keyword(q) => Some(q.limit),
            QueryIntent::Vector(q) => Some(q.limit),
            QueryIntent::Hybrid(q) => Some(q.limit),
            QueryIntent::Agent(_) => None,
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryIntent::Keyword(q) => write!(f, "keyword {:?} limit {}", q.text, q.limit),
            QueryIntent::Vector(q) => {
                let spaces: Vec<&str> = q.targets.iter().map(|t| t.space.as_str()).collect();
                write!(f, "vector on [{}] limit {}", spaces.join(", "), q.limit)
            }
            QueryIntent::Hybrid(q) => write!(
                f,
                "hybrid {:?} on {} alpha {} limit {}",
                q.text, q.target.space, q.alpha, q.limit
            ),
            QueryIntent::Agent(q) => write!(
                f,
                "agent {:?} over [{}]",
                q.question,
                q.collections.join(", ")
            ),
        }
    }
}

/// Optional request parameters accompanying raw query input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    pub limit: Option<usize>,
    pub alpha: Option<f32>,
    /// Target vector space; implied when the collection has exactly one.
    pub target_space: Option<String>,
    /// Explicit embedding for hybrid queries, in the raw vector syntax.
    pub vector: Option<String>,
}

impl QueryParams {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn with_target_space(mut self, space: impl Into<String>) -> Self {
        self.target_space = Some(space.into());
        self
    }

    pub fn with_vector(mut self, vector: impl Into<String>) -> Self {
        self.vector = Some(vector.into());
        self
    }
}
