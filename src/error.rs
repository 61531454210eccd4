//! Error types for the Halberd library.
//!
//! Every failure is scoped to a single request. Errors fall into four
//! families that callers are expected to treat differently:
//!
//! - [`HalberdError::Validation`]: bad caller input, reported verbatim and never retried.
//! - [`HalberdError::Execution`]: a backend or index fault; the caller may retry.
//! - [`HalberdError::Timeout`]: an agent run exceeded its deadline and its partial work was discarded.
//! - [`HalberdError::NoUsableResults`]: every planned agent sub-query failed.
//!
//! # Examples
//!
//! ```
//! use halberd::error::{HalberdError, Result, ValidationError};
//!
//! fn check(text: &str) -> Result<()> {
//!     if text.trim().is_empty() {
//!         return Err(ValidationError::EmptyQuery.into());
//!     }
//!     Ok(())
//! }
//!
//! match check("   ") {
//!     Err(HalberdError::Validation(ValidationError::EmptyQuery)) => {}
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Invalid caller input detected before any index is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Query text (or agent question) is empty after trimming.
    #[error("query text must not be empty")]
    EmptyQuery,

    /// The vector input could not be parsed into finite floats.
    #[error("malformed vector: {0}")]
    MalformedVector(String),

    /// The vector length disagrees with the target space.
    #[error("vector space '{space}' expects {expected} dimensions, got {actual}")]
    DimensionMismatch {
        space: String,
        expected: usize,
        actual: usize,
    },

    /// `limit` is outside the configured range.
    #[error("limit {limit} is outside the allowed range {min}..={max}")]
    InvalidLimit { limit: usize, min: usize, max: usize },

    /// `alpha` is outside [0.0, 1.0].
    #[error("alpha {0} must be within 0.0..=1.0")]
    InvalidAlpha(f32),

    /// Agent timeout is outside the configured range.
    #[error("timeout of {secs}s is outside the allowed range {min}..={max} seconds")]
    InvalidTimeout { secs: u64, min: u64, max: u64 },

    /// The collection has several vector spaces and none was selected.
    #[error("collection '{collection}' has several vector spaces ({available}); a target space is required")]
    MissingTargetSpace {
        collection: String,
        available: String,
    },

    /// The selected vector space does not exist.
    #[error("collection '{collection}' has no vector space named '{space}'")]
    UnknownTargetSpace { collection: String, space: String },

    /// The collection declares no vector space at all.
    #[error("collection '{0}' has no vector spaces")]
    NoVectorSpace(String),

    /// A hybrid query needs an embedding but none was given and the space has no vectorizer.
    #[error("vector space '{0}' has no vectorizer; supply an explicit vector")]
    MissingVector(String),

    /// An agent question was submitted without collections.
    #[error("at least one collection must be selected")]
    NoCollections,

    /// Agent intents are answered by the orchestrator, not by the ranking engine.
    #[error("agent intents cannot be executed as a search")]
    AgentIntent,
}

/// The main error type for Halberd operations.
#[derive(Error, Debug)]
pub enum HalberdError {
    /// Invalid caller input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Backend or index fault (missing collection, unavailable index).
    #[error("Execution error: {reason}")]
    Execution { reason: String },

    /// The agent run exceeded its deadline.
    #[error("Agent timed out after {0:?}")]
    Timeout(Duration),

    /// Every planned sub-query failed.
    #[error("No usable results: {}", failures.join("; "))]
    NoUsableResults { failures: Vec<String> },

    /// The caller cancelled the request.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Invalid library configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid collection definition or object.
    #[error("Schema error: {0}")]
    Schema(String),

    /// I/O errors (dataset and config files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Layered configuration extraction errors.
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),
}

impl From<figment::Error> for HalberdError {
    fn from(err: figment::Error) -> Self {
        HalberdError::Figment(Box::new(err))
    }
}

/// Result type alias for operations that may fail with HalberdError.
pub type Result<T> = std::result::Result<T, HalberdError>;

impl HalberdError {
    /// Create a new execution error.
    pub fn execution<S: Into<String>>(reason: S) -> Self {
        HalberdError::Execution {
            reason: reason.into(),
        }
    }

    /// Create a new schema error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        HalberdError::Schema(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        HalberdError::Config(msg.into())
    }

    /// Create a "collection not found" execution error.
    pub fn collection_not_found(name: &str) -> Self {
        HalberdError::execution(format!("collection '{name}' not found"))
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        HalberdError::Cancelled(msg.into())
    }

    /// Whether a caller may reasonably retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HalberdError::Execution { .. } | HalberdError::Timeout(_)
        )
    }

    /// The validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            HalberdError::Validation(err) => Some(err),
            _ => None,
        }
    }
}
