//! Agent answers and their provenance.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::query::QueryIntent;
use crate::search::ResultSet;

/// A sub-query that ran successfully, with its results.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQueryOutcome {
    pub collection: String,
    pub intent: QueryIntent,
    pub results: ResultSet,
}

/// A collection that contributed hits to an answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub collection: String,
    /// Human-readable form of the sub-query.
    pub sub_query: String,
    pub intent: QueryIntent,
    pub hit_ids: Vec<Uuid>,
}

/// A sub-query, or collection lookup, that failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubQueryFailure {
    pub collection: String,
    pub sub_query: Option<String>,
    pub error: String,
}

impl fmt::Display for SubQueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_query {
            Some(sub_query) => write!(f, "{} ({sub_query}): {}", self.collection, self.error),
            None => write!(f, "{}: {}", self.collection, self.error),
        }
    }
}

/// Work done to produce an answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgentUsage {
    pub planned: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub objects_retrieved: usize,
}

/// The answer to a natural-language question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentAnswer {
    pub question: String,
    pub answer: String,
    pub contributors: Vec<Contribution>,
    /// Diagnostics only; failed sub-queries never contribute.
    pub failures: Vec<SubQueryFailure>,
    pub usage: Option<AgentUsage>,
    pub elapsed: Duration,
}

impl AgentAnswer {
    /// Elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Names of the contributing collections.
    pub fn collections(&self) -> Vec<&str> {
        self.contributors
            .iter()
            .map(|c| c.collection.as_str())
            .collect()
    }
}
