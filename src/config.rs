//! Library configuration.
//!
//! Configuration is layered with Figment: built-in defaults, then an optional
//! TOML file, then `HALBERD_*` environment variables. Nested keys use `__`
//! as the separator, e.g. `HALBERD_AGENT__MAX_CONCURRENCY=4`.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::{HalberdError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalberdConfig {
    /// Bounds applied by the query normalizer.
    pub query: QueryLimits,
    /// Hybrid fusion settings.
    pub hybrid: HybridConfig,
    /// Agent orchestrator settings.
    pub agent: AgentConfig,
}

/// Bounds for search requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    /// Smallest accepted `limit`.
    pub min_limit: usize,
    /// Largest accepted `limit`.
    pub max_limit: usize,
    /// Limit used when a caller does not pass one.
    pub default_limit: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            min_limit: 1,
            max_limit: 100,
            default_limit: 3,
        }
    }
}

/// Score normalization strategies for combining keyword and vector scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreNormalization {
    /// Min-max normalization to [0, 1] range.
    #[default]
    MinMax,
    /// Z-score normalization, squashed to roughly [0, 1].
    ZScore,
    /// Reciprocal rank, `1 / (60 + rank)`.
    Rank,
}

/// Hybrid search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    /// How each component is put on a common scale before blending.
    pub normalization: ScoreNormalization,
    /// Blend weight used when a caller does not pass one.
    pub default_alpha: f32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            normalization: ScoreNormalization::MinMax,
            default_alpha: 0.5,
        }
    }
}

/// Agent orchestrator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum number of sub-queries executing at once.
    pub max_concurrency: usize,
    /// Timeout used when a caller does not pass one.
    pub default_timeout_secs: u64,
    /// Smallest accepted timeout.
    pub min_timeout_secs: u64,
    /// Largest accepted timeout.
    pub max_timeout_secs: u64,
    /// `limit` given to each planned sub-query.
    pub sub_query_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_concurrency: num_cpus::get().max(1),
            default_timeout_secs: 60,
            min_timeout_secs: 5,
            max_timeout_secs: 300,
            sub_query_limit: 5,
        }
    }
}

impl HalberdConfig {
    /// Load configuration from defaults, an optional TOML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(HalberdConfig::default()));
        if let Some(path) = path {
            if !path.exists() {
                return Err(HalberdError::config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("HALBERD_").split("__"));

        let config: HalberdConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let q = &self.query;
        if q.min_limit == 0 || q.min_limit > q.max_limit {
            return Err(HalberdError::config(format!(
                "query limits must satisfy 1 <= min_limit <= max_limit (got {}..={})",
                q.min_limit, q.max_limit
            )));
        }
        if q.default_limit < q.min_limit || q.default_limit > q.max_limit {
            return Err(HalberdError::config(format!(
                "default_limit {} is outside {}..={}",
                q.default_limit, q.min_limit, q.max_limit
            )));
        }
        if !(0.0..=1.0).contains(&self.hybrid.default_alpha) {
            return Err(HalberdError::config(format!(
                "default_alpha {} must be within 0.0..=1.0",
                self.hybrid.default_alpha
            )));
        }

        let a = &self.agent;
        if a.max_concurrency == 0 {
            return Err(HalberdError::config("agent.max_concurrency must be > 0"));
        }
        if a.min_timeout_secs == 0 || a.min_timeout_secs > a.max_timeout_secs {
            return Err(HalberdError::config(format!(
                "agent timeouts must satisfy 1 <= min <= max (got {}..={})",
                a.min_timeout_secs, a.max_timeout_secs
            )));
        }
        if a.default_timeout_secs < a.min_timeout_secs
            || a.default_timeout_secs > a.max_timeout_secs
        {
            return Err(HalberdError::config(format!(
                "agent.default_timeout_secs {} is outside {}..={}",
                a.default_timeout_secs, a.min_timeout_secs, a.max_timeout_secs
            )));
        }
        if a.sub_query_limit < q.min_limit || a.sub_query_limit > q.max_limit {
            return Err(HalberdError::config(format!(
                "agent.sub_query_limit {} is outside the query limits",
                a.sub_query_limit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = HalberdConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.query.min_limit, 1);
        assert_eq!(config.query.max_limit, 100);
        assert_eq!(config.hybrid.normalization, ScoreNormalization::MinMax);
        assert_eq!(config.agent.default_timeout_secs, 60);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[query]\nmax_limit = 20\n\n[hybrid]\nnormalization = \"z_score\"\n\n[agent]\nmax_concurrency = 2"
        )
        .unwrap();

        let config = HalberdConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.query.max_limit, 20);
        assert_eq!(config.query.min_limit, 1);
        assert_eq!(config.hybrid.normalization, ScoreNormalization::ZScore);
        assert_eq!(config.agent.max_concurrency, 2);
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let result = HalberdConfig::load(Some(Path::new("/nonexistent/halberd.toml")));
        assert!(matches!(result, Err(HalberdError::Config(_))));
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let mut config = HalberdConfig::default();
        config.query.min_limit = 10;
        config.query.max_limit = 5;
        assert!(config.validate().is_err());

        let mut config = HalberdConfig::default();
        config.hybrid.default_alpha = 1.5;
        assert!(config.validate().is_err());
    }
}
