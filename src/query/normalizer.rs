//! Turns raw request input into a validated [`QueryIntent`].
//!
//! Validation is strict: out-of-range limits, alphas and timeouts are
//! rejected rather than clamped, and vectors are never truncated or padded.

use std::time::Duration;

use log::debug;

use crate::collection::schema::{CollectionConfig, VectorSpace};
use crate::config::{AgentConfig, HalberdConfig, QueryLimits};
use crate::error::ValidationError;
use crate::query::intent::{
    AgentQuery, HybridQuery, KeywordQuery, QueryIntent, QueryKind, QueryParams, TargetVector,
    VectorQuery,
};

/// Parse a delimited list of floats such as `"[0.1, 0.2,\n 0.3]"`.
///
/// Whitespace is ignored and surrounding brackets are optional. Every
/// component must be a finite number; empty components are rejected.
pub fn parse_vector(input: &str) -> Result<Vec<f32>, ValidationError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let inner = compact
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(&compact);

    if inner.is_empty() {
        return Err(ValidationError::MalformedVector(
            "expected at least one number".to_string(),
        ));
    }

    inner
        .split(',')
        .enumerate()
        .map(|(position, component)| {
            if component.is_empty() {
                return Err(ValidationError::MalformedVector(format!(
                    "empty component at position {position}"
                )));
            }
            match component.parse::<f32>() {
                Ok(value) if value.is_finite() => Ok(value),
                _ => Err(ValidationError::MalformedVector(format!(
                    "'{component}' at position {position} is not a finite number"
                ))),
            }
        })
        .collect()
}

/// Resolve the vector space a vector or hybrid intent targets.
pub fn resolve_space<'a>(
    schema: &'a CollectionConfig,
    requested: Option<&str>,
) -> Result<&'a VectorSpace, ValidationError> {
    match (requested, schema.vector_spaces.as_slice()) {
        (_, []) => Err(ValidationError::NoVectorSpace(schema.name.clone())),
        (Some(name), _) => {
            schema
                .vector_space(name)
                .ok_or_else(|| ValidationError::UnknownTargetSpace {
                    collection: schema.name.clone(),
                    space: name.to_string(),
                })
        }
        (None, [only]) => Ok(only),
        (None, _) => Err(ValidationError::MissingTargetSpace {
            collection: schema.name.clone(),
            available: schema.space_names(),
        }),
    }
}

fn check_dimension(space: &VectorSpace, vector: &[f32]) -> Result<(), ValidationError> {
    if vector.len() != space.dimension {
        return Err(ValidationError::DimensionMismatch {
            space: space.name.clone(),
            expected: space.dimension,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Validates raw requests against the configured bounds and a collection schema.
#[derive(Debug, Clone)]
pub struct QueryNormalizer {
    limits: QueryLimits,
    default_alpha: f32,
    agent: AgentConfig,
}

impl Default for QueryNormalizer {
    fn default() -> Self {
        QueryNormalizer::new(&HalberdConfig::default())
    }
}

impl QueryNormalizer {
    pub fn new(config: &HalberdConfig) -> Self {
        QueryNormalizer {
            limits: config.query.clone(),
            default_alpha: config.hybrid.default_alpha,
            agent: config.agent.clone(),
        }
    }

    /// Normalize a keyword, vector or hybrid request.
    ///
    /// For [`QueryKind::Vector`] the raw input is the vector itself; for the
    /// other kinds it is the query text.
    pub fn normalize(
        &self,
        raw_input: &str,
        kind: QueryKind,
        params: &QueryParams,
        schema: &CollectionConfig,
    ) -> Result<QueryIntent, ValidationError> {
        let limit = self.check_limit(params.limit.unwrap_or(self.limits.default_limit))?;

        let intent = match kind {
            QueryKind::Keyword => QueryIntent::Keyword(KeywordQuery {
                text: non_empty(raw_input)?,
                limit,
            }),
            QueryKind::Vector => {
                let vector = parse_vector(raw_input)?;
                let space = resolve_space(schema, params.target_space.as_deref())?;
                check_dimension(space, &vector)?;
                QueryIntent::Vector(VectorQuery {
                    targets: vec![TargetVector::new(space.name.clone(), vector)],
                    limit,
                })
            }
            QueryKind::Hybrid => {
                let text = non_empty(raw_input)?;
                let alpha = check_alpha(params.alpha.unwrap_or(self.default_alpha))?;
                let space = resolve_space(schema, params.target_space.as_deref())?;
                let vector = match params.vector.as_deref() {
                    Some(raw_vector) => parse_vector(raw_vector)?,
                    None => space
                        .vectorizer
                        .vectorize(&text, space.dimension)
                        .ok_or_else(|| ValidationError::MissingVector(space.name.clone()))?,
                };
                check_dimension(space, &vector)?;
                QueryIntent::Hybrid(HybridQuery {
                    text,
                    target: TargetVector::new(space.name.clone(), vector),
                    alpha,
                    limit,
                })
            }
        };

        debug!("Normalized {kind} request on '{}': {intent}", schema.name);
        Ok(intent)
    }

    /// Normalize an agent request.
    ///
    /// Collection names are trimmed and deduplicated in order; a blank system
    /// prompt counts as absent.
    pub fn normalize_agent(
        &self,
        question: &str,
        collections: &[String],
        system_prompt: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<AgentQuery, ValidationError> {
        let question = non_empty(question)?;

        let mut names: Vec<String> = Vec::new();
        for name in collections.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        if names.is_empty() {
            return Err(ValidationError::NoCollections);
        }

        let secs = timeout_secs.unwrap_or(self.agent.default_timeout_secs);
        if secs < self.agent.min_timeout_secs || secs > self.agent.max_timeout_secs {
            return Err(ValidationError::InvalidTimeout {
                secs,
                min: self.agent.min_timeout_secs,
                max: self.agent.max_timeout_secs,
            });
        }

        let system_prompt = system_prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(AgentQuery {
            question,
            collections: names,
            system_prompt,
            timeout: Duration::from_secs(secs),
        })
    }

    /// Check an already-built search intent, e.g. one produced by a planner.
    pub fn check_intent(&self, intent: &QueryIntent) -> Result<(), ValidationError> {
        match intent.limit() {
            Some(limit) => self.check_limit(limit).map(|_| ()),
            None => Err(ValidationError::AgentIntent),
        }
    }

    /// Check a limit against the configured range.
    pub fn check_limit(&self, limit: usize) -> Result<usize, ValidationError> {
        if limit < self.limits.min_limit || limit > self.limits.max_limit {
            return Err(ValidationError::InvalidLimit {
                limit,
                min: self.limits.min_limit,
                max: self.limits.max_limit,
            });
        }
        Ok(limit)
    }
}

fn non_empty(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    Ok(trimmed.to_string())
}

fn check_alpha(alpha: f32) -> Result<f32, ValidationError> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(ValidationError::InvalidAlpha(alpha));
    }
    Ok(alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::schema::Property;
    use crate::collection::vectorizer::Vectorizer;

    fn single_space() -> CollectionConfig {
        CollectionConfig::new("Articles")
            .with_property(Property::text("title"))
            .with_vector_space(VectorSpace::new("default", 3))
    }

    fn two_spaces() -> CollectionConfig {
        CollectionConfig::new("Products")
            .with_property(Property::text("name"))
            .with_vector_space(VectorSpace::new("text", 3))
            .with_vector_space(
                VectorSpace::new("image", 4).with_vectorizer(Vectorizer::Hashing { seed: 1 }),
            )
    }

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("0.1,0.2,0.3").unwrap(), vec![0.1, 0.2, 0.3]);
        assert_eq!(
            parse_vector(" [0.1,\n 0.2 ,\t0.3] ").unwrap(),
            vec![0.1, 0.2, 0.3]
        );
        assert_eq!(parse_vector("-1e-3").unwrap(), vec![-0.001]);
    }

    #[test]
    fn test_parse_vector_rejects_malformed_input() {
        for input in ["0.1,,0.3", "0.1,0.2,", "", "[]", "  ", "a,b", "0.1;0.2", "NaN", "inf,1"] {
            assert!(
                matches!(parse_vector(input), Err(ValidationError::MalformedVector(_))),
                "{input:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_check_intent() {
        let normalizer = QueryNormalizer::default();
        let keyword = |limit| {
            QueryIntent::Keyword(KeywordQuery {
                text: "weaviate".to_string(),
                limit,
            })
        };
        assert!(normalizer.check_intent(&keyword(10)).is_ok());
        for limit in [0, 101, usize::MAX] {
            assert!(matches!(
                normalizer.check_intent(&keyword(limit)),
                Err(ValidationError::InvalidLimit { .. })
            ));
        }
    }

    #[test]
    fn test_keyword_normalization() {
        let normalizer = QueryNormalizer::default();
        let intent = normalizer
            .normalize("  weaviate  ", QueryKind::Keyword, &QueryParams::default(), &single_space())
            .unwrap();
        assert_eq!(
            intent,
            QueryIntent::Keyword(KeywordQuery {
                text: "weaviate".to_string(),
                limit: 3
            })
        );

        let err = normalizer
            .normalize("   ", QueryKind::Keyword, &QueryParams::default(), &single_space())
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyQuery);
    }

    #[test]
    fn test_limit_bounds() {
        let normalizer = QueryNormalizer::default();
        for limit in [0, 101] {
            let err = normalizer
                .normalize(
                    "q",
                    QueryKind::Keyword,
                    &QueryParams::default().with_limit(limit),
                    &single_space(),
                )
                .unwrap_err();
            assert_eq!(
                err,
                ValidationError::InvalidLimit {
                    limit,
                    min: 1,
                    max: 100
                }
            );
        }
        assert!(
            normalizer
                .normalize("q", QueryKind::Keyword, &QueryParams::default().with_limit(100), &single_space())
                .is_ok()
        );
    }

    #[test]
    fn test_vector_dimension_mismatch() {
        let normalizer = QueryNormalizer::default();
        let err = normalizer
            .normalize("0.1,0.2", QueryKind::Vector, &QueryParams::default(), &single_space())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::DimensionMismatch {
                space: "default".to_string(),
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_target_space_selection() {
        let normalizer = QueryNormalizer::default();
        let params = QueryParams::default();

        let err = normalizer
            .normalize("1,2,3", QueryKind::Vector, &params, &two_spaces())
            .unwrap_err();
        assert!(matches!(err, ValidationError::MissingTargetSpace { .. }));

        let err = normalizer
            .normalize(
                "1,2,3",
                QueryKind::Vector,
                &QueryParams::default().with_target_space("audio"),
                &two_spaces(),
            )
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownTargetSpace { .. }));

        let intent = normalizer
            .normalize(
                "1,2,3",
                QueryKind::Vector,
                &QueryParams::default().with_target_space("text"),
                &two_spaces(),
            )
            .unwrap();
        match intent {
            QueryIntent::Vector(q) => assert_eq!(q.targets[0].space, "text"),
            other => panic!("unexpected intent {other:?}"),
        }

        let err = normalizer
            .normalize("1", QueryKind::Vector, &params, &CollectionConfig::new("Bare"))
            .unwrap_err();
        assert_eq!(err, ValidationError::NoVectorSpace("Bare".to_string()));
    }

    #[test]
    fn test_hybrid_normalization() {
        let normalizer = QueryNormalizer::default();

        // explicit vector
        let intent = normalizer
            .normalize(
                "rust",
                QueryKind::Hybrid,
                &QueryParams::default().with_vector("1,0,0").with_alpha(0.25),
                &single_space(),
            )
            .unwrap();
        match intent {
            QueryIntent::Hybrid(q) => {
                assert_eq!(q.alpha, 0.25);
                assert_eq!(q.target.vector, vec![1.0, 0.0, 0.0]);
            }
            other => panic!("unexpected intent {other:?}"),
        }

        // no vectorizer, no vector
        let err = normalizer
            .normalize("rust", QueryKind::Hybrid, &QueryParams::default(), &single_space())
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingVector("default".to_string()));

        // vectorizer fills the embedding, default alpha applies
        let intent = normalizer
            .normalize(
                "rust",
                QueryKind::Hybrid,
                &QueryParams::default().with_target_space("image"),
                &two_spaces(),
            )
            .unwrap();
        match intent {
            QueryIntent::Hybrid(q) => {
                assert_eq!(q.alpha, 0.5);
                assert_eq!(q.target.vector.len(), 4);
            }
            other => panic!("unexpected intent {other:?}"),
        }
    }

    #[test]
    fn test_alpha_bounds() {
        let normalizer = QueryNormalizer::default();
        for alpha in [-0.1, 1.1, f32::NAN] {
            let err = normalizer
                .normalize(
                    "rust",
                    QueryKind::Hybrid,
                    &QueryParams::default().with_vector("1,0,0").with_alpha(alpha),
                    &single_space(),
                )
                .unwrap_err();
            assert!(matches!(err, ValidationError::InvalidAlpha(_)));
        }
    }

    #[test]
    fn test_agent_normalization() {
        let normalizer = QueryNormalizer::default();
        let collections = vec![" Articles ".to_string(), "Authors".to_string(), "Articles".to_string()];

        let query = normalizer
            .normalize_agent("What is HNSW?", &collections, Some("   "), None)
            .unwrap();
        assert_eq!(query.collections, vec!["Articles", "Authors"]);
        assert_eq!(query.system_prompt, None);
        assert_eq!(query.timeout, Duration::from_secs(60));

        assert_eq!(
            normalizer.normalize_agent(" ", &collections, None, None),
            Err(ValidationError::EmptyQuery)
        );
        assert_eq!(
            normalizer.normalize_agent("q", &[], None, None),
            Err(ValidationError::NoCollections)
        );
        assert_eq!(
            normalizer.normalize_agent("q", &collections, None, Some(4)),
            Err(ValidationError::InvalidTimeout {
                secs: 4,
                min: 5,
                max: 300
            })
        );
        assert!(normalizer.normalize_agent("q", &collections, None, Some(300)).is_ok());
    }
}
