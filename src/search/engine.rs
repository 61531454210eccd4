//! Ranking engine: executes keyword, vector and hybrid intents against a
//! collection index.
//!
//! Execution is read-only and all-or-nothing per call. Orderings are total:
//! keyword scores descending, distances ascending, fused scores descending,
//! always with ascending object id as the final tie-break.

use std::collections::HashMap;

use log::{debug, warn};
use uuid::Uuid;

use crate::analysis::StopFilter;
use crate::collection::object::StoredObject;
use crate::collection::registry::IndexHandle;
use crate::collection::schema::CollectionConfig;
use crate::config::{HybridConfig, ScoreNormalization};
use crate::error::{HalberdError, Result, ValidationError};
use crate::index::{Bm25Scorer, CollectionIndex, DistanceMetric, IndexStatus, KeywordMatch};
use crate::query::{HybridQuery, KeywordQuery, QueryIntent, TargetVector, VectorQuery};
use crate::search::fusion::{self, RouteHit};
use crate::search::result::{HitMetadata, RawHit, ScoreKind};

/// A keyword candidate tied to its object.
struct KeywordCandidate<'a> {
    found: KeywordMatch,
    object: &'a StoredObject,
}

/// A vector candidate tied to its object.
struct VectorCandidate<'a> {
    distance: f32,
    metric: DistanceMetric,
    object: &'a StoredObject,
}

/// Executes search intents.
#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    normalization: ScoreNormalization,
}

impl RankingEngine {
    pub fn new(normalization: ScoreNormalization) -> Self {
        RankingEngine { normalization }
    }

    pub fn from_config(config: &HybridConfig) -> Self {
        RankingEngine::new(config.normalization)
    }

    /// Run an intent against one collection.
    pub fn execute(&self, handle: &IndexHandle, intent: &QueryIntent) -> Result<Vec<RawHit>> {
        if let QueryIntent::Agent(_) = intent {
            return Err(ValidationError::AgentIntent.into());
        }

        let config = handle.config();
        let index = handle.read();
        if let IndexStatus::Unavailable { reason } = index.status() {
            warn!("Rejected search on '{}': index unavailable ({reason})", config.name);
            return Err(HalberdError::execution(format!(
                "index of collection '{}' is unavailable: {reason}",
                config.name
            )));
        }

        match intent {
            QueryIntent::Keyword(query) => self.keyword(config, &index, query),
            QueryIntent::Vector(query) => self.vector(config, &index, query),
            QueryIntent::Hybrid(query) => self.hybrid(config, &index, query),
            QueryIntent::Agent(_) => Err(ValidationError::AgentIntent.into()),
        }
    }

    fn keyword(
        &self,
        config: &CollectionConfig,
        index: &CollectionIndex,
        query: &KeywordQuery,
    ) -> Result<Vec<RawHit>> {
        debug!("Keyword search on '{}' for {:?}", config.name, query.text);
        let hits = keyword_candidates(config, index, &query.text, query.limit)
            .into_iter()
            .map(|candidate| {
                let score = candidate.found.score as f32;
                raw_hit(
                    candidate.object,
                    score,
                    ScoreKind::Bm25,
                    HitMetadata {
                        keyword_score: Some(score),
                        explain_score: Some(explain_keyword(&candidate.found)),
                        ..Default::default()
                    },
                )
            })
            .collect();
        Ok(hits)
    }

    fn vector(
        &self,
        config: &CollectionConfig,
        index: &CollectionIndex,
        query: &VectorQuery,
    ) -> Result<Vec<RawHit>> {
        debug!(
            "Vector search on '{}' over {} target(s)",
            config.name,
            query.targets.len()
        );
        let hits = vector_candidates(config, index, &query.targets, query.limit)?
            .into_iter()
            .map(|candidate| {
                raw_hit(
                    candidate.object,
                    candidate.distance,
                    ScoreKind::Distance,
                    HitMetadata {
                        distance: Some(candidate.distance),
                        certainty: candidate.metric.certainty(candidate.distance),
                        ..Default::default()
                    },
                )
            })
            .collect();
        Ok(hits)
    }

    fn hybrid(
        &self,
        config: &CollectionConfig,
        index: &CollectionIndex,
        query: &HybridQuery,
    ) -> Result<Vec<RawHit>> {
        if !(0.0..=1.0).contains(&query.alpha) {
            return Err(ValidationError::InvalidAlpha(query.alpha).into());
        }
        debug!(
            "Hybrid search on '{}' for {:?} with alpha {}",
            config.name, query.text, query.alpha
        );

        let (keyword, vector) = rayon::join(
            || keyword_candidates(config, index, &query.text, query.limit),
            || vector_candidates(config, index, std::slice::from_ref(&query.target), query.limit),
        );
        let vector = vector?;

        let objects: HashMap<Uuid, &StoredObject> = keyword
            .iter()
            .map(|c| (c.object.id, c.object))
            .chain(vector.iter().map(|c| (c.object.id, c.object)))
            .collect();
        let metric = vector.first().map(|c| c.metric);
        let keyword_route: Vec<RouteHit> = keyword
            .iter()
            .map(|c| RouteHit {
                id: c.object.id,
                raw: c.found.score,
            })
            .collect();
        let vector_route: Vec<RouteHit> = vector
            .iter()
            .map(|c| RouteHit {
                id: c.object.id,
                raw: -(c.distance as f64),
            })
            .collect();

        let alpha = query.alpha as f64;
        let fused = fusion::fuse(&keyword_route, &vector_route, alpha, self.normalization);

        let hits = fused
            .into_iter()
            .take(query.limit)
            .filter_map(|hit| {
                let object = objects.get(&hit.id)?;
                let distance = hit.vector.map(|c| (-c.raw) as f32);
                let metadata = HitMetadata {
                    distance,
                    certainty: distance.and_then(|d| metric.and_then(|m| m.certainty(d))),
                    keyword_score: hit.keyword.map(|c| c.raw as f32),
                    vector_score: hit.vector.map(|c| c.normalized as f32),
                    explain_score: Some(explain_hybrid(alpha, &hit)),
                };
                Some(raw_hit(object, hit.score as f32, ScoreKind::Fused, metadata))
            })
            .collect();
        Ok(hits)
    }
}

fn raw_hit(object: &StoredObject, score: f32, kind: ScoreKind, metadata: HitMetadata) -> RawHit {
    RawHit {
        id: object.id,
        score,
        kind,
        metadata,
        properties: object.properties.clone(),
        created_at: object.created_at,
        updated_at: object.updated_at,
    }
}

/// Top `limit` BM25 matches, best first.
fn keyword_candidates<'a>(
    config: &CollectionConfig,
    index: &'a CollectionIndex,
    text: &str,
    limit: usize,
) -> Vec<KeywordCandidate<'a>> {
    let inverted = &config.inverted_index;
    let stop_filter = StopFilter::from_config(&inverted.stopwords);
    let scorer = Bm25Scorer::new(inverted.bm25);

    let mut candidates: Vec<KeywordCandidate<'a>> = index
        .inverted()
        .score(text, &stop_filter, &scorer)
        .into_iter()
        .filter_map(|found| {
            index
                .object(found.ordinal)
                .map(|object| KeywordCandidate { found, object })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.found
            .score
            .total_cmp(&a.found.score)
            .then(a.object.id.cmp(&b.object.id))
    });
    candidates.truncate(limit);
    candidates
}

/// Top `limit` nearest objects over all targets, joined by minimum distance.
fn vector_candidates<'a>(
    config: &CollectionConfig,
    index: &'a CollectionIndex,
    targets: &[TargetVector],
    limit: usize,
) -> Result<Vec<VectorCandidate<'a>>> {
    if targets.is_empty() {
        return Err(ValidationError::MalformedVector("no target vectors given".to_string()).into());
    }

    let mut best: HashMap<u32, (f32, DistanceMetric)> = HashMap::new();
    for target in targets {
        let space = config.vector_space(&target.space).ok_or_else(|| {
            ValidationError::UnknownTargetSpace {
                collection: config.name.clone(),
                space: target.space.clone(),
            }
        })?;
        if target.vector.len() != space.dimension {
            return Err(ValidationError::DimensionMismatch {
                space: space.name.clone(),
                expected: space.dimension,
                actual: target.vector.len(),
            }
            .into());
        }

        for neighbor in index.nearest(space, &target.vector, limit) {
            best.entry(neighbor.ordinal)
                .and_modify(|entry| {
                    if neighbor.distance < entry.0 {
                        *entry = (neighbor.distance, space.metric);
                    }
                })
                .or_insert((neighbor.distance, space.metric));
        }
    }

    let mut candidates: Vec<VectorCandidate<'a>> = best
        .into_iter()
        .filter_map(|(ordinal, (distance, metric))| {
            index.object(ordinal).map(|object| VectorCandidate {
                distance,
                metric,
                object,
            })
        })
        .collect();
    candidates.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.object.id.cmp(&b.object.id))
    });
    candidates.truncate(limit);
    Ok(candidates)
}

fn explain_keyword(found: &KeywordMatch) -> String {
    let terms: Vec<&str> = found.matched.iter().map(String::as_str).collect();
    format!("bm25 {:.6} from [{}]", found.score, terms.join(", "))
}

fn explain_hybrid(alpha: f64, hit: &fusion::FusedHit) -> String {
    let keyword = match hit.keyword {
        Some(c) => format!("keyword bm25 {:.6} -> {:.6}", c.raw, c.normalized),
        None => "keyword absent".to_string(),
    };
    let vector = match hit.vector {
        Some(c) => format!("vector distance {:.6} -> {:.6}", -c.raw, c.normalized),
        None => "vector absent".to_string(),
    };
    format!(
        "hybrid {:.6} = {alpha} * vector + {} * keyword; {keyword}; {vector}",
        hit.score,
        1.0 - alpha
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::collection::registry::{CollectionRegistry, CollectionSource};
    use crate::collection::schema::{Property, VectorIndexConfig, VectorSpace};
    use crate::collection::ObjectInput;
    use crate::query::TargetVector;

    fn registry() -> CollectionRegistry {
        let registry = CollectionRegistry::new();
        registry
            .create_collection(
                CollectionConfig::new("Docs")
                    .with_property(Property::text("title"))
                    .with_vector_space(VectorSpace::new("a", 2))
                    .with_vector_space(VectorSpace::new("b", 2).with_index(VectorIndexConfig {
                        flat_search_cutoff: 0,
                        ..Default::default()
                    })),
            )
            .unwrap();
        let docs = [
            ("rust search engine", [1.0, 0.0], [0.0, 1.0]),
            ("rust compiler", [0.0, 1.0], [1.0, 0.0]),
            ("bread baking", [-1.0, 0.0], [-1.0, 0.0]),
        ];
        let objects = docs
            .iter()
            .map(|(title, a, b)| {
                ObjectInput::new()
                    .with_property("title", json!(title))
                    .with_vector("a", a.to_vec())
                    .with_vector("b", b.to_vec())
            })
            .collect();
        registry.insert_objects("Docs", objects).unwrap();
        registry
    }

    #[test]
    fn test_keyword_path() {
        let registry = registry();
        let handle = registry.get_index_handle("Docs").unwrap();
        let intent = QueryIntent::Keyword(KeywordQuery {
            text: "rust engine".to_string(),
            limit: 10,
        });
        let hits = RankingEngine::default().execute(&handle, &intent).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].properties["title"].canonical_text(), "rust search engine");
        assert!(hits[0].score > hits[1].score);
        assert_eq!(hits[0].kind, ScoreKind::Bm25);
        assert!(hits[0].metadata.explain_score.as_deref().unwrap().contains("title:engine"));
    }

    #[test]
    fn test_multi_target_joins_by_min_distance() {
        let registry = registry();
        let handle = registry.get_index_handle("Docs").unwrap();
        let intent = QueryIntent::Vector(VectorQuery {
            targets: vec![
                TargetVector::new("a", vec![1.0, 0.0]),
                TargetVector::new("b", vec![1.0, 0.0]),
            ],
            limit: 3,
        });
        let hits = RankingEngine::default().execute(&handle, &intent).unwrap();
        assert_eq!(hits.len(), 3);
        // both "rust" docs sit at distance 0 in one of the spaces
        assert_eq!(hits[0].score, 0.0);
        assert_eq!(hits[1].score, 0.0);
        assert!(hits[0].id < hits[1].id);
        assert_eq!(hits[2].properties["title"].canonical_text(), "bread baking");
        assert_eq!(hits[0].metadata.certainty, Some(1.0));
    }

    #[test]
    fn test_agent_intent_is_rejected() {
        let registry = registry();
        let handle = registry.get_index_handle("Docs").unwrap();
        let intent = QueryIntent::Agent(crate::query::AgentQuery {
            question: "q".to_string(),
            collections: vec!["Docs".to_string()],
            system_prompt: None,
            timeout: std::time::Duration::from_secs(5),
        });
        let err = RankingEngine::default().execute(&handle, &intent).unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::AgentIntent));
    }

    #[test]
    fn test_unavailable_index_is_execution_error() {
        let registry = registry();
        registry
            .set_index_status(
                "Docs",
                IndexStatus::Unavailable {
                    reason: "maintenance".to_string(),
                },
            )
            .unwrap();
        let handle = registry.get_index_handle("Docs").unwrap();
        let intent = QueryIntent::Keyword(KeywordQuery {
            text: "rust".to_string(),
            limit: 1,
        });
        let err = RankingEngine::default().execute(&handle, &intent).unwrap_err();
        assert!(matches!(err, HalberdError::Execution { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_hybrid_explains_scores() {
        let registry = registry();
        let handle = registry.get_index_handle("Docs").unwrap();
        let intent = QueryIntent::Hybrid(HybridQuery {
            text: "rust".to_string(),
            target: TargetVector::new("a", vec![0.0, 1.0]),
            alpha: 0.5,
            limit: 3,
        });
        let hits = RankingEngine::default().execute(&handle, &intent).unwrap();
        assert_eq!(hits.len(), 3);
        // "rust compiler" matches the keyword and is the nearest vector
        assert_eq!(hits[0].properties["title"].canonical_text(), "rust compiler");
        assert_eq!(hits[0].kind, ScoreKind::Fused);
        let explain = hits[0].metadata.explain_score.as_deref().unwrap();
        assert!(explain.starts_with("hybrid"));
        assert!(hits[0].metadata.keyword_score.is_some());
        assert!(hits[0].metadata.vector_score.is_some());
    }
}
