//! Planning: turn a natural-language question into per-collection sub-queries.

use std::sync::Arc;

use crate::analysis::{StopFilter, StopwordConfig, Tokenization, Tokenizer};
use crate::collection::schema::CollectionConfig;
use crate::error::Result;
use crate::query::{HybridQuery, KeywordQuery, QueryIntent, TargetVector};

/// A sub-query aimed at one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedQuery {
    pub collection: String,
    pub intent: QueryIntent,
}

/// Decides which searches answer a question.
pub trait QueryPlanner: Send + Sync {
    /// Plan sub-queries over the given collections. An empty plan means the
    /// question cannot be answered from these collections.
    fn plan(
        &self,
        question: &str,
        collections: &[Arc<CollectionConfig>],
        system_prompt: Option<&str>,
    ) -> Result<Vec<PlannedQuery>>;
}

/// Words that shape a question without carrying its topic.
const QUESTION_WORDS: &[&str] = &[
    "what", "which", "who", "whom", "whose", "when", "where", "why", "how", "does", "do", "did",
    "can", "could", "should", "would", "tell", "me", "about", "show", "find", "list", "give",
    "i", "my", "you", "your", "we", "our", "any", "some", "all", "there", "have", "has",
];

/// One sub-query per collection over the question's content terms.
///
/// Collections whose first vector space has a vectorizer get a hybrid
/// query; the rest get a keyword query. The system prompt is not used.
#[derive(Debug, Clone)]
pub struct HeuristicPlanner {
    limit: usize,
    alpha: f32,
    stop_filter: StopFilter,
}

impl HeuristicPlanner {
    pub fn new(limit: usize, alpha: f32) -> Self {
        let stopwords = StopwordConfig {
            additions: QUESTION_WORDS.iter().map(|w| w.to_string()).collect(),
            ..Default::default()
        };
        HeuristicPlanner {
            limit,
            alpha,
            stop_filter: StopFilter::from_config(&stopwords),
        }
    }

    /// Topic terms of a question, falling back to the whole question.
    pub fn content_terms(&self, question: &str) -> String {
        let terms: Vec<String> = self
            .stop_filter
            .filter(Tokenization::Word.tokenize(question))
            .into_iter()
            .map(|t| t.text)
            .collect();
        if terms.is_empty() {
            question.trim().to_string()
        } else {
            terms.join(" ")
        }
    }
}

impl Default for HeuristicPlanner {
    fn default() -> Self {
        HeuristicPlanner::new(5, 0.5)
    }
}

impl QueryPlanner for HeuristicPlanner {
    fn plan(
        &self,
        question: &str,
        collections: &[Arc<CollectionConfig>],
        _system_prompt: Option<&str>,
    ) -> Result<Vec<PlannedQuery>> {
        let text = self.content_terms(question);
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let plan = collections
            .iter()
            .map(|schema| {
                let embedded = schema.vector_spaces.first().and_then(|space| {
                    space
                        .vectorizer
                        .vectorize(&text, space.dimension)
                        .map(|vector| TargetVector::new(space.name.clone(), vector))
                });
                let intent = match embedded {
                    Some(target) => QueryIntent::Hybrid(HybridQuery {
                        text: text.clone(),
                        target,
                        alpha: self.alpha,
                        limit: self.limit,
                    }),
                    None => QueryIntent::Keyword(KeywordQuery {
                        text: text.clone(),
                        limit: self.limit,
                    }),
                };
                PlannedQuery {
                    collection: schema.name.clone(),
                    intent,
                }
            })
            .collect();
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::schema::{Property, VectorSpace};
    use crate::collection::vectorizer::Vectorizer;

    #[test]
    fn test_content_terms() {
        let planner = HeuristicPlanner::default();
        assert_eq!(
            planner.content_terms("What is the HNSW index in Weaviate?"),
            "hnsw index weaviate"
        );
        assert_eq!(planner.content_terms("Why?"), "Why?");
    }

    #[test]
    fn test_plan_per_collection() {
        let planner = HeuristicPlanner::new(4, 0.5);
        let keyword_only = Arc::new(
            CollectionConfig::new("Notes")
                .with_property(Property::text("body"))
                .with_vector_space(VectorSpace::new("default", 3)),
        );
        let vectorized = Arc::new(
            CollectionConfig::new("Articles")
                .with_property(Property::text("title"))
                .with_vector_space(
                    VectorSpace::new("default", 8).with_vectorizer(Vectorizer::Hashing { seed: 0 }),
                ),
        );

        let plan = planner
            .plan("Tell me about vector search", &[keyword_only, vectorized], None)
            .unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].collection, "Notes");
        assert_eq!(
            plan[0].intent,
            QueryIntent::Keyword(KeywordQuery {
                text: "vector search".to_string(),
                limit: 4
            })
        );
        match &plan[1].intent {
            QueryIntent::Hybrid(q) => {
                assert_eq!(q.text, "vector search");
                assert_eq!(q.alpha, 0.5);
                assert_eq!(q.target.vector.len(), 8);
            }
            other => panic!("unexpected intent {other:?}"),
        }
    }
}
