//! Turns raw engine hits into a [`ResultSet`].

use std::collections::HashMap;
use std::time::Instant;

use uuid::Uuid;

use crate::search::result::{Hit, RawHit, ResultSet};

/// Deduplicates, renders and times engine output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn new() -> Self {
        ResultAssembler
    }

    /// Build a result set from ranked raw hits.
    ///
    /// A repeated object id keeps its best-scoring occurrence at the rank of
    /// its first appearance. Elapsed time runs from `started` to the end of
    /// assembly.
    pub fn assemble(&self, raw_hits: Vec<RawHit>, started: Instant) -> ResultSet {
        let mut positions: HashMap<Uuid, usize> = HashMap::new();
        let mut unique: Vec<RawHit> = Vec::with_capacity(raw_hits.len());
        for hit in raw_hits {
            match positions.get(&hit.id) {
                Some(&position) => {
                    if hit.beats(&unique[position]) {
                        unique[position] = hit;
                    }
                }
                None => {
                    positions.insert(hit.id, unique.len());
                    unique.push(hit);
                }
            }
        }

        let hits: Vec<Hit> = unique.into_iter().map(render).collect();
        let message = format!("Found {} results", hits.len());
        ResultSet {
            hits,
            elapsed: started.elapsed(),
            message,
        }
    }
}

fn render(raw: RawHit) -> Hit {
    let rendered = raw
        .properties
        .iter()
        .map(|(name, value)| (name.clone(), value.canonical_text()))
        .collect();
    Hit {
        id: raw.id,
        score: raw.score,
        score_kind: raw.kind,
        metadata: raw.metadata,
        properties: raw.properties,
        rendered,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;
    use crate::collection::value::PropertyValue;
    use crate::search::result::{HitMetadata, ScoreKind};

    fn raw(id: u128, score: f32) -> RawHit {
        let nested = PropertyValue::Object(BTreeMap::from([
            ("b".to_string(), PropertyValue::Int(2)),
            ("a".to_string(), PropertyValue::Int(1)),
        ]));
        RawHit {
            id: Uuid::from_u128(id),
            score,
            kind: ScoreKind::Distance,
            metadata: HitMetadata {
                distance: Some(score),
                ..Default::default()
            },
            properties: BTreeMap::from([
                ("title".to_string(), PropertyValue::Text("t".to_string())),
                ("meta".to_string(), nested),
            ]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_dedup_keeps_best_occurrence() {
        let hits = vec![raw(1, 0.3), raw(2, 0.4), raw(1, 0.1)];
        let results = ResultAssembler::new().assemble(hits, Instant::now());
        assert_eq!(results.len(), 2);
        assert_eq!(results.hits[0].id, Uuid::from_u128(1));
        assert_eq!(results.hits[0].score, 0.1);
        assert_eq!(results.message, "Found 2 results");
    }

    #[test]
    fn test_rendering_is_canonical() {
        let results = ResultAssembler::new().assemble(vec![raw(1, 0.0)], Instant::now());
        let rendered = &results.hits[0].rendered;
        assert_eq!(rendered["title"], "t");
        assert_eq!(rendered["meta"], "{\n  \"a\": 1,\n  \"b\": 2\n}");
    }

    #[test]
    fn test_empty_results() {
        let results = ResultAssembler::new().assemble(Vec::new(), Instant::now());
        assert!(results.is_empty());
        assert_eq!(results.message, "Found 0 results");
    }
}
