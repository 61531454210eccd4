use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use halberd::agent::{
    AgentOrchestrator, AgentState, FailureReason, PlannedQuery, QueryPlanner, TransitionObserver,
};
use halberd::collection::{
    CollectionConfig, CollectionRegistry, CollectionSource, Dataset, IndexHandle, ObjectInput,
    Property, VectorSpace,
};
use halberd::config::HalberdConfig;
use halberd::error::{HalberdError, Result};
use halberd::index::IndexStatus;
use halberd::query::{AgentQuery, KeywordQuery, QueryIntent};
use serde_json::json;
use tokio::sync::oneshot;

const ARTICLES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/articles.json");

fn registry() -> Result<Arc<CollectionRegistry>> {
    let registry = Dataset::from_file(ARTICLES)?.into_registry()?;
    registry.create_collection(
        CollectionConfig::new("Notes")
            .with_property(Property::text("body"))
            .with_vector_space(VectorSpace::new("default", 2)),
    )?;
    registry.insert_objects(
        "Notes",
        vec![
            ObjectInput::new()
                .with_property("body", json!("Weaviate upgrade checklist"))
                .with_vector("default", vec![1.0, 0.0]),
            ObjectInput::new()
                .with_property("body", json!("Lunch order"))
                .with_vector("default", vec![0.0, 1.0]),
        ],
    )?;
    Ok(Arc::new(registry))
}

fn question(collections: &[&str], timeout: Duration) -> AgentQuery {
    AgentQuery {
        question: "What do we know about Weaviate?".to_string(),
        collections: collections.iter().map(|c| c.to_string()).collect(),
        system_prompt: None,
        timeout,
    }
}

fn recorder() -> (TransitionObserver, Arc<Mutex<Vec<AgentState>>>) {
    let states = Arc::new(Mutex::new(Vec::new()));
    let recorded = states.clone();
    let observer: TransitionObserver =
        Arc::new(move |state: &AgentState| recorded.lock().unwrap().push(*state));
    (observer, states)
}

/// Delays every index lookup and tracks how many run at once.
struct SlowSource {
    inner: Arc<CollectionRegistry>,
    delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowSource {
    fn new(inner: Arc<CollectionRegistry>, delay: Duration) -> Self {
        SlowSource {
            inner,
            delay,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

impl CollectionSource for SlowSource {
    fn get_schema(&self, name: &str) -> Result<Arc<CollectionConfig>> {
        self.inner.get_schema(name)
    }

    fn get_index_handle(&self, name: &str) -> Result<IndexHandle> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.inner.get_index_handle(name)
    }

    fn list_collections(&self) -> Vec<String> {
        self.inner.list_collections()
    }
}

#[test]
fn answer_lists_contributing_collections() -> Result<()> {
    let orchestrator = AgentOrchestrator::new(registry()?, &HalberdConfig::default());
    let answer = tokio_test::block_on(
        orchestrator.run(&question(&["Articles", "Notes"], Duration::from_secs(5))),
    )?;

    assert_eq!(answer.collections(), vec!["Articles", "Notes"]);
    assert!(answer.failures.is_empty());
    assert!(answer.answer.starts_with("Found "));
    let articles = &answer.contributors[0];
    assert!(matches!(articles.intent, QueryIntent::Hybrid(_)));
    assert!(!articles.hit_ids.is_empty());
    assert!(matches!(answer.contributors[1].intent, QueryIntent::Keyword(_)));

    let usage = answer.usage.unwrap_or_default();
    assert_eq!(usage.planned, 2);
    assert_eq!(usage.succeeded, 2);
    assert_eq!(usage.failed, 0);
    Ok(())
}

#[tokio::test]
async fn timeout_fails_without_partial_answer() -> Result<()> {
    let source = Arc::new(SlowSource::new(registry()?, Duration::from_millis(500)));
    let (observer, states) = recorder();
    let orchestrator =
        AgentOrchestrator::new(source, &HalberdConfig::default()).with_observer(observer);

    let err = orchestrator
        .run(&question(&["Articles"], Duration::from_millis(50)))
        .await
        .unwrap_err();

    assert!(matches!(err, HalberdError::Timeout(d) if d == Duration::from_millis(50)));
    let states = states.lock().unwrap();
    assert_eq!(
        states.last(),
        Some(&AgentState::Failed(FailureReason::Timeout))
    );
    assert!(!states.contains(&AgentState::Done));
    Ok(())
}

#[tokio::test]
async fn failing_sub_query_is_excluded_from_answer() -> Result<()> {
    let registry = registry()?;
    registry.set_index_status(
        "Notes",
        IndexStatus::Unavailable {
            reason: "compacting".to_string(),
        },
    )?;
    let orchestrator = AgentOrchestrator::new(registry, &HalberdConfig::default());

    let answer = orchestrator
        .run(&question(&["Articles", "Notes"], Duration::from_secs(5)))
        .await?;

    assert_eq!(answer.collections(), vec!["Articles"]);
    assert_eq!(answer.failures.len(), 1);
    let failure = &answer.failures[0];
    assert_eq!(failure.collection, "Notes");
    assert!(failure.sub_query.is_some());
    assert!(failure.error.contains("unavailable"));

    let usage = answer.usage.unwrap_or_default();
    assert_eq!((usage.planned, usage.succeeded, usage.failed), (2, 1, 1));
    Ok(())
}

#[tokio::test]
async fn all_sub_queries_failing_is_no_usable_results() -> Result<()> {
    let registry = registry()?;
    for name in ["Articles", "Notes"] {
        registry.set_index_status(
            name,
            IndexStatus::Unavailable {
                reason: "offline".to_string(),
            },
        )?;
    }
    let (observer, states) = recorder();
    let orchestrator =
        AgentOrchestrator::new(registry, &HalberdConfig::default()).with_observer(observer);

    let err = orchestrator
        .run(&question(&["Articles", "Notes"], Duration::from_secs(5)))
        .await
        .unwrap_err();

    match err {
        HalberdError::NoUsableResults { failures } => assert_eq!(failures.len(), 2),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(
        *states.lock().unwrap(),
        vec![
            AgentState::Received,
            AgentState::Planning,
            AgentState::Executing(2),
            AgentState::Failed(FailureReason::NoUsableResults),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn cancel_abandons_in_flight_work() -> Result<()> {
    let source = Arc::new(SlowSource::new(registry()?, Duration::from_millis(300)));
    let (observer, states) = recorder();
    let orchestrator =
        AgentOrchestrator::new(source, &HalberdConfig::default()).with_observer(observer);

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = cancel_tx.send(());
    });

    let err = orchestrator
        .run_with_cancel(
            &question(&["Articles", "Notes"], Duration::from_secs(5)),
            async {
                let _ = cancel_rx.await;
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, HalberdError::Cancelled(_)));
    assert_eq!(
        states.lock().unwrap().last(),
        Some(&AgentState::Failed(FailureReason::Cancelled))
    );
    Ok(())
}

#[tokio::test]
async fn sub_queries_respect_concurrency_limit() -> Result<()> {
    let source = Arc::new(SlowSource::new(registry()?, Duration::from_millis(20)));
    let mut config = HalberdConfig::default();
    config.agent.max_concurrency = 1;
    let orchestrator = AgentOrchestrator::new(source.clone(), &config);

    let answer = orchestrator
        .run(&question(&["Articles", "Notes"], Duration::from_secs(5)))
        .await?;

    assert_eq!(answer.contributors.len(), 2);
    assert_eq!(source.peak.load(Ordering::SeqCst), 1);
    Ok(())
}

/// Plans the same keyword query in reverse collection order.
struct ReversePlanner;

impl QueryPlanner for ReversePlanner {
    fn plan(
        &self,
        _question: &str,
        collections: &[Arc<CollectionConfig>],
        _system_prompt: Option<&str>,
    ) -> Result<Vec<PlannedQuery>> {
        Ok(collections
            .iter()
            .rev()
            .map(|schema| PlannedQuery {
                collection: schema.name.clone(),
                intent: QueryIntent::Keyword(KeywordQuery {
                    text: "weaviate".to_string(),
                    limit: 2,
                }),
            })
            .collect())
    }
}

#[tokio::test]
async fn contributors_follow_plan_order() -> Result<()> {
    let orchestrator = AgentOrchestrator::new(registry()?, &HalberdConfig::default())
        .with_planner(Arc::new(ReversePlanner));

    let answer = orchestrator
        .run(&question(&["Articles", "Notes"], Duration::from_secs(5)))
        .await?;

    assert_eq!(answer.collections(), vec!["Notes", "Articles"]);
    assert_eq!(answer.contributors[1].hit_ids.len(), 2);
    assert_eq!(answer.contributors[0].sub_query, "keyword \"weaviate\" limit 2");
    Ok(())
}

/// Plans one keyword query per collection with a fixed limit.
struct FixedLimitPlanner(usize);

impl QueryPlanner for FixedLimitPlanner {
    fn plan(
        &self,
        _question: &str,
        collections: &[Arc<CollectionConfig>],
        _system_prompt: Option<&str>,
    ) -> Result<Vec<PlannedQuery>> {
        Ok(collections
            .iter()
            .map(|schema| PlannedQuery {
                collection: schema.name.clone(),
                intent: QueryIntent::Keyword(KeywordQuery {
                    text: "weaviate".to_string(),
                    limit: self.0,
                }),
            })
            .collect())
    }
}

#[tokio::test]
async fn planned_limits_are_validated() -> Result<()> {
    for limit in [0, usize::MAX] {
        let orchestrator = AgentOrchestrator::new(registry()?, &HalberdConfig::default())
            .with_planner(Arc::new(FixedLimitPlanner(limit)));

        let err = orchestrator
            .run(&question(&["Articles", "Notes"], Duration::from_secs(5)))
            .await
            .unwrap_err();

        match err {
            HalberdError::NoUsableResults { failures } => {
                assert_eq!(failures.len(), 2);
                assert!(failures.iter().all(|f| f.contains("limit")), "{failures:?}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
    Ok(())
}
