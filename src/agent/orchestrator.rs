//! Drives an agent request from question to answer.
//!
//! A request moves through these states:
//!
//! ```text
//! Received -> Planning -> Executing(n) -> Aggregating -> Done
//!                 \             \
//!                  +-------------+--> Failed(reason)
//! ```
//!
//! Sub-queries run on the blocking pool, at most `max_concurrency` at once.
//! The whole run is bounded by the request timeout; on timeout or
//! cancellation, unfinished sub-queries are abandoned and their results
//! discarded.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::agent::answer::{AgentAnswer, AgentUsage, Contribution, SubQueryFailure, SubQueryOutcome};
use crate::agent::planner::{HeuristicPlanner, PlannedQuery, QueryPlanner};
use crate::agent::synthesizer::{AnswerSynthesizer, ExtractiveSynthesizer};
use crate::collection::registry::CollectionSource;
use crate::config::HalberdConfig;
use crate::error::{HalberdError, Result};
use crate::query::{AgentQuery, QueryNormalizer};
use crate::search::{RankingEngine, ResultAssembler, ResultSet};

/// Why an agent request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    NoUsableResults,
    Cancelled,
    /// Planning or synthesis raised an error.
    Internal,
}

/// Lifecycle state of an agent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Received,
    Planning,
    /// Running this many planned sub-queries.
    Executing(usize),
    Aggregating,
    Done,
    Failed(FailureReason),
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentState::Received => write!(f, "received"),
            AgentState::Planning => write!(f, "planning"),
            AgentState::Executing(n) => write!(f, "executing {n} sub-queries"),
            AgentState::Aggregating => write!(f, "aggregating"),
            AgentState::Done => write!(f, "done"),
            AgentState::Failed(reason) => write!(f, "failed ({reason:?})"),
        }
    }
}

/// Callback invoked on every state transition.
pub type TransitionObserver = Arc<dyn Fn(&AgentState) + Send + Sync>;

/// Plans, executes and synthesizes agent requests.
pub struct AgentOrchestrator {
    source: Arc<dyn CollectionSource>,
    engine: Arc<RankingEngine>,
    assembler: ResultAssembler,
    normalizer: Arc<QueryNormalizer>,
    planner: Arc<dyn QueryPlanner>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    permits: Arc<Semaphore>,
    observer: Option<TransitionObserver>,
}

impl fmt::Debug for AgentOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentOrchestrator")
            .field("engine", &self.engine)
            .field("available_permits", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

impl AgentOrchestrator {
    /// Create an orchestrator with the heuristic planner and the extractive
    /// synthesizer.
    pub fn new(source: Arc<dyn CollectionSource>, config: &HalberdConfig) -> Self {
        AgentOrchestrator {
            source,
            engine: Arc::new(RankingEngine::from_config(&config.hybrid)),
            assembler: ResultAssembler::new(),
            normalizer: Arc::new(QueryNormalizer::new(config)),
            planner: Arc::new(HeuristicPlanner::new(
                config.agent.sub_query_limit,
                config.hybrid.default_alpha,
            )),
            synthesizer: Arc::new(ExtractiveSynthesizer::default()),
            permits: Arc::new(Semaphore::new(config.agent.max_concurrency.max(1))),
            observer: None,
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn QueryPlanner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn AnswerSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_observer(mut self, observer: TransitionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Answer a question, bounded by the query's timeout.
    pub async fn run(&self, query: &AgentQuery) -> Result<AgentAnswer> {
        self.run_with_cancel(query, std::future::pending::<()>())
            .await
    }

    /// Like [`run`](Self::run), but abandons the request as soon as `cancel`
    /// completes.
    pub async fn run_with_cancel<C>(&self, query: &AgentQuery, cancel: C) -> Result<AgentAnswer>
    where
        C: Future<Output = ()>,
    {
        let started = Instant::now();
        self.transition(AgentState::Received);
        info!(
            "Agent request over [{}]: {:?}",
            query.collections.join(", "),
            query.question
        );

        tokio::select! {
            biased;
            () = cancel => {
                self.transition(AgentState::Failed(FailureReason::Cancelled));
                Err(HalberdError::cancelled("agent request cancelled by caller"))
            }
            outcome = tokio::time::timeout(query.timeout, self.drive(query, started)) => {
                match outcome {
                    Ok(Ok(answer)) => {
                        self.transition(AgentState::Done);
                        info!(
                            "Agent request answered from {} collection(s) in {:.2}ms",
                            answer.contributors.len(),
                            answer.elapsed_ms()
                        );
                        Ok(answer)
                    }
                    Ok(Err(err)) => {
                        let reason = match &err {
                            HalberdError::NoUsableResults { .. } => FailureReason::NoUsableResults,
                            _ => FailureReason::Internal,
                        };
                        self.transition(AgentState::Failed(reason));
                        Err(err)
                    }
                    Err(_) => {
                        warn!("Agent request timed out after {:?}", query.timeout);
                        self.transition(AgentState::Failed(FailureReason::Timeout));
                        Err(HalberdError::Timeout(query.timeout))
                    }
                }
            }
        }
    }

    async fn drive(&self, query: &AgentQuery, started: Instant) -> Result<AgentAnswer> {
        self.transition(AgentState::Planning);
        let mut failures = Vec::new();
        let mut schemas = Vec::with_capacity(query.collections.len());
        for name in &query.collections {
            match self.source.get_schema(name) {
                Ok(schema) => schemas.push(schema),
                Err(err) => {
                    warn!("Skipping collection '{name}': {err}");
                    failures.push(SubQueryFailure {
                        collection: name.clone(),
                        sub_query: None,
                        error: err.to_string(),
                    });
                }
            }
        }

        let plan = if schemas.is_empty() {
            Vec::new()
        } else {
            self.planner.plan(
                &query.question,
                &schemas,
                query.system_prompt.as_deref(),
            )?
        };
        if plan.is_empty() {
            return Err(no_usable_results(&failures, "no sub-queries were planned"));
        }
        for planned in &plan {
            debug!("Planned on '{}': {}", planned.collection, planned.intent);
        }

        let planned_count = plan.len();
        self.transition(AgentState::Executing(planned_count));
        let mut slots = self.execute_plan(&plan).await;

        let mut outcomes = Vec::with_capacity(plan.len());
        for (position, planned) in plan.into_iter().enumerate() {
            let sub_query = planned.intent.to_string();
            match slots[position].take() {
                Some(Ok(results)) => outcomes.push(SubQueryOutcome {
                    collection: planned.collection,
                    intent: planned.intent,
                    results,
                }),
                Some(Err(err)) => {
                    warn!("Sub-query on '{}' failed: {err}", planned.collection);
                    failures.push(SubQueryFailure {
                        collection: planned.collection,
                        sub_query: Some(sub_query),
                        error: err.to_string(),
                    });
                }
                None => failures.push(SubQueryFailure {
                    collection: planned.collection,
                    sub_query: Some(sub_query),
                    error: "sub-query worker did not complete".to_string(),
                }),
            }
        }
        if outcomes.is_empty() {
            return Err(no_usable_results(&failures, "every sub-query failed"));
        }

        self.transition(AgentState::Aggregating);
        let answer = self.synthesizer.synthesize(
            &query.question,
            query.system_prompt.as_deref(),
            &outcomes,
        )?;

        let usage = AgentUsage {
            planned: planned_count,
            succeeded: outcomes.len(),
            failed: failures.len(),
            objects_retrieved: outcomes.iter().map(|o| o.results.len()).sum(),
        };
        let contributors = outcomes
            .into_iter()
            .filter(|o| !o.results.is_empty())
            .map(|o| Contribution {
                sub_query: o.intent.to_string(),
                hit_ids: o.results.ids(),
                collection: o.collection,
                intent: o.intent,
            })
            .collect();

        Ok(AgentAnswer {
            question: query.question.clone(),
            answer,
            contributors,
            failures,
            usage: Some(usage),
            elapsed: started.elapsed(),
        })
    }

    /// Run every planned sub-query; results come back in plan order.
    async fn execute_plan(&self, plan: &[PlannedQuery]) -> Vec<Option<Result<ResultSet>>> {
        let mut tasks = JoinSet::new();
        for (position, planned) in plan.iter().cloned().enumerate() {
            let source = self.source.clone();
            let engine = self.engine.clone();
            let assembler = self.assembler;
            let normalizer = self.normalizer.clone();
            let permits = self.permits.clone();
            tasks.spawn(async move {
                let outcome: Result<ResultSet> = async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|_| HalberdError::cancelled("agent worker pool closed"))?;
                    tokio::task::spawn_blocking(move || {
                        let started = Instant::now();
                        normalizer.check_intent(&planned.intent)?;
                        let handle = source.get_index_handle(&planned.collection)?;
                        let raw = engine.execute(&handle, &planned.intent)?;
                        Ok::<_, HalberdError>(assembler.assemble(raw, started))
                    })
                    .await
                    .map_err(|err| HalberdError::execution(format!("sub-query worker failed: {err}")))?
                }
                .await;
                (position, outcome)
            });
        }

        let mut slots: Vec<Option<Result<ResultSet>>> = (0..plan.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, outcome)) => slots[position] = Some(outcome),
                Err(err) => warn!("Sub-query task aborted: {err}"),
            }
        }
        slots
    }

    fn transition(&self, state: AgentState) {
        debug!("Agent state: {state}");
        if let Some(observer) = &self.observer {
            observer(&state);
        }
    }
}

fn no_usable_results(failures: &[SubQueryFailure], fallback: &str) -> HalberdError {
    let mut messages: Vec<String> = failures.iter().map(|f| f.to_string()).collect();
    if messages.is_empty() {
        messages.push(fallback.to_string());
    }
    HalberdError::NoUsableResults { failures: messages }
}
