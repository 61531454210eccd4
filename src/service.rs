//! Entry point tying the query pipeline together.
//!
//! ```text
//! raw request -> QueryNormalizer -> QueryIntent -> RankingEngine -> ResultAssembler -> ResultSet
//! question    -> QueryNormalizer -> AgentQuery  -> AgentOrchestrator               -> AgentAnswer
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::agent::{AgentAnswer, AgentOrchestrator};
use crate::collection::registry::{CollectionRegistry, CollectionSource};
use crate::config::HalberdConfig;
use crate::error::Result;
use crate::query::{QueryIntent, QueryKind, QueryNormalizer, QueryParams};
use crate::search::{RankingEngine, ResultAssembler, ResultSet};

/// Search and agent queries over a [`CollectionRegistry`].
#[derive(Debug)]
pub struct QueryService {
    registry: Arc<CollectionRegistry>,
    normalizer: QueryNormalizer,
    engine: RankingEngine,
    assembler: ResultAssembler,
    orchestrator: AgentOrchestrator,
    config: HalberdConfig,
}

impl QueryService {
    pub fn new(registry: Arc<CollectionRegistry>, config: HalberdConfig) -> Self {
        let orchestrator = AgentOrchestrator::new(registry.clone(), &config);
        QueryService {
            normalizer: QueryNormalizer::new(&config),
            engine: RankingEngine::from_config(&config.hybrid),
            assembler: ResultAssembler::new(),
            orchestrator,
            registry,
            config,
        }
    }

    /// Replace the agent orchestrator, e.g. to plug in another planner.
    pub fn with_orchestrator(mut self, orchestrator: AgentOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    pub fn registry(&self) -> &Arc<CollectionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &HalberdConfig {
        &self.config
    }

    /// Execute an already-normalized search intent.
    pub fn search(&self, collection: &str, intent: &QueryIntent) -> Result<ResultSet> {
        let started = Instant::now();
        self.normalizer.check_intent(intent)?;
        let handle = self.registry.get_index_handle(collection)?;
        let raw = self.engine.execute(&handle, intent)?;
        let results = self.assembler.assemble(raw, started);
        debug!(
            "{intent} on '{collection}': {} in {:.2}ms",
            results.message,
            results.elapsed_ms()
        );
        Ok(results)
    }

    /// Normalize a raw request against the collection's schema, then search.
    pub fn search_raw(
        &self,
        collection: &str,
        raw_input: &str,
        kind: QueryKind,
        params: &QueryParams,
    ) -> Result<ResultSet> {
        let started = Instant::now();
        let schema = self.registry.get_schema(collection)?;
        let intent = self.normalizer.normalize(raw_input, kind, params, &schema)?;
        let handle = self.registry.get_index_handle(collection)?;
        let raw = self.engine.execute(&handle, &intent)?;
        Ok(self.assembler.assemble(raw, started))
    }

    /// Answer a natural-language question over several collections.
    pub async fn ask_agent(
        &self,
        collections: &[String],
        question: &str,
        system_prompt: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<AgentAnswer> {
        let query =
            self.normalizer
                .normalize_agent(question, collections, system_prompt, timeout_secs)?;
        self.orchestrator.run(&query).await
    }

    /// Like [`ask_agent`](Self::ask_agent), abandoning the request when
    /// `cancel` completes.
    pub async fn ask_agent_with_cancel<C>(
        &self,
        collections: &[String],
        question: &str,
        system_prompt: Option<&str>,
        timeout_secs: Option<u64>,
        cancel: C,
    ) -> Result<AgentAnswer>
    where
        C: Future<Output = ()>,
    {
        let query =
            self.normalizer
                .normalize_agent(question, collections, system_prompt, timeout_secs)?;
        self.orchestrator.run_with_cancel(&query, cancel).await
    }
}
