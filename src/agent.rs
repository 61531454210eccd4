//! Agent layer: answers natural-language questions by planning searches over
//! several collections, running them concurrently and synthesizing an answer
//! with provenance.

pub mod answer;
pub mod orchestrator;
pub mod planner;
pub mod synthesizer;

pub use answer::{AgentAnswer, AgentUsage, Contribution, SubQueryFailure, SubQueryOutcome};
pub use orchestrator::{AgentOrchestrator, AgentState, FailureReason, TransitionObserver};
pub use planner::{HeuristicPlanner, PlannedQuery, QueryPlanner};
pub use synthesizer::{AnswerSynthesizer, ExtractiveSynthesizer};
