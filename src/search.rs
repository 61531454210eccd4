//! Search execution: ranking, hybrid fusion and result assembly.

pub mod assembler;
pub mod engine;
pub mod fusion;
pub mod result;

pub use assembler::ResultAssembler;
pub use engine::RankingEngine;
pub use result::{Hit, HitMetadata, RawHit, ResultSet, ScoreKind};
