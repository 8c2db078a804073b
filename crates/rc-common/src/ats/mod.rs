//! Compatibility-score batches: a bounded worker pool computing one ATS
//! score per (requirement, candidate) pair, with per-candidate failure
//! isolation and cancellable batches.

pub mod scheduler;
pub mod scorer;

pub use scheduler::{
    AtsScheduler, BatchSnapshot, BatchState, CandidateScoreOutcome, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_WORKER_COUNT,
};
pub use scorer::{AtsEvaluation, AtsScorer, LocalAtsScorer, ScoreComputeError};

use thiserror::Error;

use crate::db;

#[derive(Debug, Error)]
pub enum AtsError {
    #[error("requirement {0} not found")]
    RequirementNotFound(i64),
    #[error("candidate {0} not found")]
    CandidateNotFound(i64),
    #[error("requirement store unavailable: {0}")]
    RequirementStore(#[from] db::RequirementFetchError),
    #[error("candidate store unavailable: {0}")]
    CandidateStore(#[from] db::CandidateFetchError),
    #[error("failed to persist compatibility score: {0}")]
    ScoreStore(#[from] db::AtsScoreStorageError),
    #[error("compatibility scoring failed: {0}")]
    Scorer(#[from] ScoreComputeError),
}
