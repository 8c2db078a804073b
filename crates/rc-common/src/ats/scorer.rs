use std::future::Future;

use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;

use crate::matching::criteria;
use crate::matching::scoring::score_candidate;
use crate::{Candidate, Requirement};

/// Failure computing a single compatibility score. Carries the provider's
/// message verbatim so batch results can surface it per candidate.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ScoreComputeError(pub String);

/// One computed compatibility score, 0 to 100, plus optional provider
/// detail persisted alongside it.
#[derive(Debug, Clone)]
pub struct AtsEvaluation {
    pub score: f64,
    pub details: Option<Value>,
}

/// Computes one compatibility score for a (requirement, candidate) pair.
///
/// Implementations may call out to an external applicant-tracking system;
/// the bundled [`LocalAtsScorer`] stays in process. The returned future must
/// be `Send` because batch workers run on the shared runtime.
pub trait AtsScorer: Send + Sync + 'static {
    fn score(
        &self,
        requirement: &Requirement,
        candidate: &Candidate,
    ) -> impl Future<Output = Result<AtsEvaluation, ScoreComputeError>> + Send;
}

/// In-process scorer reusing the relevance model over the requirement's
/// normalized criteria. Deterministic for a given pair, so batch retries
/// and re-submissions converge on the same stored score.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAtsScorer;

impl AtsScorer for LocalAtsScorer {
    async fn score(
        &self,
        requirement: &Requirement,
        candidate: &Candidate,
    ) -> Result<AtsEvaluation, ScoreComputeError> {
        let match_criteria = criteria::normalize(requirement);
        let relevance = score_candidate(&match_criteria, candidate, Utc::now());

        Ok(AtsEvaluation {
            score: f64::from(relevance.total),
            details: Some(json!({
                "reasons": relevance.reasons,
                "skills": relevance.skills.points,
                "location": relevance.location.points,
                "experience": relevance.experience.points,
                "salary": relevance.salary.points,
                "education": relevance.education.points,
                "designation": relevance.designation.points,
                "company": relevance.company.points,
                "notice_period": relevance.notice_period.points,
                "profile_quality": relevance.profile_quality.points,
            })),
        })
    }
}
