//! Wire DTOs for the matching service plus the environment-backed engine
//! configuration. Handlers translate core results into these shapes; core
//! modules never serialize themselves onto the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ats::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKER_COUNT};
use crate::matching::engine::{MatchOutcome, ScoredCandidate, DEFAULT_SCAN_CAP};
use crate::matching::predicate::ClauseName;
use crate::matching::scoring::{CriterionScore, RelevanceScore};

/// One candidate row on the wire: a profile projection, the explainable
/// relevance block, and per-viewer decoration the handler merges in.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedCandidate {
    pub id: i64,
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub designation: Option<String>,
    pub current_location: Option<String>,
    pub experience_years: Option<f64>,
    pub expected_salary: Option<f64>,
    pub notice_period_days: Option<i32>,
    pub skills: Vec<String>,
    pub key_skills: Vec<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub relevance: RelevanceDto,
    /// Compatibility score already stored for this requirement, if any.
    pub ats_score: Option<f64>,
    /// Whether the requesting viewer has seen this candidate before.
    pub viewed: bool,
    /// Requirement ids under which the viewer saw the candidate.
    pub viewed_for: Vec<i64>,
}

impl MatchedCandidate {
    /// Projects a scored engine row. Viewer decoration starts blank; the
    /// handler fills it from the view and score stores.
    pub fn from_scored(scored: &ScoredCandidate) -> Self {
        let candidate = &scored.candidate;
        Self {
            id: candidate.id,
            full_name: candidate.full_name.clone(),
            headline: candidate.headline.clone(),
            designation: candidate.designation.clone(),
            current_location: candidate.current_location.clone(),
            experience_years: candidate.experience_years,
            expected_salary: candidate.expected_salary,
            notice_period_days: candidate.notice_period_days,
            skills: candidate.skills.clone(),
            key_skills: candidate.key_skills.clone(),
            last_login_at: candidate.last_login_at,
            relevance: RelevanceDto::from(&scored.relevance),
            ats_score: None,
            viewed: false,
            viewed_for: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RelevanceDto {
    pub total: i32,
    pub reasons: Vec<String>,
    pub breakdown: Vec<CriterionDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CriterionDto {
    pub name: &'static str,
    pub points: f64,
    pub max_points: f64,
    pub status: &'static str,
    pub reason: Option<String>,
}

impl CriterionDto {
    fn new(name: &'static str, score: &CriterionScore) -> Self {
        Self {
            name,
            points: score.points,
            max_points: score.max_points,
            status: score.status,
            reason: score.reason.clone(),
        }
    }
}

impl From<&RelevanceScore> for RelevanceDto {
    fn from(score: &RelevanceScore) -> Self {
        Self {
            total: score.total,
            reasons: score.reasons.clone(),
            breakdown: vec![
                CriterionDto::new("skills", &score.skills),
                CriterionDto::new("location", &score.location),
                CriterionDto::new("experience", &score.experience),
                CriterionDto::new("salary", &score.salary),
                CriterionDto::new("education", &score.education),
                CriterionDto::new("designation", &score.designation),
                CriterionDto::new("company", &score.company),
                CriterionDto::new("notice_period", &score.notice_period),
                CriterionDto::new("profile_quality", &score.profile_quality),
            ],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CandidateListResponse {
    pub requirement_id: i64,
    pub page: u32,
    pub page_size: u32,
    /// Post-filtered total across every page, identical to the stats total.
    pub total: usize,
    pub fallback_applied: bool,
    pub applied_filters: Vec<ClauseName>,
    pub skipped_filters: Vec<ClauseName>,
    /// Set when the viewer's quota ran out. Results are still complete;
    /// exhaustion never discards a computed match.
    pub quota_exceeded: bool,
    pub candidates: Vec<MatchedCandidate>,
}

impl CandidateListResponse {
    pub fn from_outcome(
        requirement_id: i64,
        page: u32,
        page_size: u32,
        outcome: &MatchOutcome,
    ) -> Self {
        Self {
            requirement_id,
            page,
            page_size,
            total: outcome.total,
            fallback_applied: outcome.fallback_applied,
            applied_filters: outcome.applied_filters.clone(),
            skipped_filters: outcome.skipped_filters.clone(),
            quota_exceeded: false,
            candidates: outcome
                .candidates
                .iter()
                .map(MatchedCandidate::from_scored)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsResponse {
    pub requirement_id: i64,
    /// Total matching candidates, same pipeline as the candidates endpoint.
    pub total: usize,
    /// Distinct candidates the viewer already saw under this requirement.
    pub accessed: i64,
    pub fallback_applied: bool,
}

/// Batch submission body: an explicit id list, or a page descriptor the
/// service resolves against the matcher. Exactly one should be present;
/// ids win when both are.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSubmitRequest {
    #[serde(default)]
    pub candidate_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub page: Option<PageDescriptor>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageDescriptor {
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize)]
pub struct SingleScoreResponse {
    pub requirement_id: i64,
    pub candidate_id: i64,
    pub score: f64,
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewResponse {
    pub viewer_id: i64,
    pub candidate_id: i64,
    /// Full requirement set after the extend, not just the one recorded now.
    pub requirement_ids: Vec<i64>,
    pub quota_exceeded: bool,
}

/// Engine tunables, read from the environment once at startup and shared
/// through application state.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Rows fetched per predicate execution before in-memory ranking.
    pub scan_cap: i64,
    /// Allow a strong requirement title to stand in for a skill clause.
    pub title_substitute: bool,
    pub ats_worker_count: usize,
    pub ats_queue_capacity: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            scan_cap: DEFAULT_SCAN_CAP,
            title_substitute: true,
            ats_worker_count: DEFAULT_WORKER_COUNT,
            ats_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl MatchConfig {
    pub fn from_env() -> Self {
        Self {
            scan_cap: env_parse("RC_SCAN_CAP", DEFAULT_SCAN_CAP),
            title_substitute: env_flag("RC_TITLE_SUBSTITUTE", true),
            ats_worker_count: env_parse("RC_ATS_WORKERS", DEFAULT_WORKER_COUNT),
            ats_queue_capacity: env_parse("RC_ATS_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => !(value == "0" || value.eq_ignore_ascii_case("false")),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::Candidate;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_envs<F: FnOnce()>(vars: &[(&str, Option<&str>)], f: F) {
        let guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous: Vec<(String, Option<String>)> = vars
            .iter()
            .map(|(name, _)| ((*name).to_string(), std::env::var(*name).ok()))
            .collect();
        for (name, value) in vars {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }

        f();

        for (name, value) in previous {
            match value {
                Some(value) => std::env::set_var(&name, value),
                None => std::env::remove_var(&name),
            }
        }
        drop(guard);
    }

    fn scored_fixture() -> ScoredCandidate {
        let candidate = Candidate {
            id: 9,
            full_name: Some("Asha Rao".into()),
            skills: vec!["React".into()],
            ..Candidate::default()
        };
        let relevance = RelevanceScore {
            total: 72,
            reasons: vec!["1/1 required skills matched: React".into()],
            skills: CriterionScore {
                points: 35.0,
                max_points: 35.0,
                status: "PERFECT_MATCH",
                reason: Some("1/1 required skills matched: React".into()),
            },
            location: blank(),
            experience: blank(),
            salary: blank(),
            education: blank(),
            designation: blank(),
            company: blank(),
            notice_period: blank(),
            profile_quality: blank(),
        };
        ScoredCandidate {
            candidate,
            relevance,
        }
    }

    fn blank() -> CriterionScore {
        CriterionScore {
            points: 0.0,
            max_points: 0.0,
            status: "NOT_SPECIFIED",
            reason: None,
        }
    }

    #[test]
    fn matched_candidate_carries_the_relevance_block() {
        let dto = MatchedCandidate::from_scored(&scored_fixture());

        assert_eq!(dto.id, 9);
        assert_eq!(dto.relevance.total, 72);
        assert_eq!(dto.relevance.breakdown.len(), 9);
        assert!(!dto.viewed);
        assert_eq!(dto.ats_score, None);
    }

    #[test]
    fn list_response_serializes_clause_names_snake_case() {
        let outcome = MatchOutcome {
            candidates: vec![scored_fixture()],
            total: 1,
            fallback_applied: true,
            applied_filters: vec![ClauseName::Skills, ClauseName::NoticePeriod],
            skipped_filters: vec![ClauseName::Experience],
        };

        let response = CandidateListResponse::from_outcome(12, 1, 20, &outcome);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(
            json["applied_filters"],
            serde_json::json!(["skills", "notice_period"])
        );
        assert_eq!(json["skipped_filters"], serde_json::json!(["experience"]));
        assert_eq!(json["quota_exceeded"], serde_json::json!(false));
    }

    #[test]
    fn batch_request_accepts_ids_or_a_page() {
        let by_ids: BatchSubmitRequest =
            serde_json::from_value(serde_json::json!({"candidate_ids": [4, 5]})).unwrap();
        assert_eq!(by_ids.candidate_ids, Some(vec![4, 5]));
        assert!(by_ids.page.is_none());

        let by_page: BatchSubmitRequest =
            serde_json::from_value(serde_json::json!({"page": {"page": 2}})).unwrap();
        let page = by_page.page.unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 20);
    }

    #[test]
    fn match_config_reads_rc_variables() {
        with_envs(
            &[
                ("RC_SCAN_CAP", Some("500")),
                ("RC_TITLE_SUBSTITUTE", Some("false")),
                ("RC_ATS_WORKERS", Some("2")),
                ("RC_ATS_QUEUE_CAPACITY", None),
            ],
            || {
                let config = MatchConfig::from_env();
                assert_eq!(config.scan_cap, 500);
                assert!(!config.title_substitute);
                assert_eq!(config.ats_worker_count, 2);
                assert_eq!(config.ats_queue_capacity, DEFAULT_QUEUE_CAPACITY);
            },
        );
    }

    #[test]
    fn match_config_defaults_survive_garbage_values() {
        with_envs(&[("RC_SCAN_CAP", Some("plenty"))], || {
            let config = MatchConfig::from_env();
            assert_eq!(config.scan_cap, DEFAULT_SCAN_CAP);
        });
    }
}
