use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::{self, PgPool};
use crate::matching::criteria::{self, MatchCriteria};
use crate::matching::post_filter::PostFilter;
use crate::matching::predicate::{self, ClauseName, PredicateSet};
use crate::matching::scoring::{RelevanceScore, score_candidate};
use crate::{Candidate, Requirement};

/// Rows fetched per predicate execution. Ranking happens in memory, so the
/// scan has to be bounded somewhere; this is that bound.
pub const DEFAULT_SCAN_CAP: i64 = 2_000;

#[derive(Debug, Error)]
pub enum MatchError {
    /// The requirement carried no usable positive filters. Matching the
    /// entire candidate base is never the right answer to that.
    #[error("no filters specified; refusing an unconstrained candidate scan")]
    NoFiltersSpecified,
    #[error("candidate store unavailable: {0}")]
    CandidateStore(#[from] db::CandidateFetchError),
    #[error("work history store unavailable: {0}")]
    WorkHistoryStore(#[from] db::WorkHistoryFetchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Relevance,
    Recent,
    Name,
}

impl SortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "relevance" => Some(SortKey::Relevance),
            "recent" => Some(SortKey::Recent),
            "name" => Some(SortKey::Name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Caller-supplied free-text keyword, layered on top of the
    /// requirement's own criteria.
    pub keyword: Option<String>,
    pub sort: SortKey,
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    pub scan_cap: i64,
    /// When false, requirement titles neither stand in for a skill clause
    /// nor drive the post-filter title rule.
    pub title_substitute: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            keyword: None,
            sort: SortKey::Relevance,
            page: 1,
            page_size: 20,
            scan_cap: DEFAULT_SCAN_CAP,
            title_substitute: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub relevance: RelevanceScore,
}

#[derive(Debug)]
pub struct MatchOutcome {
    /// One page of survivors, sorted by the requested key.
    pub candidates: Vec<ScoredCandidate>,
    /// Post-filtered total across all pages. The aggregate counter reports
    /// the same number.
    pub total: usize,
    pub fallback_applied: bool,
    pub applied_filters: Vec<ClauseName>,
    pub skipped_filters: Vec<ClauseName>,
}

impl MatchOutcome {
    /// The explicit empty result for a refused unconstrained scan. The empty
    /// applied-filters list is what tells the caller no criteria ran.
    pub fn no_filters() -> Self {
        Self {
            candidates: Vec::new(),
            total: 0,
            fallback_applied: false,
            applied_filters: Vec::new(),
            skipped_filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountOutcome {
    pub total: usize,
    pub fallback_applied: bool,
}

/// Strict predicate set for the criteria, or the refusal when nothing
/// positive filters.
pub fn plan_strict(match_criteria: &MatchCriteria) -> Result<PredicateSet, MatchError> {
    let set = predicate::build(match_criteria);
    if !set.has_criteria_clauses() {
        return Err(MatchError::NoFiltersSpecified);
    }
    Ok(set)
}

struct MatchedSet {
    criteria: MatchCriteria,
    candidates: Vec<Candidate>,
    fallback_applied: bool,
    applied: Vec<ClauseName>,
    skipped: Vec<ClauseName>,
}

async fn fetch_rows(
    pool: &PgPool,
    set: &PredicateSet,
    now: DateTime<Utc>,
    scan_cap: i64,
    slim: bool,
) -> Result<Vec<Candidate>, db::CandidateFetchError> {
    if slim {
        db::fetch_matching_slim(pool, set, now, scan_cap).await
    } else {
        db::fetch_matching(pool, set, now, scan_cap).await
    }
}

/// Normalize, build, execute, maybe relax, then post-filter. Both the ranked
/// fetch and the count run through here so they cannot drift apart.
async fn fetch_matched(
    pool: &PgPool,
    requirement: &Requirement,
    options: &SearchOptions,
    now: DateTime<Utc>,
    slim: bool,
) -> Result<MatchedSet, MatchError> {
    let scan_cap = options.scan_cap;
    let mut match_criteria = criteria::normalize(requirement);
    if let Some(keyword) = options
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
    {
        match_criteria.keyword = Some(keyword.to_string());
    }
    if !options.title_substitute {
        match_criteria.title = None;
    }

    let strict = plan_strict(&match_criteria)?;
    let mut candidates = fetch_rows(pool, &strict, now, scan_cap, slim).await?;

    let mut fallback_applied = false;
    let mut applied = strict.applied();
    let skipped = strict.skipped.clone();

    // Relaxation keys off the matcher's empty result, not the post-filter's.
    if candidates.is_empty() {
        let relaxed = predicate::build_relaxed(&match_criteria);
        if relaxed.has_criteria_clauses() {
            info!(
                requirement_id = requirement.id,
                "strict match empty; retrying with categorical clauses only"
            );
            candidates = fetch_rows(pool, &relaxed, now, scan_cap, slim).await?;
            fallback_applied = true;
            applied = relaxed.applied();
        }
    }

    let post = PostFilter::new(&match_criteria);
    let histories = if post.needs_work_history() && !candidates.is_empty() {
        let ids: Vec<i64> = candidates.iter().map(|c| c.id).collect();
        db::fetch_work_histories(pool, &ids).await?
    } else {
        HashMap::new()
    };
    let candidates = post.sweep(candidates, &histories);

    Ok(MatchedSet {
        criteria: match_criteria,
        candidates,
        fallback_applied,
        applied,
        skipped,
    })
}

/// Ranked candidate search for one requirement.
#[instrument(skip(pool, requirement, options), fields(requirement_id = requirement.id))]
pub async fn run_search(
    pool: &PgPool,
    requirement: &Requirement,
    options: &SearchOptions,
    now: DateTime<Utc>,
) -> Result<MatchOutcome, MatchError> {
    let matched = fetch_matched(pool, requirement, options, now, false).await?;

    let MatchedSet {
        criteria: match_criteria,
        candidates,
        fallback_applied,
        applied,
        skipped,
    } = matched;

    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let relevance = score_candidate(&match_criteria, &candidate, now);
            ScoredCandidate {
                candidate,
                relevance,
            }
        })
        .collect();

    sort_candidates(&mut scored, options.sort);
    let total = scored.len();
    let page = paginate(scored, options.page, options.page_size);

    Ok(MatchOutcome {
        candidates: page,
        total,
        fallback_applied,
        applied_filters: applied,
        skipped_filters: skipped,
    })
}

/// Count-only variant of [`run_search`]. Same normalization, same predicate
/// execution, same post-filter narrowing, no scoring. Pagination and sort in
/// `options` are ignored.
#[instrument(skip(pool, requirement, options), fields(requirement_id = requirement.id))]
pub async fn run_count(
    pool: &PgPool,
    requirement: &Requirement,
    options: &SearchOptions,
    now: DateTime<Utc>,
) -> Result<CountOutcome, MatchError> {
    let matched = fetch_matched(pool, requirement, options, now, true).await?;

    Ok(CountOutcome {
        total: matched.candidates.len(),
        fallback_applied: matched.fallback_applied,
    })
}

/// Candidate ids on one ranked page, for batch work that accepts a page
/// descriptor instead of an explicit id list. Ranking uses the default
/// relevance sort regardless of `options.sort`.
#[instrument(skip(pool, requirement, options), fields(requirement_id = requirement.id))]
pub async fn resolve_page_ids(
    pool: &PgPool,
    requirement: &Requirement,
    options: &SearchOptions,
    now: DateTime<Utc>,
) -> Result<Vec<i64>, MatchError> {
    let options = SearchOptions {
        sort: SortKey::Relevance,
        ..options.clone()
    };
    let outcome = run_search(pool, requirement, &options, now).await?;

    Ok(outcome
        .candidates
        .into_iter()
        .map(|scored| scored.candidate.id)
        .collect())
}

fn sort_candidates(scored: &mut [ScoredCandidate], sort: SortKey) {
    match sort {
        SortKey::Relevance => scored.sort_by(|a, b| {
            b.relevance
                .total
                .cmp(&a.relevance.total)
                .then_with(|| name_of(a).cmp(name_of(b)))
                .then_with(|| a.candidate.id.cmp(&b.candidate.id))
        }),
        SortKey::Recent => scored.sort_by(|a, b| {
            b.candidate
                .last_login_at
                .cmp(&a.candidate.last_login_at)
                .then_with(|| a.candidate.id.cmp(&b.candidate.id))
        }),
        SortKey::Name => scored.sort_by(|a, b| {
            name_of(a)
                .cmp(name_of(b))
                .then_with(|| a.candidate.id.cmp(&b.candidate.id))
        }),
    }
}

fn name_of(scored: &ScoredCandidate) -> &str {
    scored.candidate.full_name.as_deref().unwrap_or("")
}

fn paginate(scored: Vec<ScoredCandidate>, page: u32, page_size: u32) -> Vec<ScoredCandidate> {
    let start = page.saturating_sub(1) as usize * page_size as usize;
    scored
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::scoring::CriterionScore;

    fn blank_criterion() -> CriterionScore {
        CriterionScore {
            points: 0.0,
            max_points: 0.0,
            status: "NOT_SPECIFIED",
            reason: None,
        }
    }

    fn scored(id: i64, name: &str, total: i32) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate {
                id,
                full_name: Some(name.into()),
                ..Candidate::default()
            },
            relevance: RelevanceScore {
                total,
                reasons: Vec::new(),
                skills: blank_criterion(),
                location: blank_criterion(),
                experience: blank_criterion(),
                salary: blank_criterion(),
                education: blank_criterion(),
                designation: blank_criterion(),
                company: blank_criterion(),
                notice_period: blank_criterion(),
                profile_quality: blank_criterion(),
            },
        }
    }

    #[test]
    fn refuses_requirements_without_positive_filters() {
        let result = plan_strict(&MatchCriteria::default());
        assert!(matches!(result, Err(MatchError::NoFiltersSpecified)));
    }

    #[test]
    fn exclusions_alone_do_not_unlock_matching() {
        let match_criteria = MatchCriteria {
            excluded_skills: vec!["PHP".into()],
            exclude_locations: vec!["Noida".into()],
            ..MatchCriteria::default()
        };

        let result = plan_strict(&match_criteria);
        assert!(matches!(result, Err(MatchError::NoFiltersSpecified)));
    }

    #[test]
    fn single_positive_criterion_is_enough() {
        let match_criteria = MatchCriteria {
            include_locations: vec!["Bangalore".into()],
            ..MatchCriteria::default()
        };

        assert!(plan_strict(&match_criteria).is_ok());
    }

    #[test]
    fn relevance_sort_breaks_ties_by_name_then_id() {
        let mut rows = vec![
            scored(3, "Asha", 70),
            scored(1, "Zoya", 90),
            scored(2, "Asha", 70),
        ];

        sort_candidates(&mut rows, SortKey::Relevance);

        let ids: Vec<i64> = rows.iter().map(|s| s.candidate.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn name_sort_is_alphabetical() {
        let mut rows = vec![scored(1, "Ravi", 10), scored(2, "Asha", 90)];

        sort_candidates(&mut rows, SortKey::Name);

        assert_eq!(rows[0].candidate.id, 2);
    }

    #[test]
    fn pagination_windows_the_sorted_set() {
        let rows: Vec<ScoredCandidate> =
            (1..=5).map(|id| scored(id, "c", 50)).collect();

        let page = paginate(rows, 2, 2);
        let ids: Vec<i64> = page.iter().map(|s| s.candidate.id).collect();

        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let rows = vec![scored(1, "c", 50)];
        assert!(paginate(rows, 4, 10).is_empty());
    }

    #[test]
    fn sort_keys_parse_their_wire_names() {
        assert_eq!(SortKey::parse("relevance"), Some(SortKey::Relevance));
        assert_eq!(SortKey::parse("recent"), Some(SortKey::Recent));
        assert_eq!(SortKey::parse("name"), Some(SortKey::Name));
        assert_eq!(SortKey::parse("salary"), None);
    }
}
