use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use rc_common::api::CandidateListResponse;
use rc_common::db;
use rc_common::matching::engine::{self, MatchError, MatchOutcome, SearchOptions, SortKey};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::{consume_quota, pagination, spawn_activity_log};
use crate::SharedState;

#[derive(Debug, Deserialize, Default)]
pub struct CandidateListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub sort_by: Option<String>,
    /// Free-text keyword layered over the requirement's own criteria.
    #[serde(default)]
    pub q: Option<String>,
    /// Enables per-candidate view flags and quota accounting.
    #[serde(default)]
    pub viewer_id: Option<i64>,
}

const fn default_page() -> u32 {
    1
}

const fn default_page_size() -> u32 {
    20
}

pub async fn list_candidates(
    State(state): State<SharedState>,
    Path(requirement_id): Path<i64>,
    Query(query): Query<CandidateListQuery>,
    _auth: AuthUser,
) -> Result<Json<CandidateListResponse>, ApiError> {
    let (page, page_size) = pagination::validate_page(query.page, query.page_size)?;
    let sort = match query.sort_by.as_deref() {
        None => SortKey::default(),
        Some(raw) => SortKey::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown sort key: {raw}")))?,
    };

    let requirement = db::fetch_requirement(&state.pool, requirement_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("requirement not found: {requirement_id}")))?;

    let options = SearchOptions {
        keyword: query.q.clone(),
        sort,
        page,
        page_size,
        scan_cap: state.match_config.scan_cap,
        title_substitute: state.match_config.title_substitute,
    };
    // A requirement with no positive criteria gets the explicit empty
    // result, never an unconstrained scan and never an error.
    let outcome = match engine::run_search(&state.pool, &requirement, &options, Utc::now()).await {
        Ok(outcome) => outcome,
        Err(MatchError::NoFiltersSpecified) => MatchOutcome::no_filters(),
        Err(err) => return Err(err.into()),
    };

    let mut response = CandidateListResponse::from_outcome(requirement_id, page, page_size, &outcome);
    let page_ids: Vec<i64> = response.candidates.iter().map(|c| c.id).collect();

    let scores = db::fetch_scores_for_requirement(&state.pool, requirement_id, &page_ids).await?;
    for candidate in &mut response.candidates {
        candidate.ats_score = scores.get(&candidate.id).copied();
    }

    if let Some(viewer_id) = query.viewer_id {
        let viewed = db::fetch_viewed_map(&state.pool, viewer_id, &page_ids).await?;
        for candidate in &mut response.candidates {
            if let Some(requirement_ids) = viewed.get(&candidate.id) {
                candidate.viewed = true;
                candidate.viewed_for = requirement_ids.clone();
            }
        }

        response.quota_exceeded = consume_quota(&state, viewer_id).await;
        spawn_activity_log(
            &state,
            Some(viewer_id),
            "candidates_searched",
            "requirement",
            requirement_id,
            json!({
                "page": page,
                "page_size": page_size,
                "total": response.total,
                "fallback_applied": response.fallback_applied,
            }),
        );
    }

    Ok(Json(response))
}
