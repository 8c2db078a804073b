use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use rc_common::api::StatsResponse;
use rc_common::db;
use rc_common::matching::engine::{self, CountOutcome, MatchError, SearchOptions};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

#[derive(Debug, Deserialize, Default)]
pub struct StatsQuery {
    #[serde(default)]
    pub q: Option<String>,
    /// Whose view history counts as "accessed". Defaults to the
    /// requirement's owning employer.
    #[serde(default)]
    pub viewer_id: Option<i64>,
}

/// Aggregate counters for one requirement. The total runs the same strict,
/// relax and post-filter pipeline as the candidates endpoint, so the two
/// numbers always agree.
pub async fn stats(
    State(state): State<SharedState>,
    Path(requirement_id): Path<i64>,
    Query(query): Query<StatsQuery>,
    _auth: AuthUser,
) -> Result<Json<StatsResponse>, ApiError> {
    let requirement = db::fetch_requirement(&state.pool, requirement_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("requirement not found: {requirement_id}")))?;

    let options = SearchOptions {
        keyword: query.q.clone(),
        scan_cap: state.match_config.scan_cap,
        title_substitute: state.match_config.title_substitute,
        ..SearchOptions::default()
    };
    // Mirrors the candidates endpoint: no positive criteria count zero.
    let count = match engine::run_count(&state.pool, &requirement, &options, Utc::now()).await {
        Ok(count) => count,
        Err(MatchError::NoFiltersSpecified) => CountOutcome {
            total: 0,
            fallback_applied: false,
        },
        Err(err) => return Err(err.into()),
    };

    let viewer_id = query.viewer_id.or(requirement.employer_id);
    let accessed = match viewer_id {
        Some(viewer_id) => {
            db::count_viewed_for_requirement(&state.pool, viewer_id, requirement_id).await?
        }
        None => 0,
    };

    Ok(Json(StatsResponse {
        requirement_id,
        total: count.total,
        accessed,
        fallback_applied: count.fallback_applied,
    }))
}
