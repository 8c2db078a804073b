use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use rc_common::api::{BatchSubmitRequest, SingleScoreResponse};
use rc_common::ats::BatchSnapshot;
use rc_common::db;
use rc_common::matching::engine::{self, SearchOptions};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::pagination;
use crate::SharedState;

/// Submit a compatibility-score batch. The body names candidates directly
/// or points at one ranked page of the requirement's matches.
pub async fn submit_batch(
    State(state): State<SharedState>,
    Path(requirement_id): Path<i64>,
    _auth: AuthUser,
    Json(body): Json<BatchSubmitRequest>,
) -> Result<(StatusCode, Json<BatchSnapshot>), ApiError> {
    let candidate_ids = match (body.candidate_ids, body.page) {
        (Some(ids), _) if !ids.is_empty() => ids,
        (_, Some(descriptor)) => {
            let (page, page_size) =
                pagination::validate_page(descriptor.page, descriptor.page_size)?;
            let requirement = db::fetch_requirement(&state.pool, requirement_id)
                .await?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("requirement not found: {requirement_id}"))
                })?;

            let options = SearchOptions {
                page,
                page_size,
                scan_cap: state.match_config.scan_cap,
                title_substitute: state.match_config.title_substitute,
                ..SearchOptions::default()
            };
            engine::resolve_page_ids(&state.pool, &requirement, &options, Utc::now()).await?
        }
        _ => {
            return Err(ApiError::BadRequest(
                "candidate_ids or page is required".into(),
            ));
        }
    };

    let snapshot = state.scheduler.submit_batch(requirement_id, candidate_ids).await;
    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// Batch status plus whatever per-candidate results have landed so far.
pub async fn batch_status(
    State(state): State<SharedState>,
    Path(batch_id): Path<String>,
    _auth: AuthUser,
) -> Result<Json<BatchSnapshot>, ApiError> {
    state
        .scheduler
        .snapshot(&batch_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("batch not found: {batch_id}")))
}

pub async fn cancel_batch(
    State(state): State<SharedState>,
    Path(batch_id): Path<String>,
    _auth: AuthUser,
) -> Result<Json<BatchSnapshot>, ApiError> {
    state
        .scheduler
        .cancel_batch(&batch_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("batch not found: {batch_id}")))
}

/// Synchronous single-candidate score, for callers polling pair by pair.
pub async fn score_single(
    State(state): State<SharedState>,
    Path((requirement_id, candidate_id)): Path<(i64, i64)>,
    _auth: AuthUser,
) -> Result<Json<SingleScoreResponse>, ApiError> {
    let evaluation = state.scheduler.score_single(requirement_id, candidate_id).await?;

    Ok(Json(SingleScoreResponse {
        requirement_id,
        candidate_id,
        score: evaluation.score,
        details: evaluation.details,
    }))
}
