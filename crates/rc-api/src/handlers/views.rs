use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use rc_common::api::ViewResponse;
use rc_common::db;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::{consume_quota, spawn_activity_log};
use crate::SharedState;

#[derive(Debug, Deserialize)]
pub struct ViewBody {
    pub viewer_id: i64,
}

/// Record or extend a view. Re-viewing under a new requirement grows the
/// record's requirement set; the original view stays intact.
pub async fn record_view(
    State(state): State<SharedState>,
    Path((requirement_id, candidate_id)): Path<(i64, i64)>,
    _auth: AuthUser,
    Json(body): Json<ViewBody>,
) -> Result<Json<ViewResponse>, ApiError> {
    let record =
        db::record_view(&state.pool, body.viewer_id, candidate_id, requirement_id).await?;

    let quota_exceeded = consume_quota(&state, body.viewer_id).await;
    spawn_activity_log(
        &state,
        Some(body.viewer_id),
        "candidate_viewed",
        "candidate",
        candidate_id,
        json!({ "requirement_id": requirement_id }),
    );

    Ok(Json(ViewResponse {
        viewer_id: body.viewer_id,
        candidate_id,
        requirement_ids: record.requirement_ids,
        quota_exceeded,
    }))
}
