pub mod ats;
pub mod candidates;
pub mod health;
pub mod pagination;
pub mod stats;
pub mod views;

use serde_json::Value;
use tracing::warn;

use rc_common::db;

use crate::SharedState;

/// Consume one quota unit for the viewer. Store failures log and report
/// not-exceeded; quota accounting never fails a request.
pub(crate) async fn consume_quota(state: &SharedState, viewer_id: i64) -> bool {
    match db::consume_view_unit(&state.pool, viewer_id).await {
        Ok(status) => status.exceeded(),
        Err(err) => {
            warn!(viewer_id, error = %err, "quota consume failed; continuing");
            false
        }
    }
}

/// Fire-and-forget activity row, tagged with the process run id.
pub(crate) fn spawn_activity_log(
    state: &SharedState,
    actor_id: Option<i64>,
    action: &'static str,
    subject_type: &'static str,
    subject_id: i64,
    mut details: Value,
) {
    if let Some(map) = details.as_object_mut() {
        map.insert("run_id".into(), Value::String(rc_common::run_id::get().to_string()));
    }

    let pool = state.pool.clone();
    tokio::spawn(async move {
        if let Err(err) =
            db::log_activity(&pool, actor_id, action, subject_type, subject_id, Some(details)).await
        {
            warn!(action, error = %err, "activity log failed");
        }
    });
}
