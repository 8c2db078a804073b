use std::collections::HashMap;

use chrono::{DateTime, Utc};
use deadpool_postgres::PoolError;
use serde_json::Value;
use tokio_postgres::{Error as PgError, Row};
use tracing::instrument;

use crate::db::PgPool;
use crate::db::util::TimedClientExt;

#[derive(Debug, thiserror::Error)]
pub enum ViewStorageError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
}

/// One row per (viewer, candidate). Viewing the same candidate from another
/// requirement grows `requirement_ids` instead of adding a second record.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRecord {
    pub viewer_id: i64,
    pub candidate_id: i64,
    pub requirement_ids: Vec<i64>,
    pub first_viewed_at: DateTime<Utc>,
    pub last_viewed_at: DateTime<Utc>,
}

fn json_id_list(value: Option<Value>) -> Vec<i64> {
    match value {
        Some(Value::Array(values)) => values.iter().filter_map(Value::as_i64).collect(),
        _ => Vec::new(),
    }
}

fn row_to_record(row: &Row) -> Result<ViewRecord, PgError> {
    Ok(ViewRecord {
        viewer_id: row.try_get("viewer_id")?,
        candidate_id: row.try_get("candidate_id")?,
        requirement_ids: json_id_list(row.try_get("requirement_ids")?),
        first_viewed_at: row.try_get("first_viewed_at")?,
        last_viewed_at: row.try_get("last_viewed_at")?,
    })
}

/// Record that `viewer_id` opened `candidate_id` under `requirement_id`.
/// Idempotent per requirement: re-viewing bumps `last_viewed_at` only.
#[instrument(skip(pool))]
pub async fn record_view(
    pool: &PgPool,
    viewer_id: i64,
    candidate_id: i64,
    requirement_id: i64,
) -> Result<ViewRecord, ViewStorageError> {
    let client = pool.get().await?;

    let row = client
        .timed_query_one_cached(
            "INSERT INTO hire.requirement_views \
                (viewer_id, candidate_id, requirement_ids, first_viewed_at, last_viewed_at) \
             VALUES ($1, $2, jsonb_build_array($3::bigint), NOW(), NOW()) \
             ON CONFLICT (viewer_id, candidate_id) DO UPDATE SET \
                requirement_ids = CASE \
                    WHEN hire.requirement_views.requirement_ids @> jsonb_build_array($3::bigint) \
                    THEN hire.requirement_views.requirement_ids \
                    ELSE hire.requirement_views.requirement_ids || jsonb_build_array($3::bigint) \
                END, \
                last_viewed_at = NOW() \
             RETURNING viewer_id, candidate_id, requirement_ids, first_viewed_at, last_viewed_at",
            &[&viewer_id, &candidate_id, &requirement_id],
            "views.record",
        )
        .await?;

    Ok(row_to_record(&row)?)
}

/// Which of `candidate_ids` has this viewer already opened, with the
/// requirement ids each view covers.
#[instrument(skip(pool, candidate_ids))]
pub async fn fetch_viewed_map(
    pool: &PgPool,
    viewer_id: i64,
    candidate_ids: &[i64],
) -> Result<HashMap<i64, Vec<i64>>, ViewStorageError> {
    if candidate_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT viewer_id, candidate_id, requirement_ids, first_viewed_at, last_viewed_at \
             FROM hire.requirement_views \
             WHERE viewer_id = $1 AND candidate_id = ANY($2)",
            &[&viewer_id, &candidate_ids],
            "views.fetch_map",
        )
        .await?;

    let mut map = HashMap::new();
    for row in rows {
        let record = row_to_record(&row)?;
        map.insert(record.candidate_id, record.requirement_ids);
    }

    Ok(map)
}

/// How many candidates this viewer has opened under one requirement.
#[instrument(skip(pool))]
pub async fn count_viewed_for_requirement(
    pool: &PgPool,
    viewer_id: i64,
    requirement_id: i64,
) -> Result<i64, ViewStorageError> {
    let client = pool.get().await?;

    let row = client
        .timed_query_one_cached(
            "SELECT COUNT(*) FROM hire.requirement_views \
             WHERE viewer_id = $1 AND requirement_ids @> jsonb_build_array($2::bigint)",
            &[&viewer_id, &requirement_id],
            "views.count_for_requirement",
        )
        .await?;

    Ok(row.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_id_list_keeps_integers_only() {
        assert_eq!(json_id_list(Some(json!([1, 2, "x", null]))), vec![1, 2]);
        assert!(json_id_list(None).is_empty());
    }
}
