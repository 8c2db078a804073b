use deadpool_postgres::PoolError;
use serde_json::Value;
use tokio_postgres::Error as PgError;
use tracing::instrument;

use crate::db::PgPool;
use crate::db::util::{TimedClientExt, json_param};

#[derive(Debug, thiserror::Error)]
pub enum EngagementError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub used: i32,
    pub allowance: i32,
}

impl QuotaStatus {
    /// Exceeded means the unit was still consumed; callers surface the flag
    /// after the fact rather than failing the request.
    pub fn exceeded(&self) -> bool {
        self.used > self.allowance
    }
}

/// Consume one view unit for a viewer, creating the counter row on first use.
#[instrument(skip(pool))]
pub async fn consume_view_unit(
    pool: &PgPool,
    viewer_id: i64,
) -> Result<QuotaStatus, EngagementError> {
    let client = pool.get().await?;

    let row = client
        .timed_query_one_cached(
            "INSERT INTO hire.view_quotas (viewer_id, used) VALUES ($1, 1) \
             ON CONFLICT (viewer_id) DO UPDATE SET used = hire.view_quotas.used + 1 \
             RETURNING used, allowance",
            &[&viewer_id],
            "engagement.consume_view_unit",
        )
        .await?;

    Ok(QuotaStatus {
        used: row.try_get("used")?,
        allowance: row.try_get("allowance")?,
    })
}

#[instrument(skip(pool))]
pub async fn quota_status(pool: &PgPool, viewer_id: i64) -> Result<QuotaStatus, EngagementError> {
    let client = pool.get().await?;

    let row = client
        .timed_query_opt_cached(
            "SELECT used, allowance FROM hire.view_quotas WHERE viewer_id = $1",
            &[&viewer_id],
            "engagement.quota_status",
        )
        .await?;

    match row {
        Some(row) => Ok(QuotaStatus {
            used: row.try_get("used")?,
            allowance: row.try_get("allowance")?,
        }),
        None => Ok(QuotaStatus {
            used: 0,
            allowance: 0,
        }),
    }
}

/// Append one activity row. Callers treat failures as log-and-continue.
#[instrument(skip(pool, details))]
pub async fn log_activity(
    pool: &PgPool,
    actor_id: Option<i64>,
    action: &str,
    subject_type: &str,
    subject_id: i64,
    details: Option<Value>,
) -> Result<(), EngagementError> {
    let client = pool.get().await?;

    client
        .timed_execute_cached(
            "INSERT INTO hire.activity_log (actor_id, action, subject_type, subject_id, details) \
             VALUES ($1, $2, $3, $4, $5)",
            &[
                &actor_id,
                &action,
                &subject_type,
                &subject_id,
                &json_param(&details),
            ],
            "engagement.log_activity",
        )
        .await?;

    Ok(())
}
