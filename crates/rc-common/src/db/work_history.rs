use std::collections::HashMap;

use deadpool_postgres::PoolError;
use tokio_postgres::{Error as PgError, Row};
use tracing::instrument;

use crate::WorkHistoryEntry;
use crate::db::PgPool;
use crate::db::util::TimedClientExt;

#[derive(Debug, thiserror::Error)]
pub enum WorkHistoryFetchError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
}

fn row_to_entry(row: &Row) -> Result<WorkHistoryEntry, PgError> {
    Ok(WorkHistoryEntry {
        candidate_id: row.try_get("candidate_id")?,
        company: row.try_get("company")?,
        title: row.try_get("title")?,
        started_at: row.try_get("started_at")?,
        ended_at: row.try_get("ended_at")?,
        is_current: row.try_get("is_current")?,
    })
}

/// Fetch employment rows for a batch of candidates, grouped by candidate id.
/// Rows come back current-first so the post-filter resolution reads naturally.
#[instrument(skip(pool))]
pub async fn fetch_work_histories(
    pool: &PgPool,
    candidate_ids: &[i64],
) -> Result<HashMap<i64, Vec<WorkHistoryEntry>>, WorkHistoryFetchError> {
    if candidate_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT candidate_id, company, title, started_at, ended_at, is_current \
             FROM hire.work_history \
             WHERE candidate_id = ANY($1) \
             ORDER BY candidate_id, is_current DESC, started_at DESC NULLS LAST",
            &[&candidate_ids],
            "work_history.fetch",
        )
        .await?;

    let mut grouped: HashMap<i64, Vec<WorkHistoryEntry>> = HashMap::new();
    for row in rows {
        let entry = row_to_entry(&row)?;
        grouped.entry(entry.candidate_id).or_default().push(entry);
    }

    Ok(grouped)
}
