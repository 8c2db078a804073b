use std::collections::HashMap;

use deadpool_postgres::PoolError;
use serde_json::Value;
use tokio_postgres::Error as PgError;
use tracing::instrument;

use crate::db::PgPool;
use crate::db::util::{TimedClientExt, json_param};

#[derive(Debug, thiserror::Error)]
pub enum AtsScoreStorageError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
}

#[derive(Debug, Clone, Default)]
pub struct AtsScoreUpsert {
    pub requirement_id: i64,
    pub candidate_id: i64,
    pub score: f64,
    pub details: Option<Value>,
}

/// One score per (requirement, candidate). Duplicate or late worker results
/// simply overwrite, which is what makes retries safe.
#[instrument(skip(pool, score))]
pub async fn upsert_ats_score(
    pool: &PgPool,
    score: &AtsScoreUpsert,
) -> Result<u64, AtsScoreStorageError> {
    let client = pool.get().await?;

    let rows = client
        .timed_execute_cached(
            "INSERT INTO hire.ats_scores \
                (requirement_id, candidate_id, score, details, computed_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             ON CONFLICT (requirement_id, candidate_id) DO UPDATE SET \
                score = EXCLUDED.score, \
                details = EXCLUDED.details, \
                computed_at = EXCLUDED.computed_at",
            &[
                &score.requirement_id,
                &score.candidate_id,
                &score.score,
                &json_param(&score.details),
            ],
            "ats_scores.upsert",
        )
        .await?;

    Ok(rows)
}

/// Stored scores for a requirement, keyed by candidate id. Candidates never
/// scored are simply absent.
#[instrument(skip(pool, candidate_ids))]
pub async fn fetch_scores_for_requirement(
    pool: &PgPool,
    requirement_id: i64,
    candidate_ids: &[i64],
) -> Result<HashMap<i64, f64>, AtsScoreStorageError> {
    if candidate_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let client = pool.get().await?;
    let rows = client
        .timed_query_cached(
            "SELECT candidate_id, score FROM hire.ats_scores \
             WHERE requirement_id = $1 AND candidate_id = ANY($2)",
            &[&requirement_id, &candidate_ids],
            "ats_scores.fetch_for_requirement",
        )
        .await?;

    let mut scores = HashMap::new();
    for row in rows {
        scores.insert(row.try_get("candidate_id")?, row.try_get("score")?);
    }

    Ok(scores)
}
