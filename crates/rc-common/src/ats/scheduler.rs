use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::scorer::{AtsEvaluation, AtsScorer};
use super::AtsError;
use crate::db::{self, AtsScoreUpsert, PgPool};
use crate::{run_id, Candidate, Requirement};

pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Terminal batches are kept queryable for this long, then pruned on the
/// next submission.
const BATCH_RETENTION_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Submitted,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl BatchState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchState::Completed | BatchState::Failed | BatchState::Cancelled
        )
    }
}

/// Result for one candidate in a batch. Exactly one of `score` and `error`
/// is set.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateScoreOutcome {
    pub candidate_id: i64,
    pub score: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSnapshot {
    pub batch_id: String,
    pub requirement_id: i64,
    pub state: BatchState,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub results: Vec<CandidateScoreOutcome>,
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

struct BatchHandle {
    snapshot: BatchSnapshot,
    cancel: CancellationToken,
}

struct SchedulerInner<S> {
    pool: PgPool,
    scorer: S,
    worker_count: usize,
    queue_capacity: usize,
    batches: RwLock<HashMap<String, BatchHandle>>,
    shutdown: CancellationToken,
}

/// Runs compatibility-score batches on the shared runtime. Cheap to clone;
/// all clones share one batch registry and one shutdown token.
pub struct AtsScheduler<S: AtsScorer> {
    inner: Arc<SchedulerInner<S>>,
}

impl<S: AtsScorer> Clone for AtsScheduler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: AtsScorer> AtsScheduler<S> {
    pub fn new(pool: PgPool, scorer: S, worker_count: usize, queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                pool,
                scorer,
                worker_count: worker_count.max(1),
                queue_capacity: queue_capacity.max(1),
                batches: RwLock::new(HashMap::new()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Registers a batch and spawns its runner. Returns the initial
    /// snapshot; progress is observable through [`Self::snapshot`] as
    /// workers report in.
    pub async fn submit_batch(
        &self,
        requirement_id: i64,
        candidate_ids: Vec<i64>,
    ) -> BatchSnapshot {
        self.prune_finished().await;

        let batch_id = run_id::generate();
        let cancel = self.inner.shutdown.child_token();
        let snapshot = BatchSnapshot {
            batch_id: batch_id.clone(),
            requirement_id,
            state: BatchState::Submitted,
            total: candidate_ids.len(),
            completed: 0,
            failed: 0,
            results: Vec::new(),
            error: None,
            submitted_at: Utc::now(),
            finished_at: None,
        };

        self.inner.batches.write().await.insert(
            batch_id.clone(),
            BatchHandle {
                snapshot: snapshot.clone(),
                cancel: cancel.clone(),
            },
        );
        info!(
            batch_id,
            requirement_id,
            candidates = snapshot.total,
            "compatibility batch submitted"
        );

        tokio::spawn(run_batch(
            Arc::clone(&self.inner),
            batch_id,
            requirement_id,
            candidate_ids,
            cancel,
        ));

        snapshot
    }

    pub async fn snapshot(&self, batch_id: &str) -> Option<BatchSnapshot> {
        self.inner
            .batches
            .read()
            .await
            .get(batch_id)
            .map(|handle| handle.snapshot.clone())
    }

    /// Cancels a batch. In-flight score computations finish their database
    /// write but their results are discarded from the batch bookkeeping;
    /// queued candidates are never picked up.
    pub async fn cancel_batch(&self, batch_id: &str) -> Option<BatchSnapshot> {
        let mut batches = self.inner.batches.write().await;
        let handle = batches.get_mut(batch_id)?;

        if !handle.snapshot.state.is_terminal() {
            handle.cancel.cancel();
            handle.snapshot.state = BatchState::Cancelled;
            handle.snapshot.finished_at = Some(Utc::now());
            info!(batch_id, "compatibility batch cancelled");
        }

        Some(handle.snapshot.clone())
    }

    /// Computes and persists one score synchronously, outside any batch.
    #[instrument(skip(self))]
    pub async fn score_single(
        &self,
        requirement_id: i64,
        candidate_id: i64,
    ) -> Result<AtsEvaluation, AtsError> {
        let requirement = db::fetch_requirement(&self.inner.pool, requirement_id)
            .await?
            .ok_or(AtsError::RequirementNotFound(requirement_id))?;
        let candidate = db::fetch_by_ids(&self.inner.pool, &[candidate_id])
            .await?
            .into_iter()
            .next()
            .ok_or(AtsError::CandidateNotFound(candidate_id))?;

        let evaluation = self.inner.scorer.score(&requirement, &candidate).await?;
        persist_score(&self.inner.pool, requirement_id, candidate_id, &evaluation).await?;
        Ok(evaluation)
    }

    /// Cancels every running batch. Workers observe the shared token through
    /// their per-batch children and drain out.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    async fn prune_finished(&self) {
        let cutoff = Utc::now() - chrono::Duration::minutes(BATCH_RETENTION_MINUTES);
        let mut batches = self.inner.batches.write().await;
        batches.retain(|_, handle| {
            !(handle.snapshot.state.is_terminal()
                && handle.snapshot.finished_at.is_some_and(|at| at < cutoff))
        });
    }
}

async fn run_batch<S: AtsScorer>(
    inner: Arc<SchedulerInner<S>>,
    batch_id: String,
    requirement_id: i64,
    candidate_ids: Vec<i64>,
    cancel: CancellationToken,
) {
    let requirement = match db::fetch_requirement(&inner.pool, requirement_id).await {
        Ok(Some(requirement)) => Arc::new(requirement),
        Ok(None) => {
            fail_batch(&inner, &batch_id, format!("requirement {requirement_id} not found")).await;
            return;
        }
        Err(err) => {
            fail_batch(&inner, &batch_id, err.to_string()).await;
            return;
        }
    };

    let mut by_id: HashMap<i64, Candidate> = match db::fetch_by_ids(&inner.pool, &candidate_ids)
        .await
    {
        Ok(rows) => rows.into_iter().map(|c| (c.id, c)).collect(),
        Err(err) => {
            fail_batch(&inner, &batch_id, err.to_string()).await;
            return;
        }
    };

    {
        let mut batches = inner.batches.write().await;
        let Some(handle) = batches.get_mut(&batch_id) else {
            return;
        };
        // Cancelled while we were fetching; nothing has been scored yet.
        if handle.snapshot.state != BatchState::Submitted {
            return;
        }
        handle.snapshot.state = BatchState::Running;
    }

    let (tx, rx) = mpsc::channel::<Candidate>(inner.queue_capacity);
    let queue = Arc::new(Mutex::new(rx));
    let workers = inner.worker_count.min(candidate_ids.len()).max(1);
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        handles.push(tokio::spawn(worker_loop(
            Arc::clone(&inner),
            batch_id.clone(),
            Arc::clone(&requirement),
            Arc::clone(&queue),
            cancel.clone(),
        )));
    }

    // Feed under backpressure. A cancellation stops the feed so workers
    // drain out instead of leaving the feeder parked on a full queue.
    for id in &candidate_ids {
        let Some(candidate) = by_id.remove(id) else {
            record_outcome(
                &inner,
                &batch_id,
                CandidateScoreOutcome {
                    candidate_id: *id,
                    score: None,
                    error: Some("candidate not found".into()),
                },
            )
            .await;
            continue;
        };
        let stopped = tokio::select! {
            _ = cancel.cancelled() => true,
            sent = tx.send(candidate) => sent.is_err(),
        };
        if stopped {
            break;
        }
    }
    drop(tx);

    for handle in handles {
        let _ = handle.await;
    }

    let mut batches = inner.batches.write().await;
    if let Some(handle) = batches.get_mut(&batch_id) {
        if handle.snapshot.state == BatchState::Running {
            handle.snapshot.state =
                finished_state(handle.snapshot.completed, handle.snapshot.failed);
            handle.snapshot.finished_at = Some(Utc::now());
            info!(
                batch_id,
                completed = handle.snapshot.completed,
                failed = handle.snapshot.failed,
                "compatibility batch finished"
            );
        }
    }
}

async fn worker_loop<S: AtsScorer>(
    inner: Arc<SchedulerInner<S>>,
    batch_id: String,
    requirement: Arc<Requirement>,
    queue: Arc<Mutex<mpsc::Receiver<Candidate>>>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            candidate = next_candidate(&queue) => candidate,
        };
        let Some(candidate) = next else {
            break;
        };

        let candidate_id = candidate.id;
        let outcome = match score_and_store(&inner, &requirement, &candidate).await {
            Ok(evaluation) => CandidateScoreOutcome {
                candidate_id,
                score: Some(evaluation.score),
                error: None,
            },
            Err(err) => {
                warn!(
                    batch_id,
                    candidate_id,
                    error = %err,
                    "compatibility score failed; batch continues"
                );
                CandidateScoreOutcome {
                    candidate_id,
                    score: None,
                    error: Some(err.to_string()),
                }
            }
        };

        // A cancellation mid-computation lets the score write land; only
        // the batch bookkeeping is dropped.
        if cancel.is_cancelled() {
            break;
        }
        record_outcome(&inner, &batch_id, outcome).await;
    }
}

async fn next_candidate(queue: &Mutex<mpsc::Receiver<Candidate>>) -> Option<Candidate> {
    queue.lock().await.recv().await
}

async fn score_and_store<S: AtsScorer>(
    inner: &SchedulerInner<S>,
    requirement: &Requirement,
    candidate: &Candidate,
) -> Result<AtsEvaluation, AtsError> {
    let evaluation = inner.scorer.score(requirement, candidate).await?;
    persist_score(&inner.pool, requirement.id, candidate.id, &evaluation).await?;
    Ok(evaluation)
}

async fn persist_score(
    pool: &PgPool,
    requirement_id: i64,
    candidate_id: i64,
    evaluation: &AtsEvaluation,
) -> Result<(), AtsError> {
    let upsert = AtsScoreUpsert {
        requirement_id,
        candidate_id,
        score: evaluation.score,
        details: evaluation.details.clone(),
    };
    db::upsert_ats_score(pool, &upsert).await?;
    Ok(())
}

async fn record_outcome<S>(
    inner: &SchedulerInner<S>,
    batch_id: &str,
    outcome: CandidateScoreOutcome,
) {
    let mut batches = inner.batches.write().await;
    let Some(handle) = batches.get_mut(batch_id) else {
        return;
    };
    apply_outcome(&mut handle.snapshot, outcome);
}

/// Folds one worker result into the snapshot. Cancelled batches ignore late
/// results so their counters stay frozen at cancellation time.
fn apply_outcome(snapshot: &mut BatchSnapshot, outcome: CandidateScoreOutcome) {
    if snapshot.state == BatchState::Cancelled {
        return;
    }
    if outcome.error.is_some() {
        snapshot.failed += 1;
    } else {
        snapshot.completed += 1;
    }
    snapshot.results.push(outcome);
}

/// An all-failure batch produced no result set and counts as failed; any
/// successful score makes the batch completed.
fn finished_state(completed: usize, failed: usize) -> BatchState {
    if failed > 0 && completed == 0 {
        BatchState::Failed
    } else {
        BatchState::Completed
    }
}

async fn fail_batch<S>(inner: &SchedulerInner<S>, batch_id: &str, error: String) {
    warn!(batch_id, error = %error, "compatibility batch failed before scoring");
    let mut batches = inner.batches.write().await;
    if let Some(handle) = batches.get_mut(batch_id) {
        if !handle.snapshot.state.is_terminal() {
            handle.snapshot.state = BatchState::Failed;
            handle.snapshot.error = Some(error);
            handle.snapshot.finished_at = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(state: BatchState) -> BatchSnapshot {
        BatchSnapshot {
            batch_id: "01TEST".into(),
            requirement_id: 7,
            state,
            total: 3,
            completed: 0,
            failed: 0,
            results: Vec::new(),
            error: None,
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }

    fn ok_outcome(candidate_id: i64) -> CandidateScoreOutcome {
        CandidateScoreOutcome {
            candidate_id,
            score: Some(72.0),
            error: None,
        }
    }

    fn failed_outcome(candidate_id: i64) -> CandidateScoreOutcome {
        CandidateScoreOutcome {
            candidate_id,
            score: None,
            error: Some("provider timeout".into()),
        }
    }

    #[test]
    fn per_candidate_failures_do_not_stop_bookkeeping() {
        let mut snap = snapshot(BatchState::Running);

        apply_outcome(&mut snap, ok_outcome(1));
        apply_outcome(&mut snap, failed_outcome(2));
        apply_outcome(&mut snap, ok_outcome(3));

        assert_eq!(snap.completed, 2);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.results.len(), 3);
    }

    #[test]
    fn cancelled_snapshots_ignore_late_outcomes() {
        let mut snap = snapshot(BatchState::Cancelled);

        apply_outcome(&mut snap, ok_outcome(1));

        assert_eq!(snap.completed, 0);
        assert!(snap.results.is_empty());
    }

    #[test]
    fn mixed_results_count_as_completed() {
        assert_eq!(finished_state(2, 1), BatchState::Completed);
        assert_eq!(finished_state(0, 0), BatchState::Completed);
        assert_eq!(finished_state(3, 0), BatchState::Completed);
    }

    #[test]
    fn all_failures_count_as_failed() {
        assert_eq!(finished_state(0, 3), BatchState::Failed);
    }

    #[test]
    fn states_serialize_snake_case() {
        let json = serde_json::to_value(BatchState::Running).unwrap();
        assert_eq!(json, serde_json::json!("running"));
        let json = serde_json::to_value(BatchState::Cancelled).unwrap();
        assert_eq!(json, serde_json::json!("cancelled"));
    }

    #[test]
    fn terminal_states_cover_the_three_end_states() {
        assert!(BatchState::Completed.is_terminal());
        assert!(BatchState::Failed.is_terminal());
        assert!(BatchState::Cancelled.is_terminal());
        assert!(!BatchState::Submitted.is_terminal());
        assert!(!BatchState::Running.is_terminal());
    }
}
