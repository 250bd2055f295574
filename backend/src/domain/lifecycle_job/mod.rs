//! Status lifecycle job advancing elapsed bookings to completed.
//!
//! The job owns batching, retry policy (linear backoff, transient errors
//! only), and failure reporting through domain ports. Each batch claim is
//! atomic on the store side and guarded by the `last_auto_update` tombstone,
//! so re-running the job is always safe: processed rows are never touched
//! again and a second immediate run reports zero updates.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::ports::{DueCutoff, LifecycleStore, LifecycleStoreError, RunFailureNotifier};

mod runtime;
pub use runtime::{LifecycleJobPorts, LifecycleJobRuntime, TokioSleeper};

/// Job configuration controlling batch size and retry behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleJobConfig {
    /// Maximum rows claimed per batch transaction.
    pub batch_size: i64,
    /// Maximum claim attempts per batch (including the first call).
    pub max_attempts: u32,
    /// Base delay of the linear retry backoff.
    pub retry_delay: Duration,
}

impl Default for LifecycleJobConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Successful run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobRunSummary {
    /// Id tagging every audit row this run produced.
    pub run_id: Uuid,
    /// Number of bookings transitioned to completed.
    pub updated: u64,
}

/// Failed run report.
///
/// The run id is still meaningful: batches claimed before the failure are
/// committed and their audit rows carry it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRunFailure {
    /// Id of the failed run.
    pub run_id: Uuid,
    /// Bookings transitioned before the run aborted.
    pub updated: u64,
    /// The terminal store error.
    pub error: LifecycleStoreError,
}

/// Async sleeping abstraction so tests control retry pacing.
#[async_trait]
pub trait LifecycleSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Domain-owned status lifecycle job.
pub struct LifecycleJob {
    store: Arc<dyn LifecycleStore>,
    notifier: Arc<dyn RunFailureNotifier>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn LifecycleSleeper>,
    config: LifecycleJobConfig,
}

impl LifecycleJob {
    /// Build a job using default runtime dependencies.
    pub fn new(ports: LifecycleJobPorts, clock: Arc<dyn Clock>, config: LifecycleJobConfig) -> Self {
        Self::with_runtime(ports, clock, LifecycleJobRuntime::default(), config)
    }

    /// Build a job with injected runtime abstractions.
    pub fn with_runtime(
        ports: LifecycleJobPorts,
        clock: Arc<dyn Clock>,
        runtime: LifecycleJobRuntime,
        config: LifecycleJobConfig,
    ) -> Self {
        Self {
            store: ports.store,
            notifier: ports.notifier,
            clock,
            sleeper: runtime.sleeper,
            config,
        }
    }

    /// Execute one full run, draining the due backlog in bounded batches.
    ///
    /// Batches are claimed until one comes back empty. A batch that fails
    /// transiently is retried with linear backoff; any terminal failure
    /// aborts the run, fires the failure notifier, and reports the work
    /// committed so far.
    pub async fn run_once(&self) -> Result<JobRunSummary, JobRunFailure> {
        let run_id = Uuid::new_v4();
        let mut updated: u64 = 0;
        info!(run_id = %run_id, batch_size = self.config.batch_size, "lifecycle run started");

        loop {
            let now = self.clock.utc();
            let cutoff = DueCutoff {
                today: now.date_naive(),
                now: now.time(),
            };

            match self.claim_with_retry(cutoff, run_id).await {
                Ok(batch) if batch.is_empty() => break,
                Ok(batch) => {
                    let claimed = u64::try_from(batch.len()).unwrap_or(u64::MAX);
                    updated = updated.saturating_add(claimed);
                    info!(run_id = %run_id, claimed, total = updated, "lifecycle batch committed");
                }
                Err(store_error) => {
                    error!(
                        run_id = %run_id,
                        updated,
                        error = %store_error,
                        "lifecycle run aborted"
                    );
                    self.report_failure(run_id, &store_error).await;
                    return Err(JobRunFailure {
                        run_id,
                        updated,
                        error: store_error,
                    });
                }
            }
        }

        info!(run_id = %run_id, updated, "lifecycle run finished");
        Ok(JobRunSummary { run_id, updated })
    }

    /// Claim one batch, retrying transient failures with linear backoff.
    async fn claim_with_retry(
        &self,
        cutoff: DueCutoff,
        run_id: Uuid,
    ) -> Result<Vec<crate::domain::ports::CompletedTransition>, LifecycleStoreError> {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self
                .store
                .claim_due_batch(cutoff, run_id, self.config.batch_size)
                .await
            {
                Ok(batch) => return Ok(batch),
                Err(store_error) if store_error.is_transient() && attempt < max_attempts => {
                    let delay = self.config.retry_delay.saturating_mul(attempt);
                    warn!(
                        run_id = %run_id,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %store_error,
                        "transient lifecycle failure, backing off"
                    );
                    self.sleeper.sleep(delay).await;
                }
                Err(store_error) => return Err(store_error),
            }
        }

        Err(LifecycleStoreError::query(
            "unreachable lifecycle retry control-flow state",
        ))
    }

    /// Best-effort failure notification; delivery errors only log.
    async fn report_failure(&self, run_id: Uuid, store_error: &LifecycleStoreError) {
        if let Err(notify_error) = self
            .notifier
            .notify_failure(run_id, &store_error.to_string())
            .await
        {
            warn!(
                run_id = %run_id,
                error = %notify_error,
                "lifecycle failure notification not delivered"
            );
        }
    }
}
