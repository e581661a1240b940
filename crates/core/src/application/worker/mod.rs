// Worker - the per-worker dispatch loop (SPEC_FULL §4.4).

pub mod constants;
mod shutdown;

pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use constants::*;

use crate::application::queue::QueueService;
use crate::domain::Job;
use crate::port::{Clock, ExecutionStatus, JobMetric, TaskExecutor};

/// One worker: a cooperative, single-threaded-per-task dispatch loop that
/// repeatedly claims and executes jobs until told to shut down.
pub struct Worker {
    id: String,
    queue: Arc<QueueService>,
    executor: Arc<dyn TaskExecutor>,
    clock: Arc<dyn Clock>,
    in_progress: Arc<AtomicBool>,
}

impl Worker {
    pub fn new(
        id: impl Into<String>,
        queue: Arc<QueueService>,
        executor: Arc<dyn TaskExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            id: id.into(),
            queue,
            executor,
            clock,
            in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The run loop. See SPEC_FULL §4.4 for the numbered steps this follows.
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(worker_id = %self.id, "worker started");
        loop {
            if shutdown.is_shutdown() && !self.in_progress.load(Ordering::SeqCst) {
                break;
            }

            // Cheap idempotent sweeps, run every tick regardless of which
            // worker's turn it is, so promotion latency is bounded by the
            // poll period alone.
            if let Err(e) = self.queue.activate_scheduled_jobs().await {
                warn!(worker_id = %self.id, error = %e, "activate_scheduled_jobs failed");
            }
            if let Err(e) = self.queue.reactivate_waiting_jobs().await {
                warn!(worker_id = %self.id, error = %e, "reactivate_waiting_jobs failed");
            }

            if shutdown.is_shutdown() {
                // Don't claim new work while draining toward shutdown.
                tokio::select! {
                    _ = sleep(IDLE_SLEEP_DURATION) => {},
                    _ = shutdown.wait() => {},
                }
                continue;
            }

            let job = match self.queue.fetch_next_job_for_processing(&self.id).await {
                Ok(Some(job)) => job,
                Ok(None) => {
                    sleep(IDLE_SLEEP_DURATION).await;
                    continue;
                }
                Err(e) => {
                    error!(worker_id = %self.id, error = %e, "fetch_next_job_for_processing failed");
                    sleep(ERROR_RECOVERY_SLEEP_DURATION).await;
                    continue;
                }
            };

            self.in_progress.store(true, Ordering::SeqCst);
            if let Err(e) = self.execute_job(job).await {
                // Errors inside execute_job are swallowed here: the Worker
                // loop must not die because one job's bookkeeping failed.
                error!(worker_id = %self.id, error = %e, "execute_job failed");
            }
            self.in_progress.store(false, Ordering::SeqCst);
        }
        info!(worker_id = %self.id, "worker stopped");
    }

    async fn execute_job(&self, job: Job) -> crate::error::Result<()> {
        let timeout_secs = self.queue.job_timeout_secs().await.unwrap_or(300).max(1) as u64;
        let timeout = Duration::from_secs(timeout_secs);

        let _ = self.queue.add_job_log(&job.id, "started").await;

        let (log_tx, mut log_rx) = mpsc::unbounded_channel::<String>();
        let queue_for_logs = Arc::clone(&self.queue);
        let job_id_for_logs = job.id.clone();
        let log_drain = tokio::spawn(async move {
            while let Some(line) = log_rx.recv().await {
                let _ = queue_for_logs.add_job_log(&job_id_for_logs, &line).await;
            }
        });

        let exec_outcome = self
            .executor
            .execute(&job.command, job.attempts as i32, timeout, log_tx)
            .await;
        let _ = log_drain.await;

        let attempts = job.attempts + 1;
        let backoff_base = self.queue.backoff_base().await.unwrap_or(2).max(1);
        let backoff_seconds = backoff_base.saturating_pow(attempts.clamp(0, 32) as u32);

        let (terminal_state, duration_secs, outcome_msg) = match exec_outcome {
            Ok(result) => match result.status {
                ExecutionStatus::Success if result.exit_code == Some(0) => {
                    let _ = self.queue.add_job_log(&job.id, "completed").await;
                    self.queue.mark_job_completed(&job.id).await?;
                    ("completed".to_string(), result.duration.as_secs_f64(), None)
                }
                ExecutionStatus::Timeout | ExecutionStatus::Killed => {
                    let _ = self.queue.add_job_log(&job.id, "killed: timeout").await;
                    self.queue
                        .mark_job_failed(&job.id, "timeout", attempts, job.max_retries, backoff_seconds)
                        .await?;
                    (
                        "timeout".to_string(),
                        result.duration.as_secs_f64(),
                        Some("timeout".to_string()),
                    )
                }
                _ => {
                    let code = result.exit_code.unwrap_or(-1);
                    let msg = format!("exit={code}");
                    let _ = self.queue.add_job_log(&job.id, &msg).await;
                    self.queue
                        .mark_job_failed(&job.id, &msg, attempts, job.max_retries, backoff_seconds)
                        .await?;
                    ("failed".to_string(), result.duration.as_secs_f64(), Some(msg))
                }
            },
            Err(spawn_err) => {
                let msg = spawn_err.to_string();
                let _ = self
                    .queue
                    .add_job_log(&job.id, &format!("spawn failed: {msg}"))
                    .await;
                self.queue
                    .mark_job_failed(&job.id, &msg, attempts, job.max_retries, backoff_seconds)
                    .await?;
                ("failed".to_string(), 0.0, Some(msg))
            }
        };

        self.queue
            .record_metric(&JobMetric {
                job_id: job.id.clone(),
                command: job.command.clone(),
                terminal_state: terminal_state.clone(),
                duration_secs,
                worker_id: self.id.clone(),
                completed_at: self.clock.now(),
            })
            .await?;

        let _ = self
            .queue
            .add_job_log(
                &job.id,
                &format!(
                    "terminal: {terminal_state}{}",
                    outcome_msg.map(|m| format!(" ({m})")).unwrap_or_default()
                ),
            )
            .await;
        Ok(())
    }

    /// Blocks until the job in flight (if any) finishes. Never aborts it —
    /// timeout is the only bound on in-flight latency (SPEC_FULL §4.4 "Stop").
    pub async fn wait_drained(&self) {
        while self.in_progress.load(Ordering::SeqCst) {
            sleep(SHUTDOWN_POLL_INTERVAL).await;
        }
    }
}
