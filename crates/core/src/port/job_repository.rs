// Store port: durable persistence for jobs, logs, and metrics.

use crate::domain::{Job, JobId, JobState};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A single appended execution-log line.
#[derive(Debug, Clone)]
pub struct JobLogLine {
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

/// Histogram returned by `get_status_summary`.
#[derive(Debug, Clone, Default)]
pub struct StatusSummary {
    pub scheduled: i64,
    pub pending: i64,
    pub processing: i64,
    pub waiting: i64,
    pub completed: i64,
    pub dead: i64,
    /// Pending jobs whose `run_at`/`next_run_at` gates are already satisfied.
    pub ready_pending: i64,
}

/// Outcome recorded for one execution attempt, keyed by job id (upserted).
#[derive(Debug, Clone)]
pub struct JobMetric {
    pub job_id: JobId,
    pub command: String,
    pub terminal_state: String,
    pub duration_secs: f64,
    pub worker_id: String,
    pub completed_at: DateTime<Utc>,
}

/// Aggregate execution metrics, returned by `queue.metrics.v1`.
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_executions: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub avg_duration_secs: f64,
    pub max_duration_secs: f64,
}

/// The Store's repository port. Every mutating method is a single atomic
/// statement; partial state is impossible (see SPEC_FULL §4.1/§4.3).
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert(&self, job: &Job) -> Result<()>;

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>>;

    /// Claim the single highest-priority runnable `pending` job for
    /// `worker_id`. Returns `None` if there is nothing runnable, or if the
    /// claim race was lost to another worker.
    async fn fetch_next_job_for_processing(&self, worker_id: &str) -> Result<Option<Job>>;

    async fn mark_job_completed(&self, id: &JobId, now: DateTime<Utc>) -> Result<()>;

    /// `attempts` is the post-increment attempt count; the caller (the
    /// Queue API) decides `waiting` vs `dead` and supplies `next_run_at`
    /// when retrying.
    async fn mark_job_failed(
        &self,
        id: &JobId,
        err_msg: &str,
        attempts: i32,
        next_run_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// `scheduled -> pending` where `run_at <= now`. Returns rows affected.
    async fn activate_scheduled_jobs(&self, now: DateTime<Utc>) -> Result<u64>;

    /// `waiting -> pending` where `next_run_at <= now`. Returns rows affected.
    async fn reactivate_waiting_jobs(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Reset a single `dead` job back to `pending`, `attempts = 0`.
    async fn retry_dead_job(&self, id: &JobId, now: DateTime<Utc>) -> Result<bool>;

    /// Reset every `dead` job back to `pending`. Returns count reset.
    async fn retry_all_dead_jobs(&self, now: DateTime<Utc>) -> Result<u64>;

    async fn clear_dead_jobs(&self) -> Result<u64>;

    async fn list_jobs(&self, state: Option<JobState>) -> Result<Vec<Job>>;

    async fn list_dead_jobs(&self) -> Result<Vec<Job>> {
        self.list_jobs(Some(JobState::Dead)).await
    }

    async fn get_status_summary(&self, now: DateTime<Utc>) -> Result<StatusSummary>;

    async fn add_job_log(&self, job_id: &JobId, message: &str, now: DateTime<Utc>) -> Result<()>;

    async fn get_job_logs(&self, job_id: &JobId) -> Result<Vec<JobLogLine>>;

    async fn record_metric(&self, metric: &JobMetric) -> Result<()>;

    async fn get_metrics_summary(&self) -> Result<MetricsSummary>;

    /// Unconditionally requeue every `processing` job as `pending`,
    /// clearing `worker_id`. Used by `WorkerManager::start` crash recovery;
    /// does not increment `attempts` (SPEC_FULL §4.5/§9).
    async fn recover_orphaned_jobs(&self, now: DateTime<Utc>) -> Result<u64>;
}
