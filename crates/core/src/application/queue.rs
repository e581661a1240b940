// Queue API - the authoritative state machine over the Store (SPEC_FULL §4.3).
// Every mutating method maps to a single atomic statement on JobRepository;
// this layer owns only the business rules around that statement (defaults,
// run_at interpretation, waiting-vs-dead classification).

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};

use crate::domain::{Job, JobId, JobState, Priority, DEFAULT_PRIORITY};
use crate::error::{AppError, Result};
use crate::port::config::{KEY_BACKOFF_BASE, KEY_JOB_TIMEOUT, KEY_MAX_RETRIES};
use crate::port::{
    Clock, Config, IdProvider, JobLogLine, JobMetric, JobRepository, MetricsSummary, StatusSummary,
};

const MAX_COMMAND_LEN: usize = 32 * 1024;

/// Caller-supplied fields for `enqueue`; everything but `command` is optional
/// and defaulted per SPEC_FULL §4.3.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnqueueSpec {
    pub id: Option<JobId>,
    pub command: String,
    pub max_retries: Option<i64>,
    pub priority: Option<Priority>,
    /// Raw caller string; naked (timezone-less) timestamps are interpreted
    /// at the fixed +05:30 offset by `Clock::parse_user_time`.
    pub run_at: Option<String>,
}

pub struct QueueService {
    repo: Arc<dyn JobRepository>,
    config: Arc<dyn Config>,
    clock: Arc<dyn Clock>,
    id_provider: Arc<dyn IdProvider>,
}

impl QueueService {
    pub fn new(
        repo: Arc<dyn JobRepository>,
        config: Arc<dyn Config>,
        clock: Arc<dyn Clock>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            repo,
            config,
            clock,
            id_provider,
        }
    }

    pub async fn enqueue(&self, spec: EnqueueSpec) -> Result<JobId> {
        if spec.command.trim().is_empty() {
            return Err(AppError::InvalidInput("command must not be empty".into()));
        }
        if spec.command.len() > MAX_COMMAND_LEN {
            return Err(AppError::InvalidInput(format!(
                "command too long (max {MAX_COMMAND_LEN} bytes)"
            )));
        }
        if let Some(mr) = spec.max_retries {
            if mr < 0 {
                return Err(AppError::InvalidInput(
                    "max_retries must be >= 0".into(),
                ));
            }
        }

        let id = spec.id.unwrap_or_else(|| self.id_provider.generate_id());
        if self.repo.get_job(&id).await?.is_some() {
            return Err(AppError::DuplicateId(id));
        }

        let max_retries = match spec.max_retries {
            Some(mr) => mr,
            None => self.config.get_i64(KEY_MAX_RETRIES, 3).await?,
        };
        let priority = spec.priority.unwrap_or(DEFAULT_PRIORITY);

        let run_at = spec
            .run_at
            .as_deref()
            .map(|raw| self.clock.parse_user_time(raw))
            .transpose()?;

        let now = self.clock.now();
        let state = match run_at {
            Some(ra) if ra > now => JobState::Scheduled,
            _ => JobState::Pending,
        };

        let job = Job::new(id.clone(), spec.command, state, max_retries, priority, now, run_at);
        self.repo.insert(&job).await?;
        Ok(id)
    }

    pub async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
        self.repo.get_job(id).await
    }

    /// The dispatch primitive. See SPEC_FULL §4.3.
    pub async fn fetch_next_job_for_processing(&self, worker_id: &str) -> Result<Option<Job>> {
        self.repo.fetch_next_job_for_processing(worker_id).await
    }

    pub async fn mark_job_completed(&self, id: &JobId) -> Result<()> {
        let now = self.clock.now();
        self.repo.mark_job_completed(id, now).await
    }

    /// `attempts` is the post-increment attempt count for this execution;
    /// `max_retries` is the job's configured cap. A job becomes `dead` once
    /// `attempts > max_retries`; otherwise it waits `backoff_seconds` before
    /// becoming runnable again.
    pub async fn mark_job_failed(
        &self,
        id: &JobId,
        err_msg: &str,
        attempts: i64,
        max_retries: i64,
        backoff_seconds: i64,
    ) -> Result<()> {
        let now = self.clock.now();
        let next_run_at = if attempts > max_retries {
            None
        } else {
            Some(now + ChronoDuration::seconds(backoff_seconds))
        };
        self.repo
            .mark_job_failed(id, err_msg, attempts as i32, next_run_at, now)
            .await
    }

    pub async fn activate_scheduled_jobs(&self) -> Result<u64> {
        self.repo.activate_scheduled_jobs(self.clock.now()).await
    }

    pub async fn reactivate_waiting_jobs(&self) -> Result<u64> {
        self.repo.reactivate_waiting_jobs(self.clock.now()).await
    }

    /// `id = None` retries every dead job; `id = Some` retries exactly one
    /// and raises `NOT_FOUND` if it isn't dead.
    pub async fn retry_dead_job(&self, id: Option<&JobId>) -> Result<u64> {
        let now = self.clock.now();
        match id {
            Some(id) => {
                if self.repo.retry_dead_job(id, now).await? {
                    Ok(1)
                } else {
                    Err(AppError::NotFound(format!("dead job not found: {id}")))
                }
            }
            None => self.repo.retry_all_dead_jobs(now).await,
        }
    }

    pub async fn clear_dead_jobs(&self) -> Result<u64> {
        self.repo.clear_dead_jobs().await
    }

    /// `processing -> pending` for every row, clearing `worker_id`. Called
    /// once by `WorkerManager::start` before any worker is spawned.
    pub async fn recover_orphaned_jobs(&self) -> Result<u64> {
        self.repo.recover_orphaned_jobs(self.clock.now()).await
    }

    pub async fn list_jobs(&self, state: Option<JobState>) -> Result<Vec<Job>> {
        self.repo.list_jobs(state).await
    }

    pub async fn list_dead_jobs(&self) -> Result<Vec<Job>> {
        self.repo.list_dead_jobs().await
    }

    pub async fn get_status_summary(&self) -> Result<StatusSummary> {
        self.repo.get_status_summary(self.clock.now()).await
    }

    pub async fn add_job_log(&self, job_id: &JobId, message: &str) -> Result<()> {
        if self.repo.get_job(job_id).await?.is_none() {
            return Err(AppError::NotFound(format!("job not found: {job_id}")));
        }
        self.repo.add_job_log(job_id, message, self.clock.now()).await
    }

    pub async fn get_job_logs(&self, job_id: &JobId) -> Result<Vec<JobLogLine>> {
        if self.repo.get_job(job_id).await?.is_none() {
            return Err(AppError::NotFound(format!("job not found: {job_id}")));
        }
        self.repo.get_job_logs(job_id).await
    }

    pub async fn record_metric(&self, metric: &JobMetric) -> Result<()> {
        self.repo.record_metric(metric).await
    }

    pub async fn get_metrics_summary(&self) -> Result<MetricsSummary> {
        self.repo.get_metrics_summary().await
    }

    pub async fn get_config(&self, key: &str) -> Result<Option<String>> {
        // Config::get always returns a value (fallback on miss); the Queue
        // API surfaces "unset" as None for CLI/RPC by probing with a
        // sentinel-free fallback only the caller can't confuse with a real
        // value — simplest to just delegate and let the caller supply its
        // own fallback via `Config` directly when that distinction matters.
        Ok(Some(self.config.get(key, "").await?).filter(|v| !v.is_empty()))
    }

    pub async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.config.set(key, value).await
    }

    pub async fn job_timeout_secs(&self) -> Result<i64> {
        self.config
            .get_i64(KEY_JOB_TIMEOUT, 300)
            .await
    }

    pub async fn backoff_base(&self) -> Result<i64> {
        self.config.get_i64(KEY_BACKOFF_BASE, 2).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::clock::mocks::FixedClock;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct InMemoryConfig(Mutex<HashMap<String, String>>);

    impl InMemoryConfig {
        fn new() -> Self {
            Self(Mutex::new(HashMap::new()))
        }
    }

    #[async_trait::async_trait]
    impl Config for InMemoryConfig {
        async fn get(&self, key: &str, fallback: &str) -> Result<String> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .unwrap_or_else(|| fallback.to_string()))
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            self.0
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    struct FakeIds(Mutex<u64>);

    impl IdProvider for FakeIds {
        fn generate_id(&self) -> String {
            let mut n = self.0.lock().unwrap();
            *n += 1;
            format!("fake-{n}")
        }
    }

    /// Minimal in-memory JobRepository, enough to exercise QueueService's
    /// business rules without a SQLite pool.
    struct InMemoryRepo(Mutex<HashMap<JobId, Job>>);

    impl InMemoryRepo {
        fn new() -> Self {
            Self(Mutex::new(HashMap::new()))
        }
    }

    #[async_trait::async_trait]
    impl JobRepository for InMemoryRepo {
        async fn insert(&self, job: &Job) -> Result<()> {
            self.0.lock().unwrap().insert(job.id.clone(), job.clone());
            Ok(())
        }

        async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
            Ok(self.0.lock().unwrap().get(id).cloned())
        }

        async fn fetch_next_job_for_processing(&self, _worker_id: &str) -> Result<Option<Job>> {
            unimplemented!("not exercised by these unit tests")
        }

        async fn mark_job_completed(&self, id: &JobId, now: chrono::DateTime<Utc>) -> Result<()> {
            let mut map = self.0.lock().unwrap();
            let job = map.get_mut(id).unwrap();
            job.state = JobState::Completed;
            job.updated_at = now;
            Ok(())
        }

        async fn mark_job_failed(
            &self,
            id: &JobId,
            err_msg: &str,
            attempts: i32,
            next_run_at: Option<chrono::DateTime<Utc>>,
            now: chrono::DateTime<Utc>,
        ) -> Result<()> {
            let mut map = self.0.lock().unwrap();
            let job = map.get_mut(id).unwrap();
            job.attempts = attempts as i64;
            job.last_error = Some(err_msg.to_string());
            job.updated_at = now;
            job.worker_id = None;
            match next_run_at {
                Some(nra) => {
                    job.state = JobState::Waiting;
                    job.next_run_at = Some(nra);
                }
                None => {
                    job.state = JobState::Dead;
                    job.next_run_at = None;
                }
            }
            Ok(())
        }

        async fn activate_scheduled_jobs(&self, _now: chrono::DateTime<Utc>) -> Result<u64> {
            Ok(0)
        }

        async fn reactivate_waiting_jobs(&self, _now: chrono::DateTime<Utc>) -> Result<u64> {
            Ok(0)
        }

        async fn retry_dead_job(&self, id: &JobId, now: chrono::DateTime<Utc>) -> Result<bool> {
            let mut map = self.0.lock().unwrap();
            match map.get_mut(id) {
                Some(job) if job.state == JobState::Dead => {
                    job.state = JobState::Pending;
                    job.attempts = 0;
                    job.next_run_at = None;
                    job.last_error = None;
                    job.updated_at = now;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn retry_all_dead_jobs(&self, _now: chrono::DateTime<Utc>) -> Result<u64> {
            Ok(0)
        }

        async fn clear_dead_jobs(&self) -> Result<u64> {
            Ok(0)
        }

        async fn list_jobs(&self, state: Option<JobState>) -> Result<Vec<Job>> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .values()
                .filter(|j| match state {
                    Some(s) => j.state == s,
                    None => true,
                })
                .cloned()
                .collect())
        }

        async fn get_status_summary(&self, _now: chrono::DateTime<Utc>) -> Result<StatusSummary> {
            Ok(StatusSummary::default())
        }

        async fn add_job_log(
            &self,
            _job_id: &JobId,
            _message: &str,
            _now: chrono::DateTime<Utc>,
        ) -> Result<()> {
            Ok(())
        }

        async fn get_job_logs(&self, _job_id: &JobId) -> Result<Vec<JobLogLine>> {
            Ok(vec![])
        }

        async fn record_metric(&self, _metric: &JobMetric) -> Result<()> {
            Ok(())
        }

        async fn get_metrics_summary(&self) -> Result<MetricsSummary> {
            Ok(MetricsSummary::default())
        }

        async fn recover_orphaned_jobs(&self, _now: chrono::DateTime<Utc>) -> Result<u64> {
            Ok(0)
        }
    }

    fn service(now: chrono::DateTime<Utc>) -> QueueService {
        QueueService::new(
            Arc::new(InMemoryRepo::new()),
            Arc::new(InMemoryConfig::new()),
            Arc::new(FixedClock::new(now)),
            Arc::new(FakeIds(Mutex::new(0))),
        )
    }

    #[tokio::test]
    async fn enqueue_rejects_empty_command() {
        let svc = service(Utc::now());
        let err = svc
            .enqueue(EnqueueSpec {
                command: "   ".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn enqueue_defaults_to_pending_without_run_at() {
        let svc = service(Utc::now());
        let id = svc
            .enqueue(EnqueueSpec {
                command: "echo hi".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let job = svc.get_job(&id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.priority, DEFAULT_PRIORITY);
        assert_eq!(job.attempts, 0);
    }

    #[tokio::test]
    async fn enqueue_future_run_at_is_scheduled() {
        let now = Utc::now();
        let svc = service(now);
        let future = (now + ChronoDuration::seconds(60)).to_rfc3339();
        let id = svc
            .enqueue(EnqueueSpec {
                command: "echo hi".into(),
                run_at: Some(future),
                ..Default::default()
            })
            .await
            .unwrap();
        let job = svc.get_job(&id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Scheduled);
    }

    #[tokio::test]
    async fn enqueue_run_at_exactly_now_is_pending() {
        let now = Utc::now();
        let svc = service(now);
        let id = svc
            .enqueue(EnqueueSpec {
                command: "echo hi".into(),
                run_at: Some(now.to_rfc3339()),
                ..Default::default()
            })
            .await
            .unwrap();
        let job = svc.get_job(&id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Pending);
    }

    #[tokio::test]
    async fn enqueue_duplicate_id_is_rejected() {
        let svc = service(Utc::now());
        svc.enqueue(EnqueueSpec {
            id: Some("dup".into()),
            command: "echo hi".into(),
            ..Default::default()
        })
        .await
        .unwrap();
        let err = svc
            .enqueue(EnqueueSpec {
                id: Some("dup".into()),
                command: "echo hi".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateId(_)));
    }

    #[tokio::test]
    async fn mark_job_failed_goes_dead_once_retries_exhausted() {
        let svc = service(Utc::now());
        let id = svc
            .enqueue(EnqueueSpec {
                command: "false".into(),
                max_retries: Some(0),
                ..Default::default()
            })
            .await
            .unwrap();
        svc.mark_job_failed(&id, "exit=1", 1, 0, 2).await.unwrap();
        let job = svc.get_job(&id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Dead);
    }

    #[tokio::test]
    async fn mark_job_failed_waits_when_retries_remain() {
        let svc = service(Utc::now());
        let id = svc
            .enqueue(EnqueueSpec {
                command: "false".into(),
                max_retries: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        svc.mark_job_failed(&id, "exit=1", 1, 2, 2).await.unwrap();
        let job = svc.get_job(&id).await.unwrap().unwrap();
        assert_eq!(job.state, JobState::Waiting);
        assert!(job.next_run_at.is_some());
    }

    #[tokio::test]
    async fn retry_dead_job_not_found_on_non_dead_job() {
        let svc = service(Utc::now());
        let id = svc
            .enqueue(EnqueueSpec {
                command: "echo hi".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let err = svc.retry_dead_job(Some(&id)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
