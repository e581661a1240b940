// SQLite-backed JobRepository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobq_core::domain::{Job, JobId, JobState};
use jobq_core::error::{AppError, Result};
use jobq_core::port::job_repository::{JobLogLine, JobMetric, MetricsSummary, StatusSummary};
use jobq_core::port::JobRepository;
use sqlx::SqlitePool;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                AppError::Store(format!("database error [{}]: {}", code, db_err.message()))
            } else {
                AppError::Store(format!("database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Store("row not found".to_string()),
        _ => AppError::Store(err.to_string()),
    }
}

fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    command: String,
    state: String,
    attempts: i64,
    max_retries: i64,
    priority: i64,
    created_at: String,
    updated_at: String,
    run_at: Option<String>,
    next_run_at: Option<String>,
    worker_id: Option<String>,
    last_error: Option<String>,
}

impl JobRow {
    fn into_job(self) -> Job {
        Job {
            id: self.id,
            command: self.command,
            state: JobState::from_str(&self.state).unwrap_or(JobState::Waiting),
            attempts: self.attempts,
            max_retries: self.max_retries,
            priority: self.priority as i32,
            created_at: parse_ts(&self.created_at),
            updated_at: parse_ts(&self.updated_at),
            run_at: self.run_at.as_deref().map(parse_ts),
            next_run_at: self.next_run_at.as_deref().map(parse_ts),
            worker_id: self.worker_id,
            last_error: self.last_error,
        }
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn insert(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, command, state, attempts, max_retries, priority,
                created_at, updated_at, run_at, next_run_at, worker_id, last_error
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.command)
        .bind(job.state.as_str())
        .bind(job.attempts)
        .bind(job.max_retries)
        .bind(job.priority)
        .bind(to_rfc3339(job.created_at))
        .bind(to_rfc3339(job.updated_at))
        .bind(job.run_at.map(to_rfc3339))
        .bind(job.next_run_at.map(to_rfc3339))
        .bind(&job.worker_id)
        .bind(&job.last_error)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(JobRow::into_job))
    }

    /// The claim-race primitive. The inner `SELECT ... LIMIT 1` picks the
    /// single highest-priority runnable row; the outer `UPDATE` commits
    /// atomically, so a losing concurrent claim simply updates zero rows.
    async fn fetch_next_job_for_processing(&self, worker_id: &str) -> Result<Option<Job>> {
        let now = to_rfc3339(Utc::now());

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs
            SET state = 'processing', worker_id = ?, updated_at = ?
            WHERE id = (
                SELECT id FROM jobs
                WHERE state = 'pending'
                  AND (run_at IS NULL OR run_at <= ?)
                  AND (next_run_at IS NULL OR next_run_at <= ?)
                ORDER BY
                    priority ASC,
                    (run_at IS NULL) ASC,
                    run_at ASC,
                    created_at ASC
                LIMIT 1
            )
            AND state = 'pending'
            RETURNING *
            "#,
        )
        .bind(worker_id)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(JobRow::into_job))
    }

    async fn mark_job_completed(&self, id: &JobId, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE jobs SET state = 'completed', worker_id = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(to_rfc3339(now))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn mark_job_failed(
        &self,
        id: &JobId,
        err_msg: &str,
        attempts: i32,
        next_run_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let state = if next_run_at.is_some() {
            JobState::Waiting
        } else {
            JobState::Dead
        };

        sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?, attempts = ?, next_run_at = ?, last_error = ?,
                worker_id = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(state.as_str())
        .bind(attempts as i64)
        .bind(next_run_at.map(to_rfc3339))
        .bind(err_msg)
        .bind(to_rfc3339(now))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn activate_scheduled_jobs(&self, now: DateTime<Utc>) -> Result<u64> {
        let now_str = to_rfc3339(now);
        let result = sqlx::query(
            "UPDATE jobs SET state = 'pending', updated_at = ? WHERE state = 'scheduled' AND run_at <= ?",
        )
        .bind(&now_str)
        .bind(&now_str)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn reactivate_waiting_jobs(&self, now: DateTime<Utc>) -> Result<u64> {
        let now_str = to_rfc3339(now);
        let result = sqlx::query(
            "UPDATE jobs SET state = 'pending', updated_at = ? WHERE state = 'waiting' AND next_run_at <= ?",
        )
        .bind(&now_str)
        .bind(&now_str)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn retry_dead_job(&self, id: &JobId, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'pending', attempts = 0, next_run_at = NULL, last_error = NULL, updated_at = ?
            WHERE id = ? AND state = 'dead'
            "#,
        )
        .bind(to_rfc3339(now))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn retry_all_dead_jobs(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'pending', attempts = 0, next_run_at = NULL, last_error = NULL, updated_at = ?
            WHERE state = 'dead'
            "#,
        )
        .bind(to_rfc3339(now))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn clear_dead_jobs(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM jobs WHERE state = 'dead'")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn list_jobs(&self, state: Option<JobState>) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = match state {
            Some(s) => {
                sqlx::query_as("SELECT * FROM jobs WHERE state = ? ORDER BY created_at ASC")
                    .bind(s.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query_as("SELECT * FROM jobs ORDER BY created_at ASC")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(JobRow::into_job).collect())
    }

    async fn get_status_summary(&self, now: DateTime<Utc>) -> Result<StatusSummary> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM jobs GROUP BY state")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        let mut summary = StatusSummary::default();
        for (state, count) in rows {
            match JobState::from_str(&state) {
                Some(JobState::Scheduled) => summary.scheduled = count,
                Some(JobState::Pending) => summary.pending = count,
                Some(JobState::Processing) => summary.processing = count,
                Some(JobState::Waiting) => summary.waiting = count,
                Some(JobState::Completed) => summary.completed = count,
                Some(JobState::Dead) => summary.dead = count,
                None => {}
            }
        }

        let now_str = to_rfc3339(now);
        let ready_pending: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM jobs
            WHERE state = 'pending'
              AND (run_at IS NULL OR run_at <= ?)
              AND (next_run_at IS NULL OR next_run_at <= ?)
            "#,
        )
        .bind(&now_str)
        .bind(&now_str)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        summary.ready_pending = ready_pending;

        Ok(summary)
    }

    async fn add_job_log(&self, job_id: &JobId, message: &str, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("INSERT INTO job_logs (job_id, message, recorded_at) VALUES (?, ?, ?)")
            .bind(job_id)
            .bind(message)
            .bind(to_rfc3339(now))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get_job_logs(&self, job_id: &JobId) -> Result<Vec<JobLogLine>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT message, recorded_at FROM job_logs WHERE job_id = ? ORDER BY id ASC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|(message, recorded_at)| JobLogLine {
                message,
                recorded_at: parse_ts(&recorded_at),
            })
            .collect())
    }

    async fn record_metric(&self, metric: &JobMetric) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO job_metrics (job_id, command, terminal_state, duration_secs, worker_id, completed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id) DO UPDATE SET
                command = excluded.command,
                terminal_state = excluded.terminal_state,
                duration_secs = excluded.duration_secs,
                worker_id = excluded.worker_id,
                completed_at = excluded.completed_at
            "#,
        )
        .bind(&metric.job_id)
        .bind(&metric.command)
        .bind(&metric.terminal_state)
        .bind(metric.duration_secs)
        .bind(&metric.worker_id)
        .bind(to_rfc3339(metric.completed_at))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get_metrics_summary(&self) -> Result<MetricsSummary> {
        let row: (i64, i64, i64, Option<f64>, Option<f64>) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN terminal_state = 'completed' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN terminal_state != 'completed' THEN 1 ELSE 0 END), 0),
                AVG(duration_secs),
                MAX(duration_secs)
            FROM job_metrics
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(MetricsSummary {
            total_executions: row.0,
            succeeded: row.1,
            failed: row.2,
            avg_duration_secs: row.3.unwrap_or(0.0),
            max_duration_secs: row.4.unwrap_or(0.0),
        })
    }

    async fn recover_orphaned_jobs(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET state = 'pending', worker_id = NULL, updated_at = ? WHERE state = 'processing'",
        )
        .bind(to_rfc3339(now))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};

    async fn setup() -> SqliteJobRepository {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteJobRepository::new(pool)
    }

    #[tokio::test]
    async fn insert_and_get_job() {
        let repo = setup().await;
        let job = Job::new_test("echo hello");
        repo.insert(&job).await.unwrap();

        let found = repo.get_job(&job.id).await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().command, "echo hello");
    }

    #[tokio::test]
    async fn fetch_next_job_claims_highest_priority() {
        let repo = setup().await;
        let mut low = Job::new_test("low");
        low.priority = 200;
        let mut high = Job::new_test("high");
        high.priority = 1;

        repo.insert(&low).await.unwrap();
        repo.insert(&high).await.unwrap();

        let claimed = repo
            .fetch_next_job_for_processing("worker-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.id, high.id);
        assert_eq!(claimed.state, JobState::Processing);
        assert_eq!(claimed.worker_id.as_deref(), Some("worker-1"));
    }

    #[tokio::test]
    async fn fetch_next_job_returns_none_when_empty() {
        let repo = setup().await;
        assert!(repo
            .fetch_next_job_for_processing("worker-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn concurrent_claims_never_double_assign() {
        let repo = std::sync::Arc::new(setup().await);
        let job = Job::new_test("contested");
        repo.insert(&job).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let repo = std::sync::Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.fetch_next_job_for_processing(&format!("worker-{i}"))
                    .await
                    .unwrap()
            }));
        }

        let mut claims = 0;
        for h in handles {
            if h.await.unwrap().is_some() {
                claims += 1;
            }
        }
        assert_eq!(claims, 1);
    }

    #[tokio::test]
    async fn mark_job_failed_waiting_then_dead() {
        let repo = setup().await;
        let mut job = Job::new_test("flaky");
        job.max_retries = 1;
        repo.insert(&job).await.unwrap();

        let now = Utc::now();
        repo.mark_job_failed(&job.id, "boom", 1, Some(now + chrono::Duration::seconds(2)), now)
            .await
            .unwrap();
        let waiting = repo.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(waiting.state, JobState::Waiting);

        repo.mark_job_failed(&job.id, "boom again", 2, None, now)
            .await
            .unwrap();
        let dead = repo.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(dead.state, JobState::Dead);
    }

    #[tokio::test]
    async fn retry_dead_job_resets_attempts() {
        let repo = setup().await;
        let job = Job::new_test("to-retry");
        repo.insert(&job).await.unwrap();
        repo.mark_job_failed(&job.id, "err", 99, None, Utc::now())
            .await
            .unwrap();

        let retried = repo.retry_dead_job(&job.id, Utc::now()).await.unwrap();
        assert!(retried);
        let row = repo.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(row.state, JobState::Pending);
        assert_eq!(row.attempts, 0);
    }

    #[tokio::test]
    async fn job_logs_append_in_order() {
        let repo = setup().await;
        let job = Job::new_test("logged");
        repo.insert(&job).await.unwrap();

        repo.add_job_log(&job.id, "line one", Utc::now()).await.unwrap();
        repo.add_job_log(&job.id, "line two", Utc::now()).await.unwrap();

        let logs = repo.get_job_logs(&job.id).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "line one");
        assert_eq!(logs[1].message, "line two");
    }

    #[tokio::test]
    async fn recover_orphaned_jobs_clears_processing() {
        let repo = setup().await;
        let job = Job::new_test("orphaned");
        repo.insert(&job).await.unwrap();
        repo.fetch_next_job_for_processing("dead-worker")
            .await
            .unwrap();

        let recovered = repo.recover_orphaned_jobs(Utc::now()).await.unwrap();
        assert_eq!(recovered, 1);
        let row = repo.get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(row.state, JobState::Pending);
        assert!(row.worker_id.is_none());
    }
}
