// SQLite-backed Maintenance implementation (SPEC_FULL §4.5).

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use jobq_core::error::{AppError, Result};
use jobq_core::port::{Maintenance, MaintenanceStats};
use sqlx::SqlitePool;
use tracing::info;

pub struct SqliteMaintenance {
    pool: SqlitePool,
}

impl SqliteMaintenance {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn get_db_size(&self) -> Result<f64> {
        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to get page count: {e}")))?;

        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to get page size: {e}")))?;

        Ok((page_count * page_size) as f64 / (1024.0 * 1024.0))
    }
}

#[async_trait]
impl Maintenance for SqliteMaintenance {
    async fn vacuum(&self) -> Result<f64> {
        info!("running VACUUM");
        let size_before = self.get_db_size().await?;

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("VACUUM failed: {e}")))?;

        let size_after = self.get_db_size().await?;
        let reclaimed = (size_before - size_after).max(0.0);
        info!(reclaimed_mb = reclaimed, "VACUUM completed");
        Ok(reclaimed)
    }

    async fn gc_completed_jobs(&self, retention_days: i64) -> Result<i64> {
        let cutoff = (Utc::now() - ChronoDuration::days(retention_days)).to_rfc3339();

        let result = sqlx::query("DELETE FROM jobs WHERE state = 'completed' AND updated_at < ?")
            .bind(&cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("completed-job GC failed: {e}")))?;

        let deleted = result.rows_affected() as i64;
        info!(deleted_jobs = deleted, retention_days, "completed-job GC finished");
        Ok(deleted)
    }

    async fn get_stats(&self) -> Result<MaintenanceStats> {
        let db_size_mb = self.get_db_size().await?;
        let db_size_bytes = (db_size_mb * 1024.0 * 1024.0) as i64;

        let job_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("failed to count jobs: {e}")))?;

        let completed_job_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE state = 'completed'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::Internal(format!("failed to count completed jobs: {e}")))?;

        let dead_job_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE state = 'dead'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::Internal(format!("failed to count dead jobs: {e}")))?;

        Ok(MaintenanceStats {
            db_size_mb,
            db_size_bytes,
            job_count,
            completed_job_count,
            dead_job_count,
        })
    }
}
