// Maintenance port: upkeep for a store that otherwise grows without bound.
// Ambient addition (SPEC_FULL §4.7) — the spec's JobLog/JobMetric tables
// need pruning even though the distilled spec never names this concern.

use crate::error::Result;
use async_trait::async_trait;

/// Snapshot of store size, used to decide whether a VACUUM is worthwhile.
#[derive(Debug, Clone)]
pub struct MaintenanceStats {
    pub db_size_mb: f64,
    pub db_size_bytes: i64,
    pub job_count: i64,
    pub completed_job_count: i64,
    pub dead_job_count: i64,
}

#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Keep `completed` jobs (and their cascaded logs/metrics) for this many
    /// days before `gc_completed_jobs` deletes them. `dead` jobs are never
    /// auto-deleted — only `clear_dead_jobs` removes them.
    pub completed_job_retention_days: i64,

    /// Only VACUUM when the store exceeds this size.
    pub max_db_size_mb: f64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            completed_job_retention_days: 7,
            max_db_size_mb: 1000.0,
        }
    }
}

#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Reclaims space via `VACUUM`. Returns MB reclaimed.
    async fn vacuum(&self) -> Result<f64>;

    /// Deletes `completed` jobs older than `retention_days` (cascades to
    /// their logs and metrics). Returns the number of jobs deleted.
    async fn gc_completed_jobs(&self, retention_days: i64) -> Result<i64>;

    async fn get_stats(&self) -> Result<MaintenanceStats>;

    /// Runs GC, then VACUUMs only if the store is still over the configured
    /// size threshold.
    async fn run_full_maintenance(&self, config: &MaintenanceConfig) -> Result<MaintenanceStats> {
        let stats_before = self.get_stats().await?;
        let deleted_jobs = self
            .gc_completed_jobs(config.completed_job_retention_days)
            .await?;

        let reclaimed_mb = if stats_before.db_size_mb > config.max_db_size_mb {
            self.vacuum().await?
        } else {
            0.0
        };

        let stats_after = self.get_stats().await?;
        tracing::info!(
            deleted_jobs = deleted_jobs,
            reclaimed_mb = reclaimed_mb,
            db_size_mb = stats_after.db_size_mb,
            "maintenance completed"
        );
        Ok(stats_after)
    }
}
