//! RPC Method Handlers
//!
//! Translates RPC calls into `QueueService`/`Maintenance` calls and wraps
//! the results in the DTOs from `types.rs`.

use std::sync::Arc;
use std::time::Instant;

use jobq_core::application::{EnqueueSpec, QueueService};
use jobq_core::domain::JobState;
use jobq_core::port::{Maintenance, MaintenanceConfig};
use jobq_core::{AppError, Result};

use crate::rate_limiter::RateLimiter;
use crate::types::*;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    queue: Arc<QueueService>,
    maintenance: Arc<dyn Maintenance>,
    maintenance_config: MaintenanceConfig,
    pub(crate) rate_limiter: Arc<RateLimiter>,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(queue: Arc<QueueService>, maintenance: Arc<dyn Maintenance>) -> Self {
        let burst: u32 = std::env::var("JOBQ_RATE_LIMIT_BURST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(200);
        let rate: u32 = std::env::var("JOBQ_RATE_LIMIT_RATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        Self {
            queue,
            maintenance,
            maintenance_config: MaintenanceConfig::default(),
            rate_limiter: Arc::new(RateLimiter::new(burst, rate)),
            start_time: Instant::now(),
        }
    }

    #[allow(dead_code)]
    pub fn uptime_seconds(&self) -> i64 {
        self.start_time.elapsed().as_secs() as i64
    }

    pub async fn enqueue(&self, req: EnqueueRequest) -> Result<EnqueueResponse> {
        let id = self
            .queue
            .enqueue(EnqueueSpec {
                id: req.id,
                command: req.command,
                max_retries: req.max_retries,
                priority: req.priority,
                run_at: req.run_at,
            })
            .await?;
        Ok(EnqueueResponse { id })
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        Ok(self.queue.get_status_summary().await?.into())
    }

    pub async fn list(&self, req: ListRequest) -> Result<ListResponse> {
        let state = req.state.as_deref().map(parse_state).transpose()?;
        Ok(ListResponse {
            jobs: self.queue.list_jobs(state).await?,
        })
    }

    pub async fn logs(&self, req: JobIdRequest) -> Result<LogsResponse> {
        let job = self
            .queue
            .get_job(&req.job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job not found: {}", req.job_id)))?;
        let logs = self
            .queue
            .get_job_logs(&req.job_id)
            .await?
            .into_iter()
            .map(LogLineDto::from)
            .collect();
        Ok(LogsResponse { job, logs })
    }

    pub async fn metrics(&self) -> Result<MetricsResponse> {
        Ok(self.queue.get_metrics_summary().await?.into())
    }

    pub async fn dlq_list(&self) -> Result<ListResponse> {
        Ok(ListResponse {
            jobs: self.queue.list_dead_jobs().await?,
        })
    }

    pub async fn dlq_retry(&self, req: RetryRequest) -> Result<CountResponse> {
        let count = self.queue.retry_dead_job(req.id.as_ref()).await?;
        Ok(CountResponse { count })
    }

    pub async fn dlq_clear(&self) -> Result<CountResponse> {
        let count = self.queue.clear_dead_jobs().await?;
        Ok(CountResponse { count })
    }

    pub async fn config_get(&self, req: ConfigGetRequest) -> Result<ConfigGetResponse> {
        Ok(ConfigGetResponse {
            value: self.queue.get_config(&req.key).await?,
        })
    }

    pub async fn config_set(&self, req: ConfigSetRequest) -> Result<()> {
        self.queue.set_config(&req.key, &req.value).await
    }

    pub async fn maintenance(&self, req: MaintenanceRequest) -> Result<MaintenanceResponse> {
        let stats = if req.force_vacuum {
            self.maintenance
                .gc_completed_jobs(self.maintenance_config.completed_job_retention_days)
                .await?;
            self.maintenance.vacuum().await?;
            self.maintenance.get_stats().await?
        } else {
            self.maintenance
                .run_full_maintenance(&self.maintenance_config)
                .await?
        };
        Ok(MaintenanceResponse {
            db_size_mb: stats.db_size_mb,
            db_size_bytes: stats.db_size_bytes,
            job_count: stats.job_count,
            completed_job_count: stats.completed_job_count,
            dead_job_count: stats.dead_job_count,
        })
    }
}

fn parse_state(raw: &str) -> Result<JobState> {
    JobState::from_str(raw).ok_or_else(|| AppError::InvalidInput(format!("unknown job state: {raw}")))
}
