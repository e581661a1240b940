//! RPC request/response DTOs for the methods in SPEC_FULL §6.5.

use jobq_core::domain::Job;
use jobq_core::port::{JobLogLine, MetricsSummary, StatusSummary};
use serde::{Deserialize, Serialize};

/// queue.enqueue.v1
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub id: Option<String>,
    pub command: String,
    pub max_retries: Option<i64>,
    pub priority: Option<i32>,
    pub run_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnqueueResponse {
    pub id: String,
}

/// queue.status.v1
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub scheduled: i64,
    pub pending: i64,
    pub processing: i64,
    pub waiting: i64,
    pub completed: i64,
    pub dead: i64,
    pub ready_pending: i64,
}

impl From<StatusSummary> for StatusResponse {
    fn from(s: StatusSummary) -> Self {
        Self {
            scheduled: s.scheduled,
            pending: s.pending,
            processing: s.processing,
            waiting: s.waiting,
            completed: s.completed,
            dead: s.dead,
            ready_pending: s.ready_pending,
        }
    }
}

/// queue.list.v1 / dlq.list.v1
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRequest {
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub jobs: Vec<Job>,
}

/// queue.logs.v1
#[derive(Debug, Deserialize)]
pub struct JobIdRequest {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogLineDto {
    pub message: String,
    pub recorded_at: String,
}

impl From<JobLogLine> for LogLineDto {
    fn from(l: JobLogLine) -> Self {
        Self {
            message: l.message,
            recorded_at: l.recorded_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogsResponse {
    pub job: Job,
    pub logs: Vec<LogLineDto>,
}

/// queue.metrics.v1
#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub total_executions: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub avg_duration_secs: f64,
    pub max_duration_secs: f64,
}

impl From<MetricsSummary> for MetricsResponse {
    fn from(m: MetricsSummary) -> Self {
        Self {
            total_executions: m.total_executions,
            succeeded: m.succeeded,
            failed: m.failed,
            avg_duration_secs: m.avg_duration_secs,
            max_duration_secs: m.max_duration_secs,
        }
    }
}

/// dlq.retry.v1
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryRequest {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

/// config.get.v1
#[derive(Debug, Deserialize)]
pub struct ConfigGetRequest {
    pub key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigGetResponse {
    pub value: Option<String>,
}

/// config.set.v1
#[derive(Debug, Deserialize)]
pub struct ConfigSetRequest {
    pub key: String,
    pub value: String,
}

/// admin.maintenance.v1
#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceRequest {
    #[serde(default)]
    pub force_vacuum: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceResponse {
    pub db_size_mb: f64,
    pub db_size_bytes: i64,
    pub job_count: i64,
    pub completed_job_count: i64,
    pub dead_job_count: i64,
}
