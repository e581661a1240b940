//! SDK request/response DTOs. Mirrors the JSON-RPC types from `jobq-api-rpc`
//! (SPEC_FULL §6.5); kept independent to avoid a dependency on that crate.

use jobq_core::domain::Job;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnqueueRequest {
    pub id: Option<String>,
    pub command: String,
    pub max_retries: Option<i64>,
    pub priority: Option<i32>,
    pub run_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueResponse {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub scheduled: i64,
    pub pending: i64,
    pub processing: i64,
    pub waiting: i64,
    pub completed: i64,
    pub dead: i64,
    pub ready_pending: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ListRequest {
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobIdRequest {
    pub job_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogLineDto {
    pub message: String,
    pub recorded_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogsResponse {
    pub job: Job,
    pub logs: Vec<LogLineDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsResponse {
    pub total_executions: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub avg_duration_secs: f64,
    pub max_duration_secs: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RetryRequest {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigGetRequest {
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigGetResponse {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSetRequest {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintenanceRequest {
    pub force_vacuum: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceResponse {
    pub db_size_mb: f64,
    pub db_size_bytes: i64,
    pub job_count: i64,
    pub completed_job_count: i64,
    pub dead_job_count: i64,
}
