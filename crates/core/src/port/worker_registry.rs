// WorkerRegistry port: the `workers` table (SPEC_FULL §3/§4.5). Distinct
// from JobRepository because heartbeats are WorkerManager's concern, not
// the Queue API's — the Queue API never reads or writes this table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct WorkerRow {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
}

#[async_trait]
pub trait WorkerRegistry: Send + Sync {
    async fn register_worker(&self, id: &str, now: DateTime<Utc>) -> Result<()>;
    async fn touch_heartbeat(&self, id: &str, now: DateTime<Utc>) -> Result<()>;
    async fn remove_worker(&self, id: &str) -> Result<()>;
    async fn list_workers(&self) -> Result<Vec<WorkerRow>>;
}
