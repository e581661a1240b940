// Config port: the durable key/value store backing queue-wide settings
// (SPEC_FULL §4.2). Distinct from process bootstrap configuration (DB path,
// RPC port, worker count), which is read from the environment in `daemon`.

use crate::error::Result;
use async_trait::async_trait;

pub const KEY_MAX_RETRIES: &str = "max_retries";
pub const KEY_BACKOFF_BASE: &str = "backoff_base";
pub const KEY_JOB_TIMEOUT: &str = "job_timeout";

pub const DEFAULT_MAX_RETRIES: &str = "3";
pub const DEFAULT_BACKOFF_BASE: &str = "2";
pub const DEFAULT_JOB_TIMEOUT_SECS: &str = "300";

#[async_trait]
pub trait Config: Send + Sync {
    /// Returns the stored value for `key`, or `fallback` if unset.
    async fn get(&self, key: &str, fallback: &str) -> Result<String>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn get_i64(&self, key: &str, fallback: i64) -> Result<i64> {
        let raw = self.get(key, &fallback.to_string()).await?;
        Ok(raw.parse().unwrap_or(fallback))
    }
}
