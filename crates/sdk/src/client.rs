//! Client implementation: a thin typed wrapper over `jsonrpsee`'s HTTP
//! client, one method per JSON-RPC operation in SPEC_FULL §6.5.

use crate::error::Result;
use crate::types::*;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use std::time::Duration;

/// Client for the job queue daemon's JSON-RPC endpoint.
///
/// # Example
///
/// ```no_run
/// use jobq_sdk::JobqClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = JobqClient::connect("http://127.0.0.1:7878").await?;
/// # Ok(())
/// # }
/// ```
pub struct JobqClient {
    client: HttpClient,
}

impl JobqClient {
    /// Connect to the daemon's RPC endpoint (e.g. `http://127.0.0.1:7878`).
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();
        let client = HttpClientBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .build(url)
            .map_err(|e| crate::error::SdkError::Connection(format!("failed to create client: {e}")))?;
        Ok(Self { client })
    }

    pub async fn enqueue(&self, request: EnqueueRequest) -> Result<EnqueueResponse> {
        let params = rpc_params![request];
        Ok(self.client.request("queue.enqueue.v1", params).await?)
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        Ok(self.client.request("queue.status.v1", rpc_params![]).await?)
    }

    pub async fn list(&self, state: Option<String>) -> Result<ListResponse> {
        let params = rpc_params![ListRequest { state }];
        Ok(self.client.request("queue.list.v1", params).await?)
    }

    pub async fn logs(&self, job_id: impl Into<String>) -> Result<LogsResponse> {
        let params = rpc_params![JobIdRequest {
            job_id: job_id.into()
        }];
        Ok(self.client.request("queue.logs.v1", params).await?)
    }

    pub async fn metrics(&self) -> Result<MetricsResponse> {
        Ok(self.client.request("queue.metrics.v1", rpc_params![]).await?)
    }

    pub async fn dlq_list(&self) -> Result<ListResponse> {
        Ok(self.client.request("dlq.list.v1", rpc_params![]).await?)
    }

    pub async fn dlq_retry(&self, id: Option<String>) -> Result<CountResponse> {
        let params = rpc_params![RetryRequest { id }];
        Ok(self.client.request("dlq.retry.v1", params).await?)
    }

    pub async fn dlq_clear(&self) -> Result<CountResponse> {
        Ok(self.client.request("dlq.clear.v1", rpc_params![]).await?)
    }

    pub async fn config_get(&self, key: impl Into<String>) -> Result<ConfigGetResponse> {
        let params = rpc_params![ConfigGetRequest { key: key.into() }];
        Ok(self.client.request("config.get.v1", params).await?)
    }

    pub async fn config_set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let params = rpc_params![ConfigSetRequest {
            key: key.into(),
            value: value.into()
        }];
        Ok(self.client.request("config.set.v1", params).await?)
    }

    pub async fn maintenance(&self, force_vacuum: bool) -> Result<MaintenanceResponse> {
        let params = rpc_params![MaintenanceRequest { force_vacuum }];
        Ok(self.client.request("admin.maintenance.v1", params).await?)
    }
}
