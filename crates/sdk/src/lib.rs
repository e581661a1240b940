//! Rust client for the job queue daemon's JSON-RPC API (SPEC_FULL §6.5).
//!
//! # Example
//!
//! ```no_run
//! use jobq_sdk::{EnqueueRequest, JobqClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = JobqClient::connect("http://127.0.0.1:7878").await?;
//!
//!     let response = client
//!         .enqueue(EnqueueRequest {
//!             command: "echo hi".to_string(),
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     println!("job enqueued: {}", response.id);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::JobqClient;
pub use error::{Result, SdkError};
pub use types::{
    ConfigGetRequest, ConfigGetResponse, ConfigSetRequest, CountResponse, EnqueueRequest,
    EnqueueResponse, JobIdRequest, ListRequest, ListResponse, LogLineDto, LogsResponse,
    MaintenanceRequest, MaintenanceResponse, MetricsResponse, RetryRequest, StatusResponse,
};
