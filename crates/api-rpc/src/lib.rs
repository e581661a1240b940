//! JSON-RPC 2.0 read/admin API for the job queue daemon: `queue.*`,
//! `dlq.*`, `config.*` and `admin.maintenance.v1`.

pub mod error;
pub mod handler;
mod rate_limiter;
pub mod server;
pub mod types;

pub use server::RpcServer;
