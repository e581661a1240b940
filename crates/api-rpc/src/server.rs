//! JSON-RPC Server
//!
//! Implements the JSON-RPC 2.0 server (SPEC_FULL §6.5): local TCP,
//! `queue.*`/`dlq.*`/`config.*`/`admin.maintenance.v1`.

use std::sync::Arc;

use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use tracing::info;

use crate::error::{throttled, to_rpc_error};
use crate::handler::RpcHandler;
use crate::types::*;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 7878;

pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: Arc<RpcHandler>) -> Self {
        Self { config, handler }
    }

    pub async fn start(self) -> std::io::Result<ServerHandle> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let server = Server::builder().build(&addr).await?;
        info!(addr = %addr, "JSON-RPC server listening");

        let mut module = RpcModule::new(self.handler);
        register_methods(&mut module);

        let handle = server.start(module);
        Ok(handle)
    }
}

fn register_methods(module: &mut RpcModule<Arc<RpcHandler>>) {
    module
        .register_async_method("queue.enqueue.v1", |params, handler, _| async move {
            let handler = handler.clone();
            if !handler.rate_limiter.check().await {
                return Err(throttled());
            }
            let req: EnqueueRequest = params.parse().map_err(|e| {
                jsonrpsee::types::ErrorObjectOwned::owned(
                    crate::error::code::VALIDATION_ERROR,
                    format!("invalid params: {e}"),
                    None::<()>,
                )
            })?;
            handler.enqueue(req).await.map_err(to_rpc_error)
        })
        .expect("method name collision: queue.enqueue.v1");

    module
        .register_async_method("queue.status.v1", |_params, handler, _| async move {
            handler.clone().status().await.map_err(to_rpc_error)
        })
        .expect("method name collision: queue.status.v1");

    module
        .register_async_method("queue.list.v1", |params, handler, _| async move {
            let req: ListRequest = params.parse().unwrap_or_default();
            handler.clone().list(req).await.map_err(to_rpc_error)
        })
        .expect("method name collision: queue.list.v1");

    module
        .register_async_method("queue.logs.v1", |params, handler, _| async move {
            let req: JobIdRequest = params.parse().map_err(|e| {
                jsonrpsee::types::ErrorObjectOwned::owned(
                    crate::error::code::VALIDATION_ERROR,
                    format!("invalid params: {e}"),
                    None::<()>,
                )
            })?;
            handler.clone().logs(req).await.map_err(to_rpc_error)
        })
        .expect("method name collision: queue.logs.v1");

    module
        .register_async_method("queue.metrics.v1", |_params, handler, _| async move {
            handler.clone().metrics().await.map_err(to_rpc_error)
        })
        .expect("method name collision: queue.metrics.v1");

    module
        .register_async_method("dlq.list.v1", |_params, handler, _| async move {
            handler.clone().dlq_list().await.map_err(to_rpc_error)
        })
        .expect("method name collision: dlq.list.v1");

    module
        .register_async_method("dlq.retry.v1", |params, handler, _| async move {
            let req: RetryRequest = params.parse().unwrap_or_default();
            handler.clone().dlq_retry(req).await.map_err(to_rpc_error)
        })
        .expect("method name collision: dlq.retry.v1");

    module
        .register_async_method("dlq.clear.v1", |_params, handler, _| async move {
            handler.clone().dlq_clear().await.map_err(to_rpc_error)
        })
        .expect("method name collision: dlq.clear.v1");

    module
        .register_async_method("config.get.v1", |params, handler, _| async move {
            let req: ConfigGetRequest = params.parse().map_err(|e| {
                jsonrpsee::types::ErrorObjectOwned::owned(
                    crate::error::code::VALIDATION_ERROR,
                    format!("invalid params: {e}"),
                    None::<()>,
                )
            })?;
            handler.clone().config_get(req).await.map_err(to_rpc_error)
        })
        .expect("method name collision: config.get.v1");

    module
        .register_async_method("config.set.v1", |params, handler, _| async move {
            let req: ConfigSetRequest = params.parse().map_err(|e| {
                jsonrpsee::types::ErrorObjectOwned::owned(
                    crate::error::code::VALIDATION_ERROR,
                    format!("invalid params: {e}"),
                    None::<()>,
                )
            })?;
            handler.clone().config_set(req).await.map_err(to_rpc_error)
        })
        .expect("method name collision: config.set.v1");

    module
        .register_async_method("admin.maintenance.v1", |params, handler, _| async move {
            let req: MaintenanceRequest = params.parse().unwrap_or_default();
            handler.clone().maintenance(req).await.map_err(to_rpc_error)
        })
        .expect("method name collision: admin.maintenance.v1");
}
