//! jobq daemon - composition root: wires the Store, WorkerManager, the
//! maintenance scheduler and the JSON-RPC server, then blocks until SIGINT.

mod telemetry;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobq_api_rpc::server::RpcServerConfig;
use jobq_api_rpc::{handler::RpcHandler, RpcServer};
use jobq_core::application::{MaintenanceScheduler, QueueService, WorkerManager};
use jobq_core::port::{IdProvider, MaintenanceConfig, UuidProvider};
use jobq_infra_sqlite::{create_pool, run_migrations, SqliteConfig, SqliteJobRepository, SqliteMaintenance, SqliteWorkerRegistry};
use jobq_infra_system::{SubprocessExecutor, SystemClock};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_DB_PATH: &str = "sqlite://data/queue.sqlite";
const DEFAULT_RPC_PORT: u16 = 7878;
const DEFAULT_WORKER_COUNT: usize = 4;

#[tokio::main]
async fn main() -> Result<()> {
    let log_format = std::env::var("JOBQ_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("jobq=info"))
        .expect("failed to build env filter");

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("jobq daemon v{} starting...", VERSION);

    if let Err(e) = telemetry::init_telemetry() {
        tracing::warn!(error = ?e, "failed to initialize OpenTelemetry (continuing without it)");
    }

    let db_path = std::env::var("JOBQ_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    let rpc_port: u16 = std::env::var("JOBQ_RPC_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_RPC_PORT);
    let worker_count: usize = std::env::var("JOBQ_WORKER_COUNT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_WORKER_COUNT);

    info!(db_path = %db_path, "initializing store...");
    let pool = create_pool(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("db pool creation failed: {e}"))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("migration failed: {e}"))?;

    // Dependency wiring (SPEC_FULL §2/§4.5).
    let job_repo = Arc::new(SqliteJobRepository::new(pool.clone()));
    let config: Arc<dyn jobq_core::port::Config> = Arc::new(SqliteConfig::new(pool.clone()));
    let clock: Arc<dyn jobq_core::port::Clock> = Arc::new(SystemClock);
    let id_provider: Arc<dyn IdProvider> = Arc::new(UuidProvider);

    let queue = Arc::new(QueueService::new(
        job_repo,
        config,
        Arc::clone(&clock),
        id_provider,
    ));

    let registry = Arc::new(SqliteWorkerRegistry::new(pool.clone()));
    let executor = Arc::new(SubprocessExecutor::new());
    let maintenance: Arc<dyn jobq_core::port::Maintenance> =
        Arc::new(SqliteMaintenance::new(pool));

    // WorkerManager::start runs crash recovery before spawning any worker.
    info!(worker_count, "starting worker pool...");
    let manager = WorkerManager::new(Arc::clone(&queue), executor, clock, registry);
    manager.start(worker_count).await?;

    info!("starting JSON-RPC server...");
    let rpc_handler = Arc::new(RpcHandler::new(Arc::clone(&queue), Arc::clone(&maintenance)));
    let rpc_config = RpcServerConfig {
        port: rpc_port,
        ..Default::default()
    };
    let rpc_server = RpcServer::new(rpc_config, rpc_handler);
    let rpc_handle = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {e}"))?;

    info!("starting maintenance scheduler...");
    let maintenance_scheduler = MaintenanceScheduler::new(maintenance, MaintenanceConfig::default(), 24);
    tokio::spawn(async move {
        maintenance_scheduler.run().await;
    });

    info!("system ready. waiting for tasks. press Ctrl+C to shut down.");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, exiting gracefully...");

    rpc_handle.stop().ok();
    tokio::time::timeout(std::time::Duration::from_secs(10), manager.stop())
        .await
        .unwrap_or_else(|_| tracing::warn!("worker pool did not drain within the shutdown timeout"));

    info!("shutdown complete.");
    Ok(())
}
