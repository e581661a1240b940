// WorkerManager - owns N Workers, crash recovery, heartbeats, shutdown
// (SPEC_FULL §4.5).

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::application::queue::QueueService;
use crate::application::worker::{shutdown_channel, ShutdownSender, Worker};
use crate::error::Result;
use crate::port::{Clock, TaskExecutor, WorkerRegistry};

struct ManagedWorker {
    worker: Arc<Worker>,
    run_handle: JoinHandle<()>,
    heartbeat_handle: JoinHandle<()>,
}

/// Owns the pool of live Workers for this process. The sole cross-process
/// recovery authority: on `start`, it reclaims any job left `processing` by
/// an unclean prior shutdown before a single Worker is spawned.
pub struct WorkerManager {
    queue: Arc<QueueService>,
    executor: Arc<dyn TaskExecutor>,
    clock: Arc<dyn Clock>,
    registry: Arc<dyn WorkerRegistry>,
    workers: Mutex<HashMap<String, ManagedWorker>>,
    shutdown_tx: ShutdownSender,
}

impl WorkerManager {
    pub fn new(
        queue: Arc<QueueService>,
        executor: Arc<dyn TaskExecutor>,
        clock: Arc<dyn Clock>,
        registry: Arc<dyn WorkerRegistry>,
    ) -> Arc<Self> {
        let (shutdown_tx, _initial_token) = shutdown_channel();
        Arc::new(Self {
            queue,
            executor,
            clock,
            registry,
            workers: Mutex::new(HashMap::new()),
            shutdown_tx,
        })
    }

    /// Crash recovery, then spawns `count` workers. Orphaned `processing`
    /// rows re-enter as `pending` without incrementing `attempts` — an
    /// at-least-once guarantee, not exactly-once.
    pub async fn start(self: &Arc<Self>, count: usize) -> Result<()> {
        let recovered = self.recover_orphaned_jobs().await?;
        if recovered > 0 {
            info!(recovered, "crash recovery: reclaimed orphaned processing jobs");
        }

        let mut guard = self.workers.lock().await;
        for i in 0..count {
            let id = mint_worker_id(i);
            self.registry.register_worker(&id, self.clock.now()).await?;

            let worker = Arc::new(Worker::new(
                id.clone(),
                Arc::clone(&self.queue),
                Arc::clone(&self.executor),
                Arc::clone(&self.clock),
            ));

            let shutdown_token = self.shutdown_tx.subscribe();
            let run_worker = Arc::clone(&worker);
            let run_handle = tokio::spawn(async move {
                run_worker.run(shutdown_token).await;
            });

            let heartbeat_handle = self.spawn_heartbeat(id.clone());

            guard.insert(
                id,
                ManagedWorker {
                    worker,
                    run_handle,
                    heartbeat_handle,
                },
            );
        }
        info!(count, "worker pool started");
        Ok(())
    }

    fn spawn_heartbeat(&self, worker_id: String) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let clock = Arc::clone(&self.clock);
        tokio::spawn(async move {
            use crate::application::worker::constants::HEARTBEAT_INTERVAL;
            loop {
                tokio::time::sleep(HEARTBEAT_INTERVAL).await;
                let now = clock.now();
                if let Err(e) = registry.touch_heartbeat(&worker_id, now).await {
                    tracing::warn!(worker_id = %worker_id, error = %e, "heartbeat update failed");
                }
            }
        })
    }

    async fn recover_orphaned_jobs(&self) -> Result<u64> {
        self.queue.recover_orphaned_jobs().await
    }

    /// Requests shutdown, then blocks until every worker has drained its
    /// in-flight job, and tears down heartbeats and worker rows.
    pub async fn stop(self: &Arc<Self>) {
        self.shutdown_tx.shutdown();
        let mut guard = self.workers.lock().await;
        for (id, managed) in guard.drain() {
            managed.worker.wait_drained().await;
            managed.heartbeat_handle.abort();
            let _ = managed.run_handle.await;
            if let Err(e) = self.registry.remove_worker(&id).await {
                tracing::warn!(worker_id = %id, error = %e, "failed to remove worker row");
            }
        }
        info!("worker pool stopped");
    }
}

fn mint_worker_id(index: usize) -> String {
    let epoch_ms = chrono::Utc::now().timestamp_millis();
    let rand5: String = {
        let mut rng = rand::thread_rng();
        (0..5)
            .map(|_| {
                let n: u8 = rng.gen_range(0..36);
                std::char::from_digit(n as u32, 36).unwrap_or('0')
            })
            .collect()
    };
    format!("worker-{epoch_ms}-{rand5}-{index}")
}
