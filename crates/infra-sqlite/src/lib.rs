// SQLite Store adapter: implements JobRepository, Config, WorkerRegistry and
// Maintenance against a single WAL-mode SQLite database (SPEC_FULL §4.1).

mod config_repository;
mod connection;
mod job_repository;
mod maintenance_impl;
mod migration;
mod worker_registry_impl;

pub use config_repository::SqliteConfig;
pub use connection::create_pool;
pub use job_repository::SqliteJobRepository;
pub use maintenance_impl::SqliteMaintenance;
pub use migration::run_migrations;
pub use worker_registry_impl::SqliteWorkerRegistry;
