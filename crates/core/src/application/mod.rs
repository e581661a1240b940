// Application layer: use cases built on top of the port traits.

pub mod maintenance;
pub mod manager;
pub mod queue;
pub mod worker;

pub use maintenance::MaintenanceScheduler;
pub use manager::WorkerManager;
pub use queue::{EnqueueSpec, QueueService};
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker};
