// System adapters: process execution and wall-clock for jobq-core's ports.

pub mod clock;
pub mod subprocess_executor;

pub use clock::SystemClock;
pub use subprocess_executor::SubprocessExecutor;
