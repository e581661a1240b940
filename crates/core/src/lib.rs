// jobq-core - domain logic, ports, and use cases.
// No infrastructure dependencies: see DESIGN.md for the hexagonal boundary.

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
