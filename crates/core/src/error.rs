// Central error type for the application.

use thiserror::Error;

/// Application-level error type. Variants map directly to the error
/// taxonomy of the Queue API; `api-rpc` and `cli` translate these into
/// wire/exit codes.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("spawn failed: {0}")]
    SpawnFailed(String),

    #[error("job timed out after {0}s")]
    JobTimeout(u64),

    #[error("job exited with status {0}")]
    JobNonZeroExit(i32),

    #[error("store error: {0}")]
    Store(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("execution error: {0}")]
    Execution(#[from] crate::port::ExecutionError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

// infra crates convert sqlx/io errors to AppError::Store(String) at the
// boundary rather than depending on core's error internals.
impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Store(err)
    }
}
