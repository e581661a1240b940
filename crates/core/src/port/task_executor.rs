// Task executor port: runs one job's command in a child process.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Result of one execution attempt.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub duration: Duration,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Failed,
    Timeout,
    Killed,
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),

    #[error("process timed out after {0:?}")]
    Timeout(Duration),

    #[error("process killed: {0}")]
    Killed(String),

    #[error("io error: {0}")]
    IoError(String),
}

/// Executes a job's shell command, streaming output lines to `log_tx` as
/// they're produced (SPEC_FULL §4.4). `attempt` is injected into the child
/// environment as `ATTEMPT`.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(
        &self,
        command: &str,
        attempt: i32,
        timeout: Duration,
        log_tx: UnboundedSender<String>,
    ) -> Result<ExecutionResult, ExecutionError>;

    /// Send a graceful-then-forceful kill to a running process.
    async fn kill(&self, pid: u32) -> Result<(), ExecutionError>;

    fn is_alive(&self, pid: u32) -> bool;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        Success,
        Fail(String),
        Panic(String),
        Timeout,
    }

    pub struct MockTaskExecutor {
        behavior: Arc<Mutex<MockBehavior>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockTaskExecutor {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl TaskExecutor for MockTaskExecutor {
        async fn execute(
            &self,
            _command: &str,
            _attempt: i32,
            timeout: Duration,
            log_tx: UnboundedSender<String>,
        ) -> Result<ExecutionResult, ExecutionError> {
            *self.call_count.lock().unwrap() += 1;
            let behavior = self.behavior.lock().unwrap().clone();
            let _ = log_tx.send("mock output".to_string());

            match behavior {
                MockBehavior::Success => Ok(ExecutionResult {
                    status: ExecutionStatus::Success,
                    duration: Duration::from_millis(10),
                    exit_code: Some(0),
                }),
                MockBehavior::Fail(msg) => Err(ExecutionError::SpawnFailed(msg)),
                MockBehavior::Panic(msg) => panic!("{msg}"),
                MockBehavior::Timeout => Ok(ExecutionResult {
                    status: ExecutionStatus::Timeout,
                    duration: timeout,
                    exit_code: None,
                }),
            }
        }

        async fn kill(&self, _pid: u32) -> Result<(), ExecutionError> {
            Ok(())
        }

        fn is_alive(&self, _pid: u32) -> bool {
            false
        }
    }
}
