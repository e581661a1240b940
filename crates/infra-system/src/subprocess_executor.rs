// Subprocess executor: runs a job's command through `sh -c`, streaming
// stdout/stderr lines to the caller as they're produced (SPEC_FULL §4.4).

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jobq_core::port::task_executor::{ExecutionError, ExecutionResult, ExecutionStatus, TaskExecutor};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::timeout as tokio_timeout;
use tracing::{info, warn};

const SIGTERM_GRACE_PERIOD: Duration = Duration::from_secs(3);

pub struct SubprocessExecutor;

impl SubprocessExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SubprocessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskExecutor for SubprocessExecutor {
    async fn execute(
        &self,
        command: &str,
        attempt: i32,
        timeout: Duration,
        log_tx: UnboundedSender<String>,
    ) -> Result<ExecutionResult, ExecutionError> {
        let start = Instant::now();

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .env("ATTEMPT", attempt.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed(e.to_string()))?;

        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        let out_tx = log_tx.clone();
        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = out_tx.send(format!("stdout: {line}"));
            }
        });
        let err_tx = log_tx;
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = err_tx.send(format!("stderr: {line}"));
            }
        });

        let wait_result = tokio_timeout(timeout, child.wait()).await;
        let _ = stdout_task.await;
        let _ = stderr_task.await;

        match wait_result {
            Ok(Ok(status)) => Ok(ExecutionResult {
                status: if status.success() {
                    ExecutionStatus::Success
                } else {
                    ExecutionStatus::Failed
                },
                duration: start.elapsed(),
                exit_code: status.code(),
            }),
            Ok(Err(e)) => Err(ExecutionError::IoError(e.to_string())),
            Err(_) => {
                if let Some(pid) = child.id() {
                    let _ = self.kill(pid).await;
                }
                let _ = child.wait().await;
                Ok(ExecutionResult {
                    status: ExecutionStatus::Timeout,
                    duration: start.elapsed(),
                    exit_code: None,
                })
            }
        }
    }

    async fn kill(&self, pid: u32) -> Result<(), ExecutionError> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let nix_pid = Pid::from_raw(pid as i32);
            info!(pid, "sending SIGTERM");
            kill(nix_pid, Signal::SIGTERM)
                .map_err(|e| ExecutionError::Killed(format!("SIGTERM failed: {e}")))?;

            let deadline = Instant::now() + SIGTERM_GRACE_PERIOD;
            while Instant::now() < deadline {
                if kill(nix_pid, None).is_err() {
                    return Ok(());
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }

            warn!(pid, "process still alive after grace period, sending SIGKILL");
            if kill(nix_pid, None).is_ok() {
                kill(nix_pid, Signal::SIGKILL)
                    .map_err(|e| ExecutionError::Killed(format!("SIGKILL failed: {e}")))?;
            }
            Ok(())
        }

        #[cfg(not(unix))]
        {
            Err(ExecutionError::Killed("process termination unsupported on this platform".into()))
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        #[cfg(unix)]
        {
            use nix::sys::signal::kill;
            use nix::unistd::Pid;
            kill(Pid::from_raw(pid as i32), None).is_ok()
        }

        #[cfg(not(unix))]
        {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn execute_success_streams_stdout() {
        let executor = SubprocessExecutor::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let result = executor
            .execute("echo hello", 0, Duration::from_secs(5), tx)
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.exit_code, Some(0));

        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        assert!(lines.iter().any(|l| l.contains("hello")));
    }

    #[tokio::test]
    async fn execute_injects_attempt_env_var() {
        let executor = SubprocessExecutor::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        executor
            .execute("echo $ATTEMPT", 3, Duration::from_secs(5), tx)
            .await
            .unwrap();

        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        assert!(lines.iter().any(|l| l.contains('3')));
    }

    #[tokio::test]
    async fn execute_reports_nonzero_exit() {
        let executor = SubprocessExecutor::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = executor
            .execute("exit 7", 0, Duration::from_secs(5), tx)
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.exit_code, Some(7));
    }

    #[tokio::test]
    async fn execute_times_out_long_running_command() {
        let executor = SubprocessExecutor::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = executor
            .execute("sleep 10", 0, Duration::from_millis(100), tx)
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::Timeout);
    }
}
