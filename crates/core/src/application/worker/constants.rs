// Worker constants — no magic values inline.
use std::time::Duration;

/// Sleep between poll attempts when no job is runnable (SPEC_FULL §4.4 step 4).
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Sleep during shutdown drain, between checks of `in_progress`.
pub const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Sleep after a Store error before the run loop retries.
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Heartbeat row refresh interval for each live worker (SPEC_FULL §4.5).
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// Grace period between SIGTERM and SIGKILL when a job's timeout fires.
pub const KILL_GRACE_PERIOD: Duration = Duration::from_secs(3);
