// Job domain model: the row at the center of the whole system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job ID (UUID v4 by default, but any caller-supplied opaque string is accepted).
pub type JobId = String;

/// Smaller value = more urgent. Default 100.
pub type Priority = i32;

pub const DEFAULT_PRIORITY: Priority = 100;

/// Lifecycle state of a job. See DESIGN.md for the transition diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Scheduled,
    Pending,
    Processing,
    Waiting,
    Completed,
    Dead,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Scheduled => "scheduled",
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Waiting => "waiting",
            JobState::Completed => "completed",
            JobState::Dead => "dead",
        }
    }

    /// Parses a state column value. Legacy rows written as `failed` (an
    /// earlier revision's name for the retry-wait state) are accepted and
    /// normalised to `Waiting` — see SPEC_FULL.md's REDESIGN FLAGS.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(JobState::Scheduled),
            "pending" => Some(JobState::Pending),
            "processing" => Some(JobState::Processing),
            "waiting" | "failed" => Some(JobState::Waiting),
            "completed" => Some(JobState::Completed),
            "dead" => Some(JobState::Dead),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The central entity: a shell command and the bookkeeping needed to run it
/// to completion, retry it, or quarantine it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub command: String,
    pub state: JobState,
    pub attempts: i64,
    pub max_retries: i64,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub worker_id: Option<String>,
    pub last_error: Option<String>,
}

impl Job {
    /// Construct a freshly enqueued job. `state` must already reflect the
    /// `run_at`-in-the-future check performed by the caller (the Queue API's
    /// `enqueue`); the constructor itself enforces no business rule beyond
    /// the processing/worker_id invariant.
    pub fn new(
        id: JobId,
        command: String,
        state: JobState,
        max_retries: i64,
        priority: Priority,
        now: DateTime<Utc>,
        run_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            command,
            state,
            attempts: 0,
            max_retries,
            priority,
            created_at: now,
            updated_at: now,
            run_at,
            next_run_at: None,
            worker_id: None,
            last_error: None,
        }
    }

    /// `true` once `attempts` has exhausted the retry budget, i.e. the next
    /// failure must transition the job to `dead` rather than `waiting`.
    pub fn retries_exhausted(&self) -> bool {
        self.attempts > self.max_retries
    }

    #[cfg(test)]
    pub fn new_test(command: impl Into<String>) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);
        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let now = DateTime::<Utc>::from_timestamp(counter as i64, 0).unwrap();
        Self::new(
            format!("test-{counter}"),
            command.into(),
            JobState::Pending,
            3,
            DEFAULT_PRIORITY,
            now,
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_str() {
        for s in [
            JobState::Scheduled,
            JobState::Pending,
            JobState::Processing,
            JobState::Waiting,
            JobState::Completed,
            JobState::Dead,
        ] {
            assert_eq!(JobState::from_str(s.as_str()), Some(s));
        }
    }

    #[test]
    fn legacy_failed_state_normalises_to_waiting() {
        assert_eq!(JobState::from_str("failed"), Some(JobState::Waiting));
    }

    #[test]
    fn retries_exhausted_boundary() {
        let mut job = Job::new_test("true");
        job.max_retries = 2;
        job.attempts = 2;
        assert!(!job.retries_exhausted());
        job.attempts = 3;
        assert!(job.retries_exhausted());
    }
}
