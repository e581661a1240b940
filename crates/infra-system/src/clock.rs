// Production Clock adapter, backed by the system wall clock.

use chrono::{DateTime, Utc};
use jobq_core::port::Clock;

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
