// Clock port: the system's notion of "now", mockable for deterministic tests.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use crate::error::{AppError, Result};

/// Naked (timezone-less) timestamps supplied to `enqueue` are interpreted at
/// this fixed local offset before being stored as UTC (SPEC_FULL §4.3/§4.6).
pub const DEFAULT_NAIVE_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60; // +05:30

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Parse a user-supplied `run_at` string. Strings carrying an explicit
    /// offset/`Z` are taken as-is; naked timestamps are interpreted at
    /// `DEFAULT_NAIVE_OFFSET_SECONDS` and converted to UTC.
    fn parse_user_time(&self, raw: &str) -> Result<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        let naive = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
            .map_err(|e| AppError::InvalidInput(format!("invalid run_at '{raw}': {e}")))?;
        let offset = FixedOffset::east_opt(DEFAULT_NAIVE_OFFSET_SECONDS)
            .expect("offset constant is within range");
        let local = offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| AppError::InvalidInput(format!("ambiguous run_at '{raw}'")))?;
        Ok(local.with_timezone(&Utc))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    struct DummyClock;

    impl Clock for DummyClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    #[test]
    fn parses_rfc3339_as_is() {
        let clock = DummyClock;
        let parsed = clock.parse_user_time("2026-01-01T00:00:00Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }

    #[test]
    fn naked_timestamp_uses_default_offset() {
        let clock = DummyClock;
        let parsed = clock.parse_user_time("2026-01-01T05:30:00").unwrap();
        // 05:30 at +05:30 is midnight UTC.
        assert_eq!(parsed.to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }
}
