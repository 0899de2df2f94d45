//! Injectable clock and timestamp formatting.
//!
//! All stored timestamps go through [`format_timestamp`], which produces
//! fixed-width RFC 3339 UTC strings; lexicographic comparison of two such
//! strings matches chronological comparison, which the storage layer relies
//! on for expiry checks and event ordering.

use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveTime, SecondsFormat, Utc};

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a settable instant, for deterministic tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock pinned to the given instant.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Pin the clock to a new instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Format an instant as a fixed-width RFC 3339 UTC string.
pub fn format_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp back into an instant.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// The `[start, end)` bounds of the UTC calendar day containing `t`.
pub fn utc_day_bounds(t: DateTime<Utc>) -> (String, String) {
    let start = t.date_naive().and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(1);
    (format_timestamp(start), format_timestamp(end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_format_is_fixed_width() {
        let whole = at("2026-01-01T00:00:00Z");
        let fractional = at("2026-01-01T00:00:00.5Z");
        assert_eq!(format_timestamp(whole), "2026-01-01T00:00:00.000000Z");
        assert_eq!(format_timestamp(fractional).len(), format_timestamp(whole).len());
    }

    #[test]
    fn test_lexicographic_matches_chronological() {
        let earlier = format_timestamp(at("2026-01-01T09:59:59.999999Z"));
        let later = format_timestamp(at("2026-01-01T10:00:00Z"));
        assert!(earlier < later);
    }

    #[test]
    fn test_utc_day_bounds() {
        let (start, end) = utc_day_bounds(at("2026-01-02T23:59:59Z"));
        assert_eq!(start, "2026-01-02T00:00:00.000000Z");
        assert_eq!(end, "2026-01-03T00:00:00.000000Z");
    }

    #[test]
    fn test_fixed_clock_advance() {
        let clock = FixedClock::at(at("2026-01-01T00:00:00Z"));
        clock.advance(Duration::hours(25));
        assert_eq!(format_timestamp(clock.now()), "2026-01-02T01:00:00.000000Z");
    }
}
