//! Minute-aligned clock.
//!
//! Every firing recomputes the delay to the next wall-clock minute instead of
//! sleeping a fixed 60 seconds, so processing time never accumulates as drift.

use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Timelike};

/// Lower bound on the delay to the next tick.
pub const MIN_TICK_DELAY: Duration = Duration::from_millis(50);

const MINUTE: Duration = Duration::from_secs(60);

/// Time from `now` until the next `hh:mm:00.000`, at least [`MIN_TICK_DELAY`].
#[must_use]
pub fn delay_until_next_minute<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    // nanosecond() exceeds 1e9 during a leap second.
    let into_minute = Duration::from_secs(u64::from(now.second()))
        + Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000));
    MINUTE.saturating_sub(into_minute).max(MIN_TICK_DELAY)
}

/// Hour and minute sent to the OSC listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    #[must_use]
    pub fn from_datetime<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self {
            hour: now.hour(),
            minute: now.minute(),
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Produces one-shot deadlines at local minute boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockTicker;

impl ClockTicker {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Deadline of the next minute boundary, measured from now.
    #[must_use]
    pub fn next_deadline(&self) -> tokio::time::Instant {
        let delay = delay_until_next_minute(&Local::now());
        tracing::trace!(?delay, "Next clock tick scheduled");
        tokio::time::Instant::now() + delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn at(h: u32, m: u32, s: u32, ms: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2026, 1, 29)
            .unwrap()
            .and_hms_milli_opt(h, m, s, ms)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_delay_mid_minute() {
        assert_eq!(
            delay_until_next_minute(&at(12, 30, 15, 250)),
            Duration::from_millis(44_750)
        );
    }

    #[test]
    fn test_delay_on_boundary_is_full_minute() {
        assert_eq!(delay_until_next_minute(&at(12, 30, 0, 0)), MINUTE);
    }

    #[test]
    fn test_delay_clamped_near_boundary() {
        assert_eq!(
            delay_until_next_minute(&at(12, 30, 59, 990)),
            MIN_TICK_DELAY
        );
    }

    #[test]
    fn test_no_drift_over_simulated_hours() {
        let mut now = at(9, 17, 42, 123);
        let mut fired = Vec::new();

        for i in 0u32..(6 * 60) {
            now += chrono::Duration::from_std(delay_until_next_minute(&now)).unwrap();
            fired.push(now);
            // Simulated processing time after each tick.
            now += chrono::Duration::milliseconds(i64::from(i % 40) * 7);
        }

        for (i, tick) in fired.iter().enumerate() {
            assert_eq!(tick.second(), 0, "tick {i} at {tick}");
            assert_eq!(tick.nanosecond(), 0, "tick {i} at {tick}");
        }
        for pair in fired.windows(2) {
            assert_eq!(pair[1] - pair[0], chrono::Duration::minutes(1));
        }
        assert_eq!(fired.first().unwrap(), &at(9, 18, 0, 0));
        assert_eq!(fired.last().unwrap(), &at(15, 17, 0, 0));
    }

    #[test]
    fn test_time_of_day() {
        let t = TimeOfDay::from_datetime(&at(7, 5, 59, 999));
        assert_eq!(t, TimeOfDay { hour: 7, minute: 5 });
        assert_eq!(t.to_string(), "07:05");
    }

    #[tokio::test]
    async fn test_next_deadline_within_a_minute() {
        let before = tokio::time::Instant::now();
        let deadline = ClockTicker::new().next_deadline();
        assert!(deadline >= before + MIN_TICK_DELAY);
        assert!(deadline <= tokio::time::Instant::now() + MINUTE);
    }
}
