//! Analysis window planning.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Interval forced on the very first scan, regardless of configuration.
/// A narrow initial window would miss everything that happened before the
/// engine came up.
pub const FIRST_SCAN_INTERVAL_MIN: u32 = 60;

/// The time range whose events are eligible for one scan's synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    /// Always the authoritative time at scan start, never the time of
    /// publish.
    pub end: DateTime<Utc>,
    pub is_first_scan: bool,
    /// Effective interval in minutes: 60 on the first scan, the
    /// configured interval afterwards.
    pub interval_min: u32,
}

/// Plan the analysis window for one scan. Pure.
pub fn plan_window(
    now: DateTime<Utc>,
    interval_min: u32,
    last_scan_time: Option<DateTime<Utc>>,
) -> TimeWindow {
    let is_first_scan = last_scan_time.is_none();
    let effective = if is_first_scan {
        FIRST_SCAN_INTERVAL_MIN
    } else {
        interval_min
    };
    TimeWindow {
        start: now - Duration::seconds(i64::from(effective) * 60),
        end: now,
        is_first_scan,
        interval_min: effective,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn first_scan_forces_sixty_minutes() {
        let now = at("2026-03-01T12:00:00Z");
        let w = plan_window(now, 15, None);
        assert!(w.is_first_scan);
        assert_eq!(w.interval_min, 60);
        assert_eq!(w.end, now);
        assert_eq!(w.start, at("2026-03-01T11:00:00Z"));
    }

    #[test]
    fn steady_state_uses_configured_interval() {
        let now = at("2026-03-01T12:15:00Z");
        let w = plan_window(now, 15, Some(at("2026-03-01T12:00:00Z")));
        assert!(!w.is_first_scan);
        assert_eq!(w.interval_min, 15);
        assert_eq!(w.start, at("2026-03-01T12:00:00Z"));
    }

    #[test]
    fn window_invariant_holds_across_intervals() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let last = Some(now - Duration::minutes(90));
        for interval in [1u32, 5, 15, 30, 60, 240, 1440] {
            let w = plan_window(now, interval, last);
            assert_eq!(
                w.end - w.start,
                Duration::seconds(i64::from(w.interval_min) * 60)
            );
            assert_eq!(w.interval_min, interval);
        }
    }

    #[test]
    fn end_is_the_supplied_time_not_wall_clock() {
        let now = at("2001-01-01T00:00:00Z");
        let w = plan_window(now, 15, Some(at("2000-12-31T23:45:00Z")));
        assert_eq!(w.end, now);
    }
}
