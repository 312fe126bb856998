//! Timestamp helpers
//!
//! Feed timestamps are nanoseconds since midnight on the trading day, not
//! Unix time, so plain integer arithmetic covers everything the pipeline
//! needs: hour-boundary math for snapshot scheduling and wall-clock
//! rendering for log lines.

/// Nanoseconds in one second.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Nanoseconds in one minute.
pub const NANOS_PER_MIN: u64 = 60 * NANOS_PER_SEC;

/// Nanoseconds in one hour.
pub const NANOS_PER_HOUR: u64 = 3_600 * NANOS_PER_SEC;

/// Nanoseconds since midnight for a wall-clock time of day.
pub fn wall_clock_ns(hours: u64, minutes: u64, seconds: u64) -> u64 {
    hours * NANOS_PER_HOUR + minutes * NANOS_PER_MIN + seconds * NANOS_PER_SEC
}

/// Highest hour boundary strictly in the past at `ts_ns`.
///
/// An hour counts as completed only once the clock has moved past its
/// boundary instant: a timestamp of exactly 11:00:00.000000000 still
/// belongs to the hour ending at 11:00, so it completes hour 10, not 11.
pub fn completed_hour(ts_ns: u64) -> Option<u64> {
    if ts_ns == 0 {
        None
    } else {
        Some((ts_ns - 1) / NANOS_PER_HOUR)
    }
}

/// Render a timestamp as `HH:MM:SS` for diagnostics.
pub fn format_hms(ts_ns: u64) -> String {
    let total_seconds = ts_ns / NANOS_PER_SEC;
    let (minutes, seconds) = (total_seconds / 60, total_seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_ns() {
        assert_eq!(wall_clock_ns(9, 30, 0), 34_200 * NANOS_PER_SEC);
        assert_eq!(wall_clock_ns(16, 0, 0), 57_600 * NANOS_PER_SEC);
    }

    #[test]
    fn test_completed_hour_at_boundary() {
        // The boundary instant itself does not complete the hour
        assert_eq!(completed_hour(11 * NANOS_PER_HOUR), Some(10));
        // One nanosecond later it does
        assert_eq!(completed_hour(11 * NANOS_PER_HOUR + 1), Some(11));
    }

    #[test]
    fn test_completed_hour_start_of_day() {
        assert_eq!(completed_hour(0), None);
        assert_eq!(completed_hour(1), Some(0));
        assert_eq!(completed_hour(NANOS_PER_HOUR - 1), Some(0));
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(wall_clock_ns(10, 59, 59)), "10:59:59");
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(wall_clock_ns(16, 0, 0) + 123), "16:00:00");
    }
}
