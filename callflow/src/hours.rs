//! Representative availability window.
//!
//! Pure function of the clock: representatives are considered available
//! strictly before the cutoff hour in the configured zone. The flow uses the
//! answer only to choose between playing the after-hours notice and skipping
//! straight to question intake.

use chrono::{DateTime, FixedOffset, Timelike, Utc};

/// True iff the local hour at `offset` is strictly less than `cutoff_hour`.
pub fn available(now: DateTime<Utc>, cutoff_hour: u32, offset: FixedOffset) -> bool {
    let local = now.with_timezone(&offset);
    local.hour() < cutoff_hour
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 26, h, m, 0).unwrap()
    }

    #[test]
    fn test_available_before_cutoff() {
        let zero = FixedOffset::east_opt(0).unwrap();
        assert!(available(utc(19, 59), 20, zero));
        assert!(available(utc(0, 0), 20, zero));
    }

    #[test]
    fn test_unavailable_at_and_after_cutoff() {
        let zero = FixedOffset::east_opt(0).unwrap();
        assert!(!available(utc(20, 0), 20, zero));
        assert!(!available(utc(23, 59), 20, zero));
    }

    #[test]
    fn test_offset_shifts_the_window() {
        // 00:59 UTC is 19:59 the previous evening at UTC-5
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        assert!(available(utc(0, 59), 20, eastern));
        // 01:00 UTC is 20:00 at UTC-5
        assert!(!available(utc(1, 0), 20, eastern));
    }
}
