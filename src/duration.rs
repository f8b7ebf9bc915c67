use serde::Serialize;

use crate::deadline::{Deadline, Instant};

pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_HOUR: i64 = 3_600;
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Time left before a deadline, broken down for the scoreboard.
///
/// When `expired` is set every numeric field is zero. Otherwise hours,
/// minutes and seconds are within their moduli and the total is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemainingDuration {
    pub expired: bool,
    pub days: u64,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl RemainingDuration {
    pub const EXPIRED: Self = Self {
        expired: true,
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// Clamps `total_seconds <= 0` to the expired state.
    pub fn from_total_seconds(total_seconds: i64) -> Self {
        if total_seconds <= 0 {
            return Self::EXPIRED;
        }

        let days = total_seconds.div_euclid(SECONDS_PER_DAY);
        let rest = total_seconds.rem_euclid(SECONDS_PER_DAY);
        let hours = rest.div_euclid(SECONDS_PER_HOUR);
        let rest = rest.rem_euclid(SECONDS_PER_HOUR);
        let minutes = rest.div_euclid(SECONDS_PER_MINUTE);
        let seconds = rest.rem_euclid(SECONDS_PER_MINUTE);

        Self {
            expired: false,
            days: days as u64,
            hours: hours as u8,
            minutes: minutes as u8,
            seconds: seconds as u8,
        }
    }

    pub fn total_seconds(&self) -> i64 {
        if self.expired {
            return 0;
        }
        self.days as i64 * SECONDS_PER_DAY
            + i64::from(self.hours) * SECONDS_PER_HOUR
            + i64::from(self.minutes) * SECONDS_PER_MINUTE
            + i64::from(self.seconds)
    }

    /// Column values in scoreboard order: days, hours, minutes, seconds.
    pub fn columns(&self) -> [u64; 4] {
        [
            self.days,
            u64::from(self.hours),
            u64::from(self.minutes),
            u64::from(self.seconds),
        ]
    }
}

/// Whole seconds from `now` to `deadline`, floored, then decomposed.
pub fn remaining(now: &Instant, deadline: &Deadline) -> RemainingDuration {
    let delta = deadline.instant().signed_duration_since(*now);
    let mut total_seconds = delta.num_seconds();
    // num_seconds truncates toward zero; step down for a negative fraction.
    if delta.subsec_nanos() < 0 {
        total_seconds -= 1;
    }
    RemainingDuration::from_total_seconds(total_seconds)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::America::Sao_Paulo;

    use super::*;
    use crate::deadline::parse_deadline;

    #[test]
    fn decomposition_sums_back_to_total() {
        let samples = [
            1_i64,
            59,
            60,
            61,
            3_599,
            3_600,
            86_399,
            86_400,
            90_061,
            8_640_000,
            8_640_000 + 86_399,
            123_456_789,
        ];
        for total in samples {
            let remaining = RemainingDuration::from_total_seconds(total);
            assert!(!remaining.expired);
            assert!(remaining.hours < 24);
            assert!(remaining.minutes < 60);
            assert!(remaining.seconds < 60);
            assert_eq!(remaining.total_seconds(), total, "total {total}");
        }
    }

    #[test]
    fn non_positive_totals_are_expired() {
        for total in [0_i64, -1, -86_400, i64::MIN] {
            assert_eq!(
                RemainingDuration::from_total_seconds(total),
                RemainingDuration::EXPIRED
            );
        }
        assert_eq!(RemainingDuration::EXPIRED.total_seconds(), 0);
    }

    #[test]
    fn one_day_one_hour_one_minute_one_second() {
        let now = Sao_Paulo.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let deadline = parse_deadline(Some("2025-01-02T01:01:01"), Sao_Paulo).unwrap();
        assert_eq!(
            remaining(&now, &deadline),
            RemainingDuration {
                expired: false,
                days: 1,
                hours: 1,
                minutes: 1,
                seconds: 1,
            }
        );
    }

    #[test]
    fn deadline_one_second_ago_is_expired() {
        let now = Sao_Paulo.with_ymd_and_hms(2025, 6, 1, 12, 0, 1).unwrap();
        let deadline = parse_deadline(Some("2025-06-01T12:00:00"), Sao_Paulo).unwrap();
        assert_eq!(remaining(&now, &deadline), RemainingDuration::EXPIRED);
    }

    #[test]
    fn deadline_equal_to_now_is_expired() {
        let now = Sao_Paulo.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let deadline = parse_deadline(Some("2025-06-01T12:00"), Sao_Paulo).unwrap();
        assert!(remaining(&now, &deadline).expired);
    }

    #[test]
    fn sub_second_remainder_is_floored() {
        let now = Sao_Paulo.with_ymd_and_hms(2025, 6, 1, 11, 59, 58).unwrap()
            + chrono::Duration::milliseconds(500);
        let deadline = parse_deadline(Some("2025-06-01T12:00:00"), Sao_Paulo).unwrap();
        let left = remaining(&now, &deadline);
        assert_eq!(left.total_seconds(), 1);

        let just_after = Sao_Paulo.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(300);
        assert!(remaining(&just_after, &deadline).expired);
    }

    #[test]
    fn days_are_not_capped_at_two_digits() {
        let remaining = RemainingDuration::from_total_seconds(150 * SECONDS_PER_DAY + 5);
        assert_eq!(remaining.days, 150);
        assert_eq!(remaining.columns(), [150, 0, 0, 5]);
    }
}
