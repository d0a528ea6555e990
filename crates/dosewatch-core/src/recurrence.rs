//! Next-trigger computation for medication schedules.
//!
//! Pure wall-clock arithmetic -- no side effects, and total: given a
//! well-formed schedule it always returns an instant strictly after
//! `now_ms`. All computation is in UTC; callers are expected to express
//! schedule times of day in the same zone they hand in `now_ms` for.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::warn;

use crate::medication::Schedule;

/// Fallback horizon when a weekly schedule has no active day: push the
/// trigger a year out instead of looping or failing. See DESIGN.md for
/// the open-question record on this behavior.
const DEGENERATE_FALLBACK_DAYS: i64 = 365;

/// Compute the next trigger instant strictly after `now_ms`.
///
/// Interval mode starts from today's `hour:minute` baseline and advances
/// by `interval_hours` until the result lies in the future. Weekly mode
/// scans tomorrow through seven days out for the first flagged weekday;
/// the current day is deliberately excluded -- recomputation only happens
/// once today's trigger has already fired, so today is consumed.
pub fn next_trigger(schedule: &Schedule, now_ms: i64) -> i64 {
    let now = ms_to_utc(now_ms);

    if schedule.interval_mode {
        let step = Duration::hours(i64::from(schedule.interval_hours.max(1)));
        let mut at = at_time_of_day(now.date_naive(), schedule.hour, schedule.minute);
        // Walk to the earliest phase-aligned instant strictly after now;
        // the baseline itself may still be ahead of us, so step back first.
        while at.timestamp_millis() > now_ms {
            at -= step;
        }
        while at.timestamp_millis() <= now_ms {
            at += step;
        }
        return at.timestamp_millis();
    }

    let today = now.weekday().num_days_from_monday() as usize;
    for days_ahead in 1..=7usize {
        if schedule.days_of_week[(today + days_ahead) % 7] {
            let date = now.date_naive() + Duration::days(days_ahead as i64);
            return at_time_of_day(date, schedule.hour, schedule.minute).timestamp_millis();
        }
    }

    warn!(
        schedule_id = %schedule.id,
        "weekly schedule has no active day; deferring a year"
    );
    (now + Duration::days(DEGENERATE_FALLBACK_DAYS)).timestamp_millis()
}

/// `hour:minute` on the calendar day containing `now_ms`. The missed-check
/// grace window is anchored here rather than at `next_scheduled`.
pub(crate) fn today_at(now_ms: i64, hour: u32, minute: u32) -> i64 {
    at_time_of_day(ms_to_utc(now_ms).date_naive(), hour, minute).timestamp_millis()
}

fn ms_to_utc(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}

fn at_time_of_day(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    // Clamped inputs make and_hms_opt infallible.
    date.and_hms_opt(hour.min(23), minute.min(59), 0)
        .map(|t| t.and_utc())
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike, Weekday};
    use proptest::prelude::*;

    fn interval(hour: u32, minute: u32, every: u32) -> Schedule {
        Schedule::interval("med-1", hour, minute, every).unwrap()
    }

    fn weekly(hour: u32, minute: u32, days: [bool; 7]) -> Schedule {
        Schedule::weekly("med-1", hour, minute, days).unwrap()
    }

    /// Wednesday.
    fn wed_noon() -> i64 {
        Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn daily_interval_later_today_is_kept() {
        let now = wed_noon();
        let next = next_trigger(&interval(20, 30, 24), now);
        let next_dt = ms_to_utc(next);
        assert_eq!((next_dt.hour(), next_dt.minute()), (20, 30));
        assert_eq!(next_dt.date_naive(), ms_to_utc(now).date_naive());
    }

    #[test]
    fn interval_rolls_past_consumed_occurrences() {
        let now = wed_noon();
        // Baseline 08:00 with an 8h step: 08:00 is past, next is 16:00.
        let next = next_trigger(&interval(8, 0, 8), now);
        let next_dt = ms_to_utc(next);
        assert_eq!((next_dt.hour(), next_dt.minute()), (16, 0));
        assert!(next > now);
    }

    #[test]
    fn interval_at_exact_baseline_advances_one_step() {
        let now = Utc
            .with_ymd_and_hms(2024, 1, 3, 8, 0, 0)
            .unwrap()
            .timestamp_millis();
        // Strictly-future contract: now == baseline must not return now.
        let next = next_trigger(&interval(8, 0, 6), now);
        assert_eq!(next, now + 6 * 3_600_000);
    }

    #[test]
    fn weekly_skips_today_even_when_time_not_passed() {
        let now = wed_noon();
        let mut days = [false; 7];
        days[2] = true; // Wednesday only.
        let next = next_trigger(&weekly(20, 0, days), now);
        // Today's 20:00 is consumed; next Wednesday it is.
        let next_dt = ms_to_utc(next);
        assert_eq!(next_dt.weekday(), Weekday::Wed);
        assert_eq!(next - now, Duration::days(7).num_milliseconds() + 8 * 3_600_000);
    }

    #[test]
    fn weekly_finds_nearest_flagged_day() {
        let now = wed_noon();
        let mut days = [false; 7];
        days[4] = true; // Friday.
        days[5] = true; // Saturday.
        let next_dt = ms_to_utc(next_trigger(&weekly(9, 15, days), now));
        assert_eq!(next_dt.weekday(), Weekday::Fri);
        assert_eq!((next_dt.hour(), next_dt.minute()), (9, 15));
    }

    #[test]
    fn weekly_wraps_across_the_week_boundary() {
        // Saturday noon, only Monday flagged.
        let now = Utc
            .with_ymd_and_hms(2024, 1, 6, 12, 0, 0)
            .unwrap()
            .timestamp_millis();
        let mut days = [false; 7];
        days[0] = true;
        let next_dt = ms_to_utc(next_trigger(&weekly(7, 0, days), now));
        assert_eq!(next_dt.weekday(), Weekday::Mon);
        assert_eq!(next_dt.date_naive().to_string(), "2024-01-08");
    }

    #[test]
    fn degenerate_weekly_defers_a_year() {
        let now = wed_noon();
        let next = next_trigger(&weekly(8, 0, [false; 7]), now);
        assert_eq!(next - now, Duration::days(365).num_milliseconds());
    }

    proptest! {
        #[test]
        fn weekly_lands_on_flagged_day_in_future_within_a_week(
            hour in 0u32..24,
            minute in 0u32..60,
            day_bits in 1u8..128,
            now_offset_mins in 0i64..(14 * 24 * 60),
        ) {
            let mut days = [false; 7];
            for (i, d) in days.iter_mut().enumerate() {
                *d = day_bits & (1 << i) != 0;
            }
            let now = wed_noon() + now_offset_mins * 60_000;
            let next = next_trigger(&weekly(hour, minute, days), now);
            let next_dt = ms_to_utc(next);

            prop_assert!(next > now);
            prop_assert!(days[next_dt.weekday().num_days_from_monday() as usize]);
            prop_assert_eq!((next_dt.hour(), next_dt.minute()), (hour, minute));
            // Never further out than a full week.
            prop_assert!(next - now <= Duration::days(8).num_milliseconds());
        }

        #[test]
        fn interval_is_future_phase_aligned_and_within_one_step(
            hour in 0u32..24,
            minute in 0u32..60,
            every in 1u32..48,
            now_offset_mins in 0i64..(14 * 24 * 60),
        ) {
            let now = wed_noon() + now_offset_mins * 60_000;
            let sched = interval(hour, minute, every);
            let next = next_trigger(&sched, now);
            let step_ms = i64::from(every) * 3_600_000;
            let baseline =
                at_time_of_day(ms_to_utc(now).date_naive(), hour, minute).timestamp_millis();

            prop_assert!(next > now);
            prop_assert!(next - now <= step_ms);
            prop_assert_eq!((next - baseline) % step_ms, 0);
        }
    }
}
