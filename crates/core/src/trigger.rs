//! Trigger math: pure next-fire-instant computation.
//!
//! Total functions over valid inputs, no state, no I/O. All results are
//! produced in the time zone of the `now` argument; callers pick the zone
//! and convert for the wake-up facility.

use std::collections::HashSet;

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike, Weekday,
};

/// Decomposed time left until a target instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    /// The target is now or already behind us.
    Past,
    Until { days: i64, hours: i64, minutes: i64 },
}

/// Next instant an alarm with the given time of day and repeat set fires,
/// strictly after `now`.
///
/// An empty repeat set means one-shot: today at `time_of_day` if that is
/// still ahead, otherwise tomorrow. A non-empty set picks the repeat day
/// with the smallest non-negative day offset; a zero offset only counts
/// when the time of day has not passed yet, otherwise that day wraps to
/// next week.
pub fn next_alarm_trigger<Tz: TimeZone>(
    time_of_day: NaiveTime,
    repeat_days: &HashSet<Weekday>,
    now: &DateTime<Tz>,
) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();

    if repeat_days.is_empty() {
        let candidate = resolve_local(&tz, today, time_of_day);
        if candidate > *now {
            return candidate;
        }
        return resolve_local(&tz, today + Duration::days(1), time_of_day);
    }

    let today_ord = i64::from(now.weekday().num_days_from_monday());
    let time_passed = time_of_day <= now.time();

    let diff_days = repeat_days
        .iter()
        .map(|day| {
            let diff = (i64::from(day.num_days_from_monday()) - today_ord + 7) % 7;
            if diff == 0 && time_passed {
                7
            } else {
                diff
            }
        })
        .min()
        .unwrap_or(0);

    resolve_local(&tz, today + Duration::days(diff_days), time_of_day)
}

/// Next snooze fire instant: `now + interval`, seconds and sub-seconds
/// truncated to zero.
pub fn next_snooze_trigger<Tz: TimeZone>(
    now: &DateTime<Tz>,
    interval_minutes: u32,
) -> DateTime<Tz> {
    let target = now.clone() + Duration::minutes(i64::from(interval_minutes));
    target
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(target)
}

/// Decompose the distance from `now_ms` to `target_ms` (both epoch
/// milliseconds) into whole days, hours, and minutes.
pub fn format_remaining(now_ms: i64, target_ms: i64) -> Remaining {
    if target_ms <= now_ms {
        return Remaining::Past;
    }
    let total_minutes = (target_ms - now_ms) / 60_000;
    Remaining::Until {
        days: total_minutes / (24 * 60),
        hours: (total_minutes / 60) % 24,
        minutes: total_minutes % 60,
    }
}

/// Attach a wall-clock time to a date in the given zone.
///
/// Ambiguous local times (fall-back) resolve to the earlier instant; a
/// spring-forward gap resolves to the first representable instant after
/// the gap.
fn resolve_local<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    let mut naive = date.and_time(time);
    loop {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(instant) => return instant,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => {
                naive = naive + Duration::minutes(15);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    // 2024-01-01 is a Monday.
    fn monday(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    fn tuesday(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, hour, minute, 0).unwrap()
    }

    fn tod(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn days(list: &[Weekday]) -> HashSet<Weekday> {
        list.iter().copied().collect()
    }

    #[test]
    fn one_shot_after_time_rolls_to_tomorrow() {
        let next = next_alarm_trigger(tod(8, 0), &HashSet::new(), &monday(9, 0));
        assert_eq!(next, tuesday(8, 0));
    }

    #[test]
    fn one_shot_before_time_fires_today() {
        let next = next_alarm_trigger(tod(8, 0), &HashSet::new(), &monday(7, 0));
        assert_eq!(next, monday(8, 0));
    }

    #[test]
    fn one_shot_at_exact_time_rolls_to_tomorrow() {
        // "strictly after now": the boundary instant has already fired.
        let next = next_alarm_trigger(tod(8, 0), &HashSet::new(), &monday(8, 0));
        assert_eq!(next, tuesday(8, 0));
    }

    #[test]
    fn weekly_picks_nearest_repeat_day() {
        let next = next_alarm_trigger(tod(8, 0), &days(&[Weekday::Mon, Weekday::Wed]), &tuesday(9, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 3, 8, 0, 0).unwrap());
    }

    #[test]
    fn weekly_fires_today_when_time_is_ahead() {
        let next = next_alarm_trigger(tod(8, 0), &days(&[Weekday::Mon, Weekday::Wed]), &monday(7, 0));
        assert_eq!(next, monday(8, 0));
    }

    #[test]
    fn weekly_same_day_passed_time_wraps_a_week() {
        let next = next_alarm_trigger(tod(8, 0), &days(&[Weekday::Mon]), &monday(9, 0));
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 8, 8, 0, 0).unwrap());
    }

    #[test]
    fn daily_set_behaves_like_next_occurrence() {
        let all = days(&[
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]);
        assert_eq!(next_alarm_trigger(tod(8, 0), &all, &monday(7, 0)), monday(8, 0));
        assert_eq!(next_alarm_trigger(tod(8, 0), &all, &monday(9, 0)), tuesday(8, 0));
    }

    #[test]
    fn snooze_truncates_seconds() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 1, 45).unwrap();
        let next = next_snooze_trigger(&now, 5);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 1, 8, 6, 0).unwrap());
    }

    #[test]
    fn remaining_decomposes_days_hours_minutes() {
        let now = 0;
        let target = ((26 * 60) + 5) * 60_000; // 1d 2h 5m
        assert_eq!(
            format_remaining(now, target),
            Remaining::Until { days: 1, hours: 2, minutes: 5 }
        );
    }

    #[test]
    fn remaining_signals_past_due() {
        assert_eq!(format_remaining(10_000, 10_000), Remaining::Past);
        assert_eq!(format_remaining(10_000, 5_000), Remaining::Past);
    }
}
