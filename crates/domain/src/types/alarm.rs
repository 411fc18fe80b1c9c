//! Scheduled alarm model and its state machine vocabulary.

use std::collections::HashSet;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SNOOZE_INTERVAL_MIN, DEFAULT_SNOOZE_LIMIT, DEFAULT_VOLUME_PERCENT, UNSAVED_ID};
use crate::errors::{ChimeError, Result};

/// Lifecycle state of a scheduled alarm.
///
/// Transitions into and out of `Ringing` happen exclusively through
/// coordinator-initiated store writes; the editor only ever creates alarms
/// in `Upcoming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmState {
    Upcoming,
    Ringing,
    Snoozed,
    Missed,
}

/// Reference to an alarm sound understood by the hardware controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundRef(pub String);

impl Default for SoundRef {
    fn default() -> Self {
        Self("default".into())
    }
}

/// Per-alarm snooze configuration and live bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozeConfig {
    pub enabled: bool,
    /// Maximum snoozes per ring cycle.
    pub limit: u8,
    /// Snoozes left in the current ring cycle. Non-increasing within a
    /// cycle; reset to `limit` when the alarm re-enters `Upcoming`.
    pub remaining: u8,
    pub interval_minutes: u32,
}

impl SnoozeConfig {
    pub fn new(limit: u8, interval_minutes: u32) -> Self {
        Self { enabled: true, limit, remaining: limit, interval_minutes }
    }

    pub fn can_snooze(&self) -> bool {
        self.enabled && self.remaining > 0
    }

    /// Spend one snooze. Returns false (and changes nothing) once the
    /// budget is exhausted or snoozing is disabled.
    pub fn consume(&mut self) -> bool {
        if !self.can_snooze() {
            return false;
        }
        self.remaining -= 1;
        true
    }

    /// Restore the full budget for the next ring cycle.
    pub fn reset(&mut self) {
        self.remaining = self.limit;
    }
}

impl Default for SnoozeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SNOOZE_LIMIT, DEFAULT_SNOOZE_INTERVAL_MIN)
    }
}

/// A recurring or one-shot reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAlarm {
    /// Store-assigned identity; [`UNSAVED_ID`] until first persisted.
    pub id: i64,
    pub hour: u32,
    pub minute: u32,
    /// True exactly when `repeat_days` holds the full week.
    pub is_daily: bool,
    /// Unique repeat week-days; empty means one-shot.
    pub repeat_days: HashSet<Weekday>,
    pub enabled: bool,
    pub sound: SoundRef,
    pub vibrate: bool,
    pub volume_percent: u8,
    pub snooze: SnoozeConfig,
    pub state: AlarmState,
}

impl ScheduledAlarm {
    /// Create a new one-shot alarm in `Upcoming`.
    ///
    /// # Errors
    /// Returns `ConstraintViolation` when the time of day is out of range.
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(ChimeError::ConstraintViolation(format!(
                "invalid time of day {hour:02}:{minute:02}"
            )));
        }
        Ok(Self {
            id: UNSAVED_ID,
            hour,
            minute,
            is_daily: false,
            repeat_days: HashSet::new(),
            enabled: true,
            sound: SoundRef::default(),
            vibrate: true,
            volume_percent: DEFAULT_VOLUME_PERCENT,
            snooze: SnoozeConfig::default(),
            state: AlarmState::Upcoming,
        })
    }

    /// The alarm's wall-clock time of day.
    pub fn time_of_day(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour.min(23), self.minute.min(59), 0)
            .unwrap_or(NaiveTime::MIN)
    }

    /// True when the alarm fires once and is done.
    pub fn is_one_shot(&self) -> bool {
        self.repeat_days.is_empty()
    }

    /// Turn daily repetition on (fills the week) or off (clears it).
    pub fn set_daily(&mut self, daily: bool) {
        self.is_daily = daily;
        if daily {
            self.repeat_days = full_week();
        } else {
            self.repeat_days.clear();
        }
    }

    /// Toggle a single repeat day, maintaining the daily invariant:
    /// completing the week sets `is_daily`; removing a day from a daily
    /// alarm first clears `is_daily`.
    pub fn toggle_repeat_day(&mut self, day: Weekday) {
        if self.repeat_days.contains(&day) {
            if self.is_daily {
                self.is_daily = false;
            }
            self.repeat_days.remove(&day);
        } else {
            self.repeat_days.insert(day);
            if self.repeat_days.len() == 7 {
                self.is_daily = true;
            }
        }
    }

    /// Restore the snooze budget; called whenever the alarm re-enters
    /// `Upcoming`.
    pub fn reset_snooze(&mut self) {
        self.snooze.reset();
    }
}

fn full_week() -> HashSet<Weekday> {
    [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_time_of_day() {
        assert!(ScheduledAlarm::new(24, 0).is_err());
        assert!(ScheduledAlarm::new(8, 60).is_err());
        assert!(ScheduledAlarm::new(23, 59).is_ok());
    }

    #[test]
    fn completing_the_week_sets_daily() {
        let mut alarm = ScheduledAlarm::new(7, 30).unwrap();
        for day in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ] {
            alarm.toggle_repeat_day(day);
            assert!(!alarm.is_daily);
        }
        alarm.toggle_repeat_day(Weekday::Sun);
        assert!(alarm.is_daily);
    }

    #[test]
    fn removing_a_day_clears_daily_first() {
        let mut alarm = ScheduledAlarm::new(7, 30).unwrap();
        alarm.set_daily(true);
        assert!(alarm.is_daily);
        assert_eq!(alarm.repeat_days.len(), 7);

        alarm.toggle_repeat_day(Weekday::Wed);
        assert!(!alarm.is_daily);
        assert_eq!(alarm.repeat_days.len(), 6);
    }

    #[test]
    fn snooze_budget_is_monotonic() {
        let mut snooze = SnoozeConfig::new(2, 5);
        assert!(snooze.consume());
        assert!(snooze.consume());
        assert!(!snooze.can_snooze());
        assert!(!snooze.consume());
        assert_eq!(snooze.remaining, 0);

        snooze.reset();
        assert_eq!(snooze.remaining, 2);
    }

    #[test]
    fn disabled_snooze_never_consumes() {
        let mut snooze = SnoozeConfig { enabled: false, ..SnoozeConfig::default() };
        assert!(!snooze.consume());
        assert_eq!(snooze.remaining, snooze.limit);
    }
}
