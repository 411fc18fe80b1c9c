//! Countdown timer model.
//!
//! Remaining time is a derived projection: while a timer runs it is always
//! recomputed as `target - (now - started_at)` from absolute timestamps.
//! The persisted `remaining_ms` is only authoritative while the timer is
//! paused or idle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::UNSAVED_ID;
use crate::errors::{ChimeError, Result};

/// Lifecycle state of a countdown timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// An independent, non-recurring duration-based reminder.
///
/// `remaining_ms <= 0` while `status == Running` is the
/// completed-but-still-active sub-state: the timer keeps ringing until the
/// user acts on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    /// Store-assigned identity; [`UNSAVED_ID`] until first persisted.
    pub id: i64,
    /// Display label, chosen by the input screen.
    #[serde(default)]
    pub label: String,
    /// Original length of the countdown.
    pub target_duration_ms: i64,
    /// Live remaining time. Derived, never drifted by tick accumulation.
    pub remaining_ms: i64,
    /// Wall-clock instant the countdown (re)started.
    pub started_at: Option<DateTime<Utc>>,
    pub is_running: bool,
    pub status: TimerStatus,
    /// Set when a completed timer is restarted for a short grace window.
    #[serde(default)]
    pub snoozed_target_at: Option<DateTime<Utc>>,
}

impl Countdown {
    /// Create a new idle countdown.
    ///
    /// # Errors
    /// Returns `ConstraintViolation` for non-positive durations.
    pub fn new(label: impl Into<String>, target_duration_ms: i64) -> Result<Self> {
        if target_duration_ms <= 0 {
            return Err(ChimeError::ConstraintViolation(format!(
                "countdown duration must be positive, got {target_duration_ms}ms"
            )));
        }
        Ok(Self {
            id: UNSAVED_ID,
            label: label.into(),
            target_duration_ms,
            remaining_ms: target_duration_ms,
            started_at: None,
            is_running: false,
            status: TimerStatus::Idle,
            snoozed_target_at: None,
        })
    }

    /// Remaining time at `now`, recomputed from the absolute start
    /// timestamp while running. Not running ⇒ the stored value, untouched.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> i64 {
        if !self.is_running {
            return self.remaining_ms;
        }
        match self.started_at {
            Some(started) => {
                self.target_duration_ms - (now - started).num_milliseconds()
            }
            None => self.remaining_ms,
        }
    }

    /// True when the countdown has reached zero at `now`.
    pub fn is_completed_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining_at(now) <= 0
    }

    /// Start from idle: full duration ahead, anchored at `now`.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.started_at = Some(now);
        self.remaining_ms = self.target_duration_ms;
        self.is_running = true;
        self.status = TimerStatus::Running;
        self.snoozed_target_at = None;
    }

    /// Freeze elapsed accounting, recording remaining time as-is.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        self.remaining_ms = self.remaining_at(now);
        self.is_running = false;
        self.status = TimerStatus::Paused;
        self.started_at = None;
    }

    /// Resume with a fresh anchor so the uniform recompute formula keeps
    /// holding: `started_at = now - (target - remaining)`.
    pub fn resume(&mut self, now: DateTime<Utc>) {
        let elapsed_ms = self.target_duration_ms - self.remaining_ms;
        self.started_at = Some(now - chrono::Duration::milliseconds(elapsed_ms));
        self.is_running = true;
        self.status = TimerStatus::Running;
    }

    /// Stop for good; the record is kept until deleted by the user.
    pub fn stop(&mut self, now: DateTime<Utc>) {
        self.remaining_ms = self.remaining_at(now);
        self.is_running = false;
        self.status = TimerStatus::Stopped;
        self.started_at = None;
        self.snoozed_target_at = None;
    }

    /// Restart a completed timer for a short grace window ending at
    /// `now + grace_ms`.
    pub fn snooze_completed(&mut self, now: DateTime<Utc>, grace_ms: i64) {
        let target = now + chrono::Duration::milliseconds(grace_ms);
        self.snoozed_target_at = Some(target);
        // Anchor so that exactly grace_ms remains.
        self.started_at = Some(now - chrono::Duration::milliseconds(self.target_duration_ms - grace_ms));
        self.remaining_ms = grace_ms;
        self.is_running = true;
        self.status = TimerStatus::Running;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn rejects_non_positive_duration() {
        assert!(Countdown::new("tea", 0).is_err());
        assert!(Countdown::new("tea", -5).is_err());
    }

    #[test]
    fn remaining_is_recomputed_from_start_anchor() {
        let mut timer = Countdown::new("tea", 60_000).unwrap();
        timer.start(at(0));
        assert_eq!(timer.remaining_at(at(10)), 50_000);
        assert_eq!(timer.remaining_at(at(60)), 0);
        // Overdue keeps counting down past zero.
        assert_eq!(timer.remaining_at(at(65)), -5_000);
        assert!(timer.is_completed_at(at(65)));
    }

    #[test]
    fn paused_timer_does_not_advance() {
        let mut timer = Countdown::new("tea", 60_000).unwrap();
        timer.start(at(0));
        timer.pause(at(15));
        assert_eq!(timer.remaining_ms, 45_000);
        // Idempotent with respect to the clock while paused.
        assert_eq!(timer.remaining_at(at(500)), 45_000);
    }

    #[test]
    fn resume_restores_the_uniform_formula() {
        let mut timer = Countdown::new("tea", 60_000).unwrap();
        timer.start(at(0));
        timer.pause(at(20));
        timer.resume(at(100));
        // 40s were left at pause; 5s after resume, 35s remain.
        assert_eq!(timer.remaining_at(at(105)), 35_000);
    }

    #[test]
    fn restoration_after_suspension_is_authoritative() {
        // Persisted running timer restored 65s after its anchor: completed,
        // never drifted beyond the real elapsed delta.
        let mut timer = Countdown::new("tea", 60_000).unwrap();
        timer.start(at(0));
        let restored = timer.clone();
        assert_eq!(restored.remaining_at(at(65)), -5_000);
        assert!(restored.is_completed_at(at(65)));
    }

    #[test]
    fn snooze_completed_grants_grace_window() {
        let mut timer = Countdown::new("tea", 60_000).unwrap();
        timer.start(at(0));
        assert!(timer.is_completed_at(at(61)));
        timer.snooze_completed(at(61), 30_000);
        assert_eq!(timer.remaining_at(at(61)), 30_000);
        assert_eq!(timer.snoozed_target_at, Some(at(91)));
        assert!(!timer.is_completed_at(at(62)));
        assert!(timer.is_completed_at(at(92)));
    }
}
