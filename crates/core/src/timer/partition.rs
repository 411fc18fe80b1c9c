//! Live partitioning of the timer collection.

use chime_domain::{Countdown, TimerStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// The timer collection split for consumers, with remaining time already
/// projected to `generated_at`.
///
/// Ordering is stable and documented:
/// - `active`: running timers before paused ones, each group ascending by
///   remaining time, id as the final key;
/// - `completed`: ascending by remaining time, i.e. most overdue first,
///   id as the final key.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimerPartitions {
    pub active: Vec<Countdown>,
    pub completed: Vec<Countdown>,
    pub generated_at: Option<DateTime<Utc>>,
}

impl TimerPartitions {
    /// Project every live timer to `now` and split by completion.
    ///
    /// Stopped and idle records are excluded; a record deleted from the
    /// store simply stops appearing here.
    pub fn project(timers: &[Countdown], now: DateTime<Utc>) -> Self {
        let mut active = Vec::new();
        let mut completed = Vec::new();

        for timer in timers {
            if !matches!(timer.status, TimerStatus::Running | TimerStatus::Paused) {
                continue;
            }
            let mut projected = timer.clone();
            projected.remaining_ms = timer.remaining_at(now);
            if projected.remaining_ms > 0 {
                active.push(projected);
            } else {
                completed.push(projected);
            }
        }

        active.sort_by_key(|t| (!t.is_running, t.remaining_ms, t.id));
        completed.sort_by_key(|t| (t.remaining_ms, t.id));

        Self { active, completed, generated_at: Some(now) }
    }

    /// True while at least one timer is actually counting down.
    pub fn has_running(&self) -> bool {
        self.active.iter().chain(self.completed.iter()).any(|t| t.is_running)
    }
}
