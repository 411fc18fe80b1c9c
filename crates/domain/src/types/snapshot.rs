//! Display snapshots handed to the notification presenter.
//!
//! The core assembles these from live state; rendering and formatting are
//! the presenter's responsibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alarm::{ScheduledAlarm, SoundRef};
use super::timer::Countdown;

/// Snapshot of the display-relevant fields of a ringing, missed, or
/// snoozed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RingingSnapshot {
    Alarm {
        id: i64,
        hour: u32,
        minute: u32,
        sound: SoundRef,
        vibrate: bool,
        volume_percent: u8,
        fired_at: DateTime<Utc>,
    },
    Timer {
        id: i64,
        label: String,
        target_duration_ms: i64,
        /// How far past zero the countdown is; 0 while still active.
        overdue_ms: i64,
        fired_at: DateTime<Utc>,
    },
}

impl RingingSnapshot {
    pub fn for_alarm(alarm: &ScheduledAlarm, fired_at: DateTime<Utc>) -> Self {
        Self::Alarm {
            id: alarm.id,
            hour: alarm.hour,
            minute: alarm.minute,
            sound: alarm.sound.clone(),
            vibrate: alarm.vibrate,
            volume_percent: alarm.volume_percent,
            fired_at,
        }
    }

    pub fn for_timer(timer: &Countdown, now: DateTime<Utc>) -> Self {
        Self::Timer {
            id: timer.id,
            label: timer.label.clone(),
            target_duration_ms: timer.target_duration_ms,
            overdue_ms: (-timer.remaining_at(now)).max(0),
            fired_at: now,
        }
    }

    /// Identity of the underlying event, shared with its notification id.
    pub fn event_id(&self) -> i64 {
        match self {
            Self::Alarm { id, .. } | Self::Timer { id, .. } => *id,
        }
    }
}
