//! Domain types and models

pub mod alarm;
pub mod snapshot;
pub mod timer;

use serde::{Deserialize, Serialize};

pub use alarm::{AlarmState, ScheduledAlarm, SnoozeConfig, SoundRef};
pub use snapshot::RingingSnapshot;
pub use timer::{Countdown, TimerStatus};

/// Action slot of a deferred wake-up registration.
///
/// Together with the event id it forms the unique key of a registration:
/// re-scheduling the same `(id, action)` pair overwrites the prior one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeAction {
    /// The event's scheduled time arrived.
    Trigger,
    /// The event rang longer than the configured timeout without user
    /// action.
    Timeout,
    /// A snoozed event is due to ring again.
    Snooze,
}

impl WakeAction {
    /// Every action slot an event id can hold a registration for.
    pub const ALL: [Self; 3] = [Self::Trigger, Self::Timeout, Self::Snooze];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::Timeout => "timeout",
            Self::Snooze => "snooze",
        }
    }
}

/// A fired wake-up delivered by the deferred wake-up facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeupEvent {
    pub id: i64,
    pub action: WakeAction,
    /// Opaque payload supplied at registration time.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}
