//! Port interfaces for alarm coordination
//!
//! These traits define the boundaries between the coordination logic and
//! the infrastructure implementations (persistent store, notification
//! surface, audio/vibration hardware).

use async_trait::async_trait;
use chime_domain::{Result, RingingSnapshot, ScheduledAlarm, SoundRef};
use tokio::sync::watch;

/// Persistent store surface for scheduled alarms.
///
/// The store is the single source of truth. `observe_alarms` hands out a
/// level-triggered subscription holding the latest full collection; every
/// mutation is reflected in a subsequent emission.
#[async_trait]
pub trait AlarmStore: Send + Sync {
    /// Subscribe to the alarm collection. The receiver always holds the
    /// most recent state; emissions coalesce rather than queue.
    fn observe_alarms(&self) -> watch::Receiver<Vec<ScheduledAlarm>>;

    /// Point read by id.
    async fn alarm_by_id(&self, id: i64) -> Result<ScheduledAlarm>;

    /// Persist a new alarm. Rejects records that already carry a non-zero
    /// id; returns the store-assigned id.
    async fn save_alarm(&self, alarm: ScheduledAlarm) -> Result<i64>;

    /// Update an existing alarm. Rejects the unsaved-id sentinel.
    async fn update_alarm(&self, alarm: ScheduledAlarm) -> Result<()>;

    /// Delete by id.
    async fn delete_alarm(&self, id: i64) -> Result<()>;
}

/// User-facing notification surface.
///
/// The core supplies snapshots of display-relevant fields; rendering and
/// localization happen on the other side of this boundary.
#[async_trait]
pub trait NotificationPresenter: Send + Sync {
    async fn post_ringing(&self, snapshot: RingingSnapshot) -> Result<()>;

    async fn post_missed(&self, snapshot: RingingSnapshot) -> Result<()>;

    async fn post_snoozed(&self, snapshot: RingingSnapshot) -> Result<()>;

    /// Remove a previously posted notification. Unknown ids are not an
    /// error.
    async fn cancel(&self, notification_id: i64) -> Result<()>;
}

/// Audio and vibration hardware.
///
/// Synchronous on purpose: teardown must be able to release playback
/// without suspension points, and implementations restore any device
/// volume they overrode inside `stop_sound`.
pub trait HardwareController: Send + Sync {
    fn play_alarm_sound(&self, sound: &SoundRef, volume_percent: u8) -> Result<()>;

    fn stop_sound(&self) -> Result<()>;

    fn start_vibration(&self) -> Result<()>;

    fn stop_vibration(&self) -> Result<()>;
}
