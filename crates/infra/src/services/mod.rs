//! Logging-only adapter implementations for development and tests.
//!
//! Real deployments plug in platform notification and audio backends;
//! these stand-ins only narrate what would happen.

use async_trait::async_trait;
use chime_core::{HardwareController, NotificationPresenter, PermissionGate};
use chime_domain::{Result, RingingSnapshot, SoundRef};
use tracing::{debug, info};

/// Notification presenter that logs instead of rendering.
pub struct LogNotifier;

#[async_trait]
impl NotificationPresenter for LogNotifier {
    async fn post_ringing(&self, snapshot: RingingSnapshot) -> Result<()> {
        info!(id = snapshot.event_id(), "notification: ringing");
        Ok(())
    }

    async fn post_missed(&self, snapshot: RingingSnapshot) -> Result<()> {
        info!(id = snapshot.event_id(), "notification: missed");
        Ok(())
    }

    async fn post_snoozed(&self, snapshot: RingingSnapshot) -> Result<()> {
        info!(id = snapshot.event_id(), "notification: snoozed");
        Ok(())
    }

    async fn cancel(&self, notification_id: i64) -> Result<()> {
        info!(id = notification_id, "notification: cancelled");
        Ok(())
    }
}

/// Hardware controller with no hardware.
pub struct NullHardware;

impl HardwareController for NullHardware {
    fn play_alarm_sound(&self, sound: &SoundRef, volume_percent: u8) -> Result<()> {
        debug!(sound = %sound.0, volume_percent, "hardware: play sound");
        Ok(())
    }

    fn stop_sound(&self) -> Result<()> {
        debug!("hardware: stop sound");
        Ok(())
    }

    fn start_vibration(&self) -> Result<()> {
        debug!("hardware: start vibration");
        Ok(())
    }

    fn stop_vibration(&self) -> Result<()> {
        debug!("hardware: stop vibration");
        Ok(())
    }
}

/// Permission gate with fixed answers, for environments without a real
/// permission surface.
pub struct StaticPermissions {
    pub notifications: bool,
    pub exact_scheduling: bool,
}

impl StaticPermissions {
    pub fn all_granted() -> Self {
        Self { notifications: true, exact_scheduling: true }
    }
}

impl PermissionGate for StaticPermissions {
    fn notifications_granted(&self) -> bool {
        self.notifications
    }

    fn exact_scheduling_granted(&self) -> bool {
        self.exact_scheduling
    }
}
