//! Scheduler facade over the deferred wake-up facility.
//!
//! Translates domain scheduling requests (trigger, timeout, snooze) into
//! facility registrations using the trigger math. Issues no store writes;
//! facility and permission failures surface as typed results.

use std::sync::Arc;

use chime_domain::{ChimeError, Result, WakeAction};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use super::ports::{PermissionGate, WakeupFacility};
use crate::trigger::next_snooze_trigger;

/// Facade mapping each call to exactly one facility registration or
/// cancellation keyed by `(id, action)`.
pub struct TriggerScheduler {
    facility: Arc<dyn WakeupFacility>,
    permissions: Arc<dyn PermissionGate>,
}

impl TriggerScheduler {
    pub fn new(facility: Arc<dyn WakeupFacility>, permissions: Arc<dyn PermissionGate>) -> Self {
        Self { facility, permissions }
    }

    /// Register the alarm's next trigger.
    ///
    /// # Errors
    /// `SchedulingDenied` when exact scheduling is not granted; the alarm
    /// keeps its prior state and the action is retried once permission
    /// arrives.
    pub async fn schedule_trigger(&self, id: i64, at: DateTime<Utc>) -> Result<()> {
        self.ensure_exact_scheduling()?;
        debug!(id, at = %at, "scheduling trigger");
        self.facility.schedule(id, WakeAction::Trigger, at, None).await
    }

    pub async fn cancel_trigger(&self, id: i64) -> Result<()> {
        Self::tolerate_not_found(self.facility.cancel(id, WakeAction::Trigger).await)
    }

    /// Register the re-ring of a snoozed alarm at `now + interval`.
    pub async fn schedule_snooze(&self, id: i64, interval_minutes: u32) -> Result<()> {
        self.ensure_exact_scheduling()?;
        let at = next_snooze_trigger(&Utc::now(), interval_minutes);
        debug!(id, at = %at, "scheduling snooze");
        self.facility.schedule(id, WakeAction::Snooze, at, None).await
    }

    /// Register the ring-timeout for an alarm that just started ringing.
    pub async fn schedule_timeout(&self, id: i64, timeout_offset_ms: i64) -> Result<()> {
        self.ensure_exact_scheduling()?;
        let at = Utc::now() + Duration::milliseconds(timeout_offset_ms);
        debug!(id, at = %at, "scheduling ring timeout");
        self.facility.schedule(id, WakeAction::Timeout, at, None).await
    }

    /// Cancel every known action slot for the id. Missing registrations
    /// count as success; cancellation is idempotent.
    pub async fn cancel_all(&self, id: i64) -> Result<()> {
        for action in WakeAction::ALL {
            Self::tolerate_not_found(self.facility.cancel(id, action).await)?;
        }
        Ok(())
    }

    fn ensure_exact_scheduling(&self) -> Result<()> {
        if self.permissions.exact_scheduling_granted() {
            return Ok(());
        }
        warn!("exact scheduling permission not granted; skipping registration");
        Err(ChimeError::SchedulingDenied("exact scheduling permission not granted".into()))
    }

    fn tolerate_not_found(result: Result<()>) -> Result<()> {
        match result {
            Err(ChimeError::NotFound(_)) | Ok(()) => Ok(()),
            err => err,
        }
    }
}
