//! Exclusive guard over the ringing hardware.
//!
//! Ringtone and vibration playback is a single shared resource: only one
//! alarm may drive it, and overlapping start/stop/pause calls must never
//! leave playback in an inconsistent state. All transitions happen under
//! one lock, which is never held across an await point.

use std::sync::Arc;

use chime_domain::{Result, ScheduledAlarm, SoundRef};
use parking_lot::Mutex;
use tracing::debug;

use super::ports::HardwareController;

#[derive(Debug, Clone)]
struct Playback {
    alarm_id: i64,
    sound: SoundRef,
    volume_percent: u8,
    vibrate: bool,
    /// True while the host UI has transiently silenced us via `pause`.
    paused: bool,
}

/// Single-instance owner of the ringing hardware.
///
/// Start is idempotent per alarm id: re-processing an unchanged emission
/// does not restart already-playing audio. Release is idempotent overall:
/// the controller is invoked at most once per acquired playback.
pub struct RingingHardware {
    controller: Arc<dyn HardwareController>,
    playback: Mutex<Option<Playback>>,
}

impl RingingHardware {
    pub fn new(controller: Arc<dyn HardwareController>) -> Self {
        Self { controller, playback: Mutex::new(None) }
    }

    /// Start (or switch) playback for the given alarm.
    pub fn start(&self, alarm: &ScheduledAlarm) -> Result<()> {
        let mut slot = self.playback.lock();
        if let Some(active) = slot.as_ref() {
            if active.alarm_id == alarm.id {
                return Ok(());
            }
            // A different alarm took over the foreground slot.
            Self::release_locked(&self.controller, &mut slot)?;
        }

        self.controller.play_alarm_sound(&alarm.sound, alarm.volume_percent)?;
        if alarm.vibrate {
            self.controller.start_vibration()?;
        }
        *slot = Some(Playback {
            alarm_id: alarm.id,
            sound: alarm.sound.clone(),
            volume_percent: alarm.volume_percent,
            vibrate: alarm.vibrate,
            paused: false,
        });
        debug!(alarm_id = alarm.id, "ringing hardware started");
        Ok(())
    }

    /// Stop playback unconditionally. Returns the id that was playing, if
    /// any; a second call is a no-op.
    pub fn release(&self) -> Result<Option<i64>> {
        let mut slot = self.playback.lock();
        let id = slot.as_ref().map(|p| p.alarm_id);
        Self::release_locked(&self.controller, &mut slot)?;
        Ok(id)
    }

    /// Stop playback only if the given alarm currently owns it.
    pub fn release_if(&self, alarm_id: i64) -> Result<Option<i64>> {
        let mut slot = self.playback.lock();
        match slot.as_ref() {
            Some(active) if active.alarm_id == alarm_id => {
                Self::release_locked(&self.controller, &mut slot)?;
                Ok(Some(alarm_id))
            }
            _ => Ok(None),
        }
    }

    /// Silence the hardware while keeping the playback claim, for a host
    /// UI transiently obscuring the ringing screen. No state change.
    pub fn pause(&self) -> Result<()> {
        let mut slot = self.playback.lock();
        if let Some(active) = slot.as_mut() {
            if !active.paused {
                self.controller.stop_sound()?;
                if active.vibrate {
                    self.controller.stop_vibration()?;
                }
                active.paused = true;
            }
        }
        Ok(())
    }

    /// Undo a `pause`, resuming playback for the claimed alarm.
    pub fn resume(&self) -> Result<()> {
        let mut slot = self.playback.lock();
        if let Some(active) = slot.as_mut() {
            if active.paused {
                self.controller.play_alarm_sound(&active.sound, active.volume_percent)?;
                if active.vibrate {
                    self.controller.start_vibration()?;
                }
                active.paused = false;
            }
        }
        Ok(())
    }

    /// Id of the alarm currently owning playback.
    pub fn active_alarm(&self) -> Option<i64> {
        self.playback.lock().as_ref().map(|p| p.alarm_id)
    }

    fn release_locked(
        controller: &Arc<dyn HardwareController>,
        slot: &mut Option<Playback>,
    ) -> Result<()> {
        let Some(active) = slot.take() else {
            return Ok(());
        };
        // Stop everything before propagating any failure so a broken sound
        // channel cannot leave vibration running.
        let sound_result = if active.paused { Ok(()) } else { controller.stop_sound() };
        let vibration_result = if active.vibrate && !active.paused {
            controller.stop_vibration()
        } else {
            Ok(())
        };
        debug!(alarm_id = active.alarm_id, "ringing hardware released");
        sound_result?;
        vibration_result
    }
}
