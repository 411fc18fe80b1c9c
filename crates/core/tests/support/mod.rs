//! Shared in-memory port implementations for integration tests.

// Not every test binary exercises every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chime_core::{
    AlarmStore, HardwareController, NotificationPresenter, PermissionGate, TimerStore,
    WakeupFacility,
};
use chime_domain::constants::UNSAVED_ID;
use chime_domain::{
    AlarmState, ChimeError, Countdown, Result, RingingSnapshot, ScheduledAlarm, SoundRef,
    WakeAction,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;

/// In-memory alarm store with the same reactive contract as the real
/// adapter: every mutation re-emits the full sorted collection.
pub struct InMemoryAlarmStore {
    alarms: Mutex<HashMap<i64, ScheduledAlarm>>,
    next_id: Mutex<i64>,
    tx: watch::Sender<Vec<ScheduledAlarm>>,
    /// Every update_alarm call, in order.
    pub updates: Mutex<Vec<ScheduledAlarm>>,
}

impl InMemoryAlarmStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self { alarms: Mutex::new(HashMap::new()), next_id: Mutex::new(1), tx, updates: Mutex::new(Vec::new()) }
    }

    /// Insert a record as test fixture, bypassing save validation.
    pub fn seed(&self, alarm: ScheduledAlarm) {
        {
            let mut alarms = self.alarms.lock();
            let mut next_id = self.next_id.lock();
            *next_id = (*next_id).max(alarm.id + 1);
            alarms.insert(alarm.id, alarm);
        }
        self.emit();
    }

    pub fn get(&self, id: i64) -> Option<ScheduledAlarm> {
        self.alarms.lock().get(&id).cloned()
    }

    /// How many times an update wrote the given state for the given id.
    pub fn updates_with_state(&self, id: i64, state: AlarmState) -> usize {
        self.updates.lock().iter().filter(|a| a.id == id && a.state == state).count()
    }

    fn emit(&self) {
        let mut list: Vec<ScheduledAlarm> = self.alarms.lock().values().cloned().collect();
        list.sort_by_key(|a| a.id);
        self.tx.send_replace(list);
    }
}

#[async_trait]
impl AlarmStore for InMemoryAlarmStore {
    fn observe_alarms(&self) -> watch::Receiver<Vec<ScheduledAlarm>> {
        self.tx.subscribe()
    }

    async fn alarm_by_id(&self, id: i64) -> Result<ScheduledAlarm> {
        self.alarms
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| ChimeError::NotFound(format!("alarm {id}")))
    }

    async fn save_alarm(&self, mut alarm: ScheduledAlarm) -> Result<i64> {
        if alarm.id != UNSAVED_ID {
            return Err(ChimeError::ConstraintViolation(
                "save_alarm requires an unsaved record".into(),
            ));
        }
        {
            let mut next_id = self.next_id.lock();
            alarm.id = *next_id;
            *next_id += 1;
            self.alarms.lock().insert(alarm.id, alarm.clone());
        }
        self.emit();
        Ok(alarm.id)
    }

    async fn update_alarm(&self, alarm: ScheduledAlarm) -> Result<()> {
        if alarm.id == UNSAVED_ID {
            return Err(ChimeError::ConstraintViolation("update_alarm requires a saved record".into()));
        }
        {
            let mut alarms = self.alarms.lock();
            if !alarms.contains_key(&alarm.id) {
                return Err(ChimeError::NotFound(format!("alarm {}", alarm.id)));
            }
            alarms.insert(alarm.id, alarm.clone());
        }
        self.updates.lock().push(alarm);
        self.emit();
        Ok(())
    }

    async fn delete_alarm(&self, id: i64) -> Result<()> {
        self.alarms.lock().remove(&id);
        self.emit();
        Ok(())
    }
}

/// In-memory timer store mirroring the reactive contract.
pub struct InMemoryTimerStore {
    timers: Mutex<HashMap<i64, Countdown>>,
    next_id: Mutex<i64>,
    tx: watch::Sender<Vec<Countdown>>,
}

impl InMemoryTimerStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self { timers: Mutex::new(HashMap::new()), next_id: Mutex::new(1), tx }
    }

    pub fn seed(&self, timer: Countdown) {
        {
            let mut timers = self.timers.lock();
            let mut next_id = self.next_id.lock();
            *next_id = (*next_id).max(timer.id + 1);
            timers.insert(timer.id, timer);
        }
        self.emit();
    }

    pub fn get(&self, id: i64) -> Option<Countdown> {
        self.timers.lock().get(&id).cloned()
    }

    pub fn remove(&self, id: i64) {
        self.timers.lock().remove(&id);
        self.emit();
    }

    fn emit(&self) {
        let mut list: Vec<Countdown> = self.timers.lock().values().cloned().collect();
        list.sort_by_key(|t| t.id);
        self.tx.send_replace(list);
    }
}

#[async_trait]
impl TimerStore for InMemoryTimerStore {
    fn observe_timers(&self) -> watch::Receiver<Vec<Countdown>> {
        self.tx.subscribe()
    }

    async fn timer_snapshot(&self) -> Result<Vec<Countdown>> {
        let mut list: Vec<Countdown> = self.timers.lock().values().cloned().collect();
        list.sort_by_key(|t| t.id);
        Ok(list)
    }

    async fn timer_by_id(&self, id: i64) -> Result<Countdown> {
        self.timers
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| ChimeError::NotFound(format!("timer {id}")))
    }

    async fn save_timer(&self, mut timer: Countdown) -> Result<i64> {
        {
            let mut timers = self.timers.lock();
            if timer.id == UNSAVED_ID {
                let mut next_id = self.next_id.lock();
                timer.id = *next_id;
                *next_id += 1;
            }
            timers.insert(timer.id, timer.clone());
        }
        self.emit();
        Ok(timer.id)
    }

    async fn delete_timer(&self, id: i64) -> Result<()> {
        self.timers.lock().remove(&id);
        self.emit();
        Ok(())
    }
}

/// Notification presenter recording every call.
#[derive(Default)]
pub struct RecordingNotifier {
    pub posted: Mutex<Vec<(&'static str, RingingSnapshot)>>,
    pub cancelled: Mutex<Vec<i64>>,
}

impl RecordingNotifier {
    pub fn posted_kinds(&self, kind: &str) -> Vec<i64> {
        self.posted
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, s)| s.event_id())
            .collect()
    }
}

#[async_trait]
impl NotificationPresenter for RecordingNotifier {
    async fn post_ringing(&self, snapshot: RingingSnapshot) -> Result<()> {
        self.posted.lock().push(("ringing", snapshot));
        Ok(())
    }

    async fn post_missed(&self, snapshot: RingingSnapshot) -> Result<()> {
        self.posted.lock().push(("missed", snapshot));
        Ok(())
    }

    async fn post_snoozed(&self, snapshot: RingingSnapshot) -> Result<()> {
        self.posted.lock().push(("snoozed", snapshot));
        Ok(())
    }

    async fn cancel(&self, notification_id: i64) -> Result<()> {
        self.cancelled.lock().push(notification_id);
        Ok(())
    }
}

/// Hardware controller counting invocations.
#[derive(Default)]
pub struct CountingHardware {
    pub plays: AtomicUsize,
    pub sound_stops: AtomicUsize,
    pub vibration_starts: AtomicUsize,
    pub vibration_stops: AtomicUsize,
    pub last_volume: Mutex<Option<u8>>,
}

impl HardwareController for CountingHardware {
    fn play_alarm_sound(&self, _sound: &SoundRef, volume_percent: u8) -> Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        *self.last_volume.lock() = Some(volume_percent);
        Ok(())
    }

    fn stop_sound(&self) -> Result<()> {
        self.sound_stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn start_vibration(&self) -> Result<()> {
        self.vibration_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop_vibration(&self) -> Result<()> {
        self.vibration_stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Permission gate with fixed answers.
pub struct StaticGate {
    pub notifications: bool,
    pub exact_scheduling: bool,
}

impl StaticGate {
    pub fn granted() -> Self {
        Self { notifications: true, exact_scheduling: true }
    }
}

impl PermissionGate for StaticGate {
    fn notifications_granted(&self) -> bool {
        self.notifications
    }

    fn exact_scheduling_granted(&self) -> bool {
        self.exact_scheduling
    }
}

/// Wake-up facility recording registrations and cancellations.
#[derive(Default)]
pub struct RecordingFacility {
    pub scheduled: Mutex<Vec<(i64, WakeAction, DateTime<Utc>)>>,
    pub cancelled: Mutex<Vec<(i64, WakeAction)>>,
}

impl RecordingFacility {
    pub fn scheduled_actions(&self, id: i64) -> Vec<WakeAction> {
        self.scheduled.lock().iter().filter(|(i, _, _)| *i == id).map(|(_, a, _)| *a).collect()
    }
}

#[async_trait]
impl WakeupFacility for RecordingFacility {
    async fn schedule(
        &self,
        id: i64,
        action: WakeAction,
        at: DateTime<Utc>,
        _payload: Option<serde_json::Value>,
    ) -> Result<()> {
        self.scheduled.lock().push((id, action, at));
        Ok(())
    }

    async fn cancel(&self, id: i64, action: WakeAction) -> Result<()> {
        self.cancelled.lock().push((id, action));
        Ok(())
    }
}

/// Poll `predicate` until it holds or the timeout elapses.
pub async fn wait_for<F>(timeout: Duration, mut predicate: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
