//! Alarm ringing coordinator.
//!
//! A single long-lived subscription to the persisted alarm collection
//! drives all ringing side effects. Emissions are processed strictly in
//! arrival order, one at a time; the reaction is level-triggered, so
//! re-processing an unchanged collection is safe. When several alarms ring
//! at once the highest id wins the foreground slot and every other ringing
//! alarm is demoted to missed through a store write.
//!
//! A failure while processing one emission is logged and the loop
//! continues: the store is authoritative and the next emission repairs any
//! partial effect.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chime_domain::{
    AlarmState, ChimeError, CoordinatorConfig, Result, RingingSnapshot, ScheduledAlarm, WakeAction,
    WakeupEvent,
};
use chrono::{Local, Utc};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::hardware::RingingHardware;
use super::ports::{AlarmStore, NotificationPresenter};
use crate::scheduling::facade::TriggerScheduler;
use crate::scheduling::ports::PermissionGate;
use crate::trigger::next_alarm_trigger;

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const JOIN_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// What the user meant by stopping a ringing alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Dismiss this ring cycle; the alarm stays armed for its next
    /// occurrence (one-shot alarms are spent and disabled).
    Dismiss,
    /// Turn the alarm off entirely.
    Disable,
}

/// Everything the observation loop needs, detached from `self` so the
/// spawned task owns its own clones.
struct LoopContext {
    store: Arc<dyn AlarmStore>,
    notifier: Arc<dyn NotificationPresenter>,
    hardware: Arc<RingingHardware>,
}

/// Coordinator owning the foreground ringing state.
pub struct RingingCoordinator {
    store: Arc<dyn AlarmStore>,
    scheduler: Arc<TriggerScheduler>,
    notifier: Arc<dyn NotificationPresenter>,
    hardware: Arc<RingingHardware>,
    permissions: Arc<dyn PermissionGate>,
    config: CoordinatorConfig,
    cancellation_token: SyncMutex<CancellationToken>,
    task_handle: TaskHandle,
}

impl RingingCoordinator {
    pub fn new(
        store: Arc<dyn AlarmStore>,
        scheduler: Arc<TriggerScheduler>,
        notifier: Arc<dyn NotificationPresenter>,
        hardware: Arc<RingingHardware>,
        permissions: Arc<dyn PermissionGate>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            scheduler,
            notifier,
            hardware,
            permissions,
            config,
            cancellation_token: SyncMutex::new(CancellationToken::new()),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the observation loop.
    ///
    /// # Errors
    /// Returns `ConstraintViolation` when the coordinator is already
    /// running.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let mut handle = self.task_handle.lock().await;
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(ChimeError::ConstraintViolation("coordinator already running".into()));
        }

        info!("Starting ringing coordinator");

        let context = LoopContext {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            hardware: Arc::clone(&self.hardware),
        };
        // Fresh token so the coordinator can restart after a stop.
        let cancel = CancellationToken::new();
        *self.cancellation_token.lock() = cancel.clone();

        *handle = Some(tokio::spawn(async move {
            Self::observe_loop(context, cancel).await;
        }));

        Ok(())
    }

    /// Stop the observation loop and release the hardware.
    ///
    /// Idempotent: stopping an already-stopped coordinator is a no-op and
    /// does not release hardware a second time.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let handle = self.task_handle.lock().await.take();
        let Some(handle) = handle else {
            debug!("coordinator already stopped");
            return Ok(());
        };

        info!("Stopping ringing coordinator");
        self.cancellation_token.lock().cancel();

        tokio::time::timeout(JOIN_TIMEOUT, handle)
            .await
            .map_err(|_| ChimeError::Unexpected("coordinator loop did not stop in time".into()))?
            .map_err(|join_error| ChimeError::Unexpected(join_error.to_string()))?;

        info!("Ringing coordinator stopped");
        Ok(())
    }

    /// Whether the observation loop is active.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Route a fired wake-up to the matching handler. A snooze re-ring is
    /// just another trigger.
    pub async fn handle_wakeup(&self, event: WakeupEvent) -> Result<()> {
        match event.action {
            WakeAction::Trigger | WakeAction::Snooze => self.on_trigger(event.id).await,
            WakeAction::Timeout => self.on_timeout(event.id).await,
        }
    }

    /// A trigger fired: promote the alarm into the ringing state.
    ///
    /// This is the only path that creates a new ringing alarm. The
    /// transition is rejected silently when notifications are not granted
    /// (the alarm keeps its prior state) and when the alarm is not in a
    /// promotable state (re-delivered trigger).
    #[instrument(skip(self))]
    pub async fn on_trigger(&self, id: i64) -> Result<()> {
        if !self.permissions.notifications_granted() {
            warn!(id, "notification permission not granted; skipping trigger");
            return Ok(());
        }

        let mut alarm = self.store.alarm_by_id(id).await?;
        if !alarm.enabled {
            debug!(id, "trigger for a disabled alarm; ignored");
            return Ok(());
        }
        match alarm.state {
            AlarmState::Upcoming | AlarmState::Snoozed => {
                alarm.state = AlarmState::Ringing;
                self.store.update_alarm(alarm).await?;

                // Arm the ring timeout so an unanswered alarm eventually
                // surfaces as missed instead of ringing forever.
                let timeout_ms = (self.config.ring_timeout_secs as i64).saturating_mul(1_000);
                match self.scheduler.schedule_timeout(id, timeout_ms).await {
                    Err(err) if err.is_permission_denied() => {
                        warn!(id, "ring timeout not scheduled; alarm rings until acted on");
                    }
                    other => other?,
                }
                Ok(())
            }
            AlarmState::Ringing | AlarmState::Missed => {
                debug!(id, state = ?alarm.state, "trigger re-delivered; ignored");
                Ok(())
            }
        }
    }

    /// The user asked to snooze the ringing alarm.
    ///
    /// A no-op once the snooze budget is exhausted: no state change, no
    /// store write.
    #[instrument(skip(self))]
    pub async fn on_snooze_requested(&self, id: i64) -> Result<()> {
        let mut alarm = self.store.alarm_by_id(id).await?;
        if alarm.state != AlarmState::Ringing {
            debug!(id, state = ?alarm.state, "snooze requested outside ringing; ignored");
            return Ok(());
        }
        if !alarm.snooze.consume() {
            debug!(id, "snooze budget exhausted; request is a no-op");
            return Ok(());
        }

        alarm.state = AlarmState::Snoozed;
        let interval = if alarm.snooze.interval_minutes > 0 {
            alarm.snooze.interval_minutes
        } else {
            self.config.default_snooze_interval_min
        };
        self.store.update_alarm(alarm.clone()).await?;

        match self.scheduler.schedule_snooze(id, interval).await {
            Err(err) if err.is_permission_denied() => {
                warn!(id, "snooze re-ring not scheduled; alarm stays snoozed");
            }
            other => other?,
        }

        self.notifier.post_snoozed(RingingSnapshot::for_alarm(&alarm, Utc::now())).await?;
        Ok(())
    }

    /// The ring timeout fired: the alarm rang unanswered for too long.
    #[instrument(skip(self))]
    pub async fn on_timeout(&self, id: i64) -> Result<()> {
        let mut alarm = self.store.alarm_by_id(id).await?;
        if alarm.state != AlarmState::Ringing {
            debug!(id, state = ?alarm.state, "timeout for non-ringing alarm; ignored");
            return Ok(());
        }

        alarm.state = AlarmState::Missed;
        self.store.update_alarm(alarm.clone()).await?;
        info!(id, "unanswered alarm demoted to missed");

        if let Some(stopped) = self.hardware.release_if(id)? {
            if let Err(err) = self.notifier.cancel(stopped).await {
                warn!(id, error = %err, "failed to remove ringing notification");
            }
        }
        self.notifier.post_missed(RingingSnapshot::for_alarm(&alarm, Utc::now())).await?;
        Ok(())
    }

    /// The user dismissed or disabled the ringing alarm.
    #[instrument(skip(self))]
    pub async fn on_stop(&self, id: i64, outcome: StopOutcome) -> Result<()> {
        let mut alarm = self.store.alarm_by_id(id).await?;
        alarm.state = AlarmState::Upcoming;
        alarm.reset_snooze();
        match outcome {
            StopOutcome::Disable => alarm.enabled = false,
            StopOutcome::Dismiss => {
                if alarm.is_one_shot() {
                    // A one-shot alarm is spent after a dismissal.
                    alarm.enabled = false;
                }
            }
        }

        self.scheduler.cancel_all(id).await?;
        if alarm.enabled {
            let next = next_alarm_trigger(alarm.time_of_day(), &alarm.repeat_days, &Local::now());
            match self.scheduler.schedule_trigger(id, next.with_timezone(&Utc)).await {
                Err(err) if err.is_permission_denied() => {
                    warn!(id, "next trigger not scheduled; retried when permission returns");
                }
                other => other?,
            }
        }
        self.store.update_alarm(alarm).await?;

        if let Some(stopped) = self.hardware.release_if(id)? {
            if let Err(err) = self.notifier.cancel(stopped).await {
                warn!(id, error = %err, "failed to remove ringing notification");
            }
        }
        Ok(())
    }

    /// The host UI is transiently obscuring the ringing screen; silence
    /// the hardware without touching alarm state.
    pub fn on_pause(&self) -> Result<()> {
        self.hardware.pause()
    }

    /// Undo [`Self::on_pause`].
    pub fn on_resume(&self) -> Result<()> {
        self.hardware.resume()
    }

    async fn observe_loop(context: LoopContext, cancel: CancellationToken) {
        let mut receiver = context.store.observe_alarms();

        // Reconcile whatever was persisted before this process started:
        // re-entry after a restart must be idempotent.
        let initial = receiver.borrow_and_update().clone();
        if let Err(err) = Self::process_emission(&context, &initial).await {
            error!(error = %err, "failed to process initial alarm state");
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("alarm observation cancelled");
                    break;
                }
                changed = receiver.changed() => {
                    if changed.is_err() {
                        warn!("alarm stream closed; coordinator loop exiting");
                        break;
                    }
                    let alarms = receiver.borrow_and_update().clone();
                    if let Err(err) = Self::process_emission(&context, &alarms).await {
                        error!(error = %err, "failed to process alarm emission");
                    }
                }
            }
        }

        // Hardware is a scoped resource: released on every exit path,
        // cancellation included.
        Self::teardown(&context).await;
    }

    async fn process_emission(context: &LoopContext, alarms: &[ScheduledAlarm]) -> Result<()> {
        let ringing = ringing_by_id(alarms);
        let Some((primary, losers)) = ringing.split_last() else {
            Self::teardown(context).await;
            return Ok(());
        };

        let mut demotion_failure = None;
        for loser in losers {
            if let Err(err) = Self::demote_missed(context, loser).await {
                warn!(
                    id = loser.id,
                    error = %err,
                    "failed to demote superseded alarm; retried on next emission"
                );
                demotion_failure.get_or_insert(err);
            }
        }

        context.hardware.start(primary)?;
        context
            .notifier
            .post_ringing(RingingSnapshot::for_alarm(primary, Utc::now()))
            .await?;

        demotion_failure.map_or(Ok(()), Err)
    }

    async fn demote_missed(context: &LoopContext, alarm: &ScheduledAlarm) -> Result<()> {
        let mut missed = alarm.clone();
        missed.state = AlarmState::Missed;
        context.store.update_alarm(missed.clone()).await?;
        info!(id = missed.id, "superseded ringing alarm demoted to missed");
        context.notifier.post_missed(RingingSnapshot::for_alarm(&missed, Utc::now())).await?;
        Ok(())
    }

    async fn teardown(context: &LoopContext) {
        match context.hardware.release() {
            Ok(Some(id)) => {
                if let Err(err) = context.notifier.cancel(id).await {
                    warn!(id, error = %err, "failed to remove ringing notification");
                }
            }
            Ok(None) => {}
            Err(err) => error!(error = %err, "hardware release failed"),
        }
    }
}

/// Ringing alarms sorted ascending by id; the last entry is the primary.
/// Recency wins: the highest id is the most recently created alarm, and a
/// second alarm firing supersedes one already ringing.
fn ringing_by_id(alarms: &[ScheduledAlarm]) -> Vec<ScheduledAlarm> {
    let mut ringing: Vec<ScheduledAlarm> = alarms
        .iter()
        .filter(|alarm| alarm.state == AlarmState::Ringing)
        .cloned()
        .collect();
    ringing.sort_by_key(|alarm| alarm.id);
    ringing
}

impl Drop for RingingCoordinator {
    fn drop(&mut self) {
        let token = self.cancellation_token.lock();
        if !token.is_cancelled() {
            token.cancel();
        }
    }
}
