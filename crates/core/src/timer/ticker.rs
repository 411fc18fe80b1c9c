//! Countdown ticker.
//!
//! A single cooperative task advances running timers at a ~1 s cadence and
//! reconciles the live projection against the store on every emission.
//! Remaining time is always recomputed from wall clock and the persisted
//! start anchor, so delayed or coalesced ticks cannot accumulate drift,
//! and restoration after process death or reboot falls out of the same
//! formula.
//!
//! The tick is armed only while at least one timer is running; the task
//! parks on the store subscription otherwise.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chime_domain::{
    constants::TIMER_SNOOZE_GRACE_MS, ChimeError, Result, RingingSnapshot, TickerConfig,
    TimerStatus,
};
use chrono::Utc;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::partition::TimerPartitions;
use super::ports::TimerStore;
use crate::alarm::ports::NotificationPresenter;

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const JOIN_TIMEOUT: StdDuration = StdDuration::from_secs(5);

struct LoopContext {
    store: Arc<dyn TimerStore>,
    notifier: Arc<dyn NotificationPresenter>,
    partitions_tx: watch::Sender<TimerPartitions>,
}

/// Cooperative ticker over the persisted timer collection.
pub struct CountdownTicker {
    store: Arc<dyn TimerStore>,
    notifier: Arc<dyn NotificationPresenter>,
    config: TickerConfig,
    partitions_tx: watch::Sender<TimerPartitions>,
    cancellation_token: SyncMutex<CancellationToken>,
    task_handle: TaskHandle,
}

impl CountdownTicker {
    pub fn new(
        store: Arc<dyn TimerStore>,
        notifier: Arc<dyn NotificationPresenter>,
        config: TickerConfig,
    ) -> Self {
        let (partitions_tx, _) = watch::channel(TimerPartitions::default());
        Self {
            store,
            notifier,
            config,
            partitions_tx,
            cancellation_token: SyncMutex::new(CancellationToken::new()),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribe to the live partitioning. The receiver always holds the
    /// latest projection.
    pub fn partitions(&self) -> watch::Receiver<TimerPartitions> {
        self.partitions_tx.subscribe()
    }

    /// Start the tick loop.
    ///
    /// # Errors
    /// Returns `ConstraintViolation` when the ticker is already running.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let mut handle = self.task_handle.lock().await;
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(ChimeError::ConstraintViolation("ticker already running".into()));
        }

        info!("Starting countdown ticker");

        let context = LoopContext {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            partitions_tx: self.partitions_tx.clone(),
        };
        let config = self.config.clone();
        let cancel = CancellationToken::new();
        *self.cancellation_token.lock() = cancel.clone();

        *handle = Some(tokio::spawn(async move {
            Self::tick_loop(context, config, cancel).await;
        }));

        Ok(())
    }

    /// Stop the tick loop. Idempotent: a second stop is a no-op.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let handle = self.task_handle.lock().await.take();
        let Some(handle) = handle else {
            debug!("ticker already stopped");
            return Ok(());
        };

        info!("Stopping countdown ticker");
        self.cancellation_token.lock().cancel();

        tokio::time::timeout(JOIN_TIMEOUT, handle)
            .await
            .map_err(|_| ChimeError::Unexpected("ticker loop did not stop in time".into()))?
            .map_err(|join_error| ChimeError::Unexpected(join_error.to_string()))?;

        info!("Countdown ticker stopped");
        Ok(())
    }

    /// Whether the tick loop is active.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Start a timer counting down from its full duration.
    #[instrument(skip(self))]
    pub async fn start_timer(&self, id: i64) -> Result<()> {
        let mut timer = self.store.timer_by_id(id).await?;
        if timer.status == TimerStatus::Running {
            return Ok(());
        }
        timer.start(Utc::now());
        self.store.save_timer(timer).await?;
        Ok(())
    }

    /// Freeze a running timer's elapsed accounting.
    #[instrument(skip(self))]
    pub async fn pause_timer(&self, id: i64) -> Result<()> {
        let mut timer = self.store.timer_by_id(id).await?;
        if timer.status != TimerStatus::Running {
            return Ok(());
        }
        timer.pause(Utc::now());
        self.store.save_timer(timer).await?;
        Ok(())
    }

    /// Resume a paused timer with a fresh start anchor.
    #[instrument(skip(self))]
    pub async fn resume_timer(&self, id: i64) -> Result<()> {
        let mut timer = self.store.timer_by_id(id).await?;
        if timer.status != TimerStatus::Paused {
            return Ok(());
        }
        timer.resume(Utc::now());
        self.store.save_timer(timer).await?;
        Ok(())
    }

    /// Stop a timer for good, keeping the record.
    #[instrument(skip(self))]
    pub async fn stop_timer(&self, id: i64) -> Result<()> {
        let mut timer = self.store.timer_by_id(id).await?;
        timer.stop(Utc::now());
        self.store.save_timer(timer).await?;
        self.notifier.cancel(id).await?;
        Ok(())
    }

    /// Dismiss a timer entirely, deleting its record.
    #[instrument(skip(self))]
    pub async fn dismiss_timer(&self, id: i64) -> Result<()> {
        self.store.delete_timer(id).await?;
        self.notifier.cancel(id).await?;
        Ok(())
    }

    /// Give a completed timer a short grace window instead of dismissing
    /// it. A no-op for timers that have not completed.
    #[instrument(skip(self))]
    pub async fn snooze_completed_timer(&self, id: i64) -> Result<()> {
        let now = Utc::now();
        let mut timer = self.store.timer_by_id(id).await?;
        if !timer.is_completed_at(now) {
            debug!(id, "snooze requested for a timer that is still counting; ignored");
            return Ok(());
        }
        timer.snooze_completed(now, TIMER_SNOOZE_GRACE_MS);
        self.store.save_timer(timer).await?;
        self.notifier.cancel(id).await?;
        Ok(())
    }

    async fn tick_loop(context: LoopContext, config: TickerConfig, cancel: CancellationToken) {
        let mut receiver = context.store.observe_timers();
        let tick = StdDuration::from_millis(config.tick_interval_ms.max(1));

        // Restoration: the collection persisted before this process
        // started is the authoritative baseline; projecting it below
        // corrects for any time nothing was ticking.
        let mut timers = receiver.borrow_and_update().clone();
        let mut ringing: HashSet<i64> = HashSet::new();

        loop {
            let partitions = TimerPartitions::project(&timers, Utc::now());
            Self::sync_completion_notifications(&context, &partitions, &mut ringing).await;
            let tick_armed = partitions.has_running();
            context.partitions_tx.send_replace(partitions);

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("timer observation cancelled");
                    break;
                }
                changed = receiver.changed() => {
                    if changed.is_err() {
                        warn!("timer stream closed; ticker loop exiting");
                        break;
                    }
                    timers = receiver.borrow_and_update().clone();
                }
                // Only armed while something is actually counting down.
                _ = tokio::time::sleep(tick), if tick_armed => {}
            }
        }

        // Completion notifications do not outlive the ticker.
        for id in ringing {
            if let Err(err) = context.notifier.cancel(id).await {
                warn!(id, error = %err, "failed to remove timer notification");
            }
        }
    }

    /// Post a ringing notification once per completion, and drop it again
    /// when the timer leaves the completed partition (dismissed, snoozed,
    /// or deleted concurrently - a missing record is not an error).
    async fn sync_completion_notifications(
        context: &LoopContext,
        partitions: &TimerPartitions,
        ringing: &mut HashSet<i64>,
    ) {
        let now = partitions.generated_at.unwrap_or_else(Utc::now);
        let completed_ids: HashSet<i64> = partitions.completed.iter().map(|t| t.id).collect();

        for timer in &partitions.completed {
            if ringing.insert(timer.id) {
                info!(id = timer.id, label = %timer.label, "countdown completed");
                if let Err(err) =
                    context.notifier.post_ringing(RingingSnapshot::for_timer(timer, now)).await
                {
                    warn!(id = timer.id, error = %err, "failed to post completion notification");
                    ringing.remove(&timer.id);
                }
            }
        }

        let stale: Vec<i64> = ringing.difference(&completed_ids).copied().collect();
        for id in stale {
            ringing.remove(&id);
            if let Err(err) = context.notifier.cancel(id).await {
                warn!(id, error = %err, "failed to remove timer notification");
            }
        }
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        let token = self.cancellation_token.lock();
        if !token.is_cancelled() {
            token.cancel();
        }
    }
}
