//! Tokio-based implementation of the deferred wake-up facility.
//!
//! Each registration is one sleeping task keyed by `(id, action)`.
//! Re-scheduling a key aborts and replaces the prior task; cancelling an
//! unknown key succeeds. Fired wake-ups are delivered as [`WakeupEvent`]s
//! on an unbounded channel the host drains into the coordinator handlers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chime_domain::{Result, WakeAction, WakeupEvent};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type RegistrationKey = (i64, WakeAction);

struct Registration {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    tasks: Mutex<HashMap<RegistrationKey, Registration>>,
    next_generation: AtomicU64,
    events_tx: mpsc::UnboundedSender<WakeupEvent>,
}

/// In-process deferred wake-up facility.
pub struct TokioWakeupFacility {
    inner: Arc<Inner>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<WakeupEvent>>>,
}

impl TokioWakeupFacility {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                tasks: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                events_tx,
            }),
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Take the fired-event receiver. Yields `None` after the first call;
    /// there is exactly one consumer.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<WakeupEvent>> {
        self.events_rx.lock().take()
    }

    /// Number of live registrations, for diagnostics.
    pub fn pending(&self) -> usize {
        self.inner.tasks.lock().len()
    }
}

impl Default for TokioWakeupFacility {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl chime_core::WakeupFacility for TokioWakeupFacility {
    async fn schedule(
        &self,
        id: i64,
        action: WakeAction,
        at: DateTime<Utc>,
        payload: Option<serde_json::Value>,
    ) -> Result<()> {
        let key: RegistrationKey = (id, action);
        let delay = (at - Utc::now()).to_std().unwrap_or_default();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        debug!(id, action = action.as_str(), delay_ms = delay.as_millis() as u64, "wake-up registered");

        let inner = Arc::clone(&self.inner);
        // Register under the lock before the task can observe the map, so
        // an already-due wake-up cannot race its own registration.
        let mut tasks = self.inner.tasks.lock();
        if let Some(previous) = tasks.remove(&key) {
            previous.handle.abort();
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                // Fire only if this registration is still the live one for
                // the key; a replaced registration must never deliver.
                let mut tasks = inner.tasks.lock();
                match tasks.get(&key) {
                    Some(registration) if registration.generation == generation => {
                        tasks.remove(&key);
                    }
                    _ => return,
                }
            }
            if inner.events_tx.send(WakeupEvent { id, action, payload }).is_err() {
                warn!(id, action = action.as_str(), "wake-up fired with no consumer");
            }
        });
        tasks.insert(key, Registration { generation, handle });
        Ok(())
    }

    async fn cancel(&self, id: i64, action: WakeAction) -> Result<()> {
        if let Some(registration) = self.inner.tasks.lock().remove(&(id, action)) {
            registration.handle.abort();
            debug!(id, action = action.as_str(), "wake-up cancelled");
        }
        Ok(())
    }
}

impl Drop for TokioWakeupFacility {
    fn drop(&mut self) {
        for (_, registration) in self.inner.tasks.lock().drain() {
            registration.handle.abort();
        }
    }
}
