//! Port interface for the countdown timer store

use async_trait::async_trait;
use chime_domain::{Countdown, Result};
use tokio::sync::watch;

/// Persistent store surface for countdown timers.
#[async_trait]
pub trait TimerStore: Send + Sync {
    /// Subscribe to the timer collection. Level-triggered: the receiver
    /// always holds the latest full collection.
    fn observe_timers(&self) -> watch::Receiver<Vec<Countdown>>;

    /// Point-in-time read of the full collection.
    async fn timer_snapshot(&self) -> Result<Vec<Countdown>>;

    /// Point read by id.
    async fn timer_by_id(&self, id: i64) -> Result<Countdown>;

    /// Upsert: a record with the unsaved-id sentinel is inserted and
    /// assigned an id; any other id updates in place.
    async fn save_timer(&self, timer: Countdown) -> Result<i64>;

    /// Delete by id.
    async fn delete_timer(&self, id: i64) -> Result<()>;
}
