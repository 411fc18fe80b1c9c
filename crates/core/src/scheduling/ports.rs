//! Port interfaces for deferred wake-up scheduling

use async_trait::async_trait;
use chime_domain::{Result, WakeAction};
use chrono::{DateTime, Utc};

/// OS-level "run this at time T" primitive.
///
/// Registrations are keyed by `(id, action)`: scheduling the same key again
/// overwrites the prior registration, and cancelling an unknown key
/// succeeds.
#[async_trait]
pub trait WakeupFacility: Send + Sync {
    async fn schedule(
        &self,
        id: i64,
        action: WakeAction,
        at: DateTime<Utc>,
        payload: Option<serde_json::Value>,
    ) -> Result<()>;

    async fn cancel(&self, id: i64, action: WakeAction) -> Result<()>;
}

/// Read-only view of the host permission state.
///
/// Requesting permissions is someone else's job; the runtime only consults
/// the current answers and fails soft when denied.
pub trait PermissionGate: Send + Sync {
    fn notifications_granted(&self) -> bool;

    fn exact_scheduling_granted(&self) -> bool;
}
