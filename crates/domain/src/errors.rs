//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Chime
///
/// The variants form the full failure taxonomy of the runtime. Store
/// adapters map their native errors onto the `Store*` variants; the
/// wake-up facility maps permission failures onto `SchedulingDenied`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ChimeError {
    #[error("Event store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Event store busy: {0}")]
    StoreBusy(String),

    #[error("Event store corrupted: {0}")]
    StoreCorrupted(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Scheduling denied: {0}")]
    SchedulingDenied(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ChimeError {
    /// True when the failure is a missing-permission condition.
    ///
    /// Callers treat this as terminal for the current action: skip, keep
    /// prior state, retry once permission is granted.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::SchedulingDenied(_))
    }
}

/// Result type alias for Chime operations
pub type Result<T> = std::result::Result<T, ChimeError>;
