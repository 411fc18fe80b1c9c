//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

/// Sentinel id for events that have not been persisted yet. The store
/// assigns the real id on first save.
pub const UNSAVED_ID: i64 = 0;

// Snooze defaults
pub const DEFAULT_SNOOZE_LIMIT: u8 = 3;
pub const DEFAULT_SNOOZE_INTERVAL_MIN: u32 = 10;

// Ringing configuration
pub const DEFAULT_RING_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_VOLUME_PERCENT: u8 = 80;

// Countdown ticker configuration
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;

/// Grace window granted when a completed timer is restarted instead of
/// dismissed.
pub const TIMER_SNOOZE_GRACE_MS: i64 = 60_000;

// Database configuration
pub const DEFAULT_DB_POOL_SIZE: u32 = 4;
