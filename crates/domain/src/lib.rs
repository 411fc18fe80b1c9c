//! # Chime Domain
//!
//! Business domain types and models for the Chime reminder runtime.
//!
//! This crate contains:
//! - Domain data types (ScheduledAlarm, Countdown, snapshots)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Chime crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::{Config, CoordinatorConfig, DatabaseConfig, TickerConfig};
pub use errors::{ChimeError, Result};
pub use types::{
    AlarmState, Countdown, RingingSnapshot, ScheduledAlarm, SnoozeConfig, SoundRef, TimerStatus,
    WakeAction, WakeupEvent,
};
