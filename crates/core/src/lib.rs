//! # Chime Core
//!
//! Pure scheduling and coordination logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Trigger math (pure next-fire-instant computation)
//! - Port/adapter interfaces (traits)
//! - The alarm ringing coordinator and the countdown ticker
//! - The scheduler facade over the deferred wake-up facility
//!
//! ## Architecture Principles
//! - Only depends on `chime-domain`
//! - No database, OS, or platform code
//! - All external collaborators behind traits
//! - The persistent store is the single source of truth; everything held
//!   here is a recomputable projection

pub mod alarm;
pub mod scheduling;
pub mod timer;
pub mod trigger;

// Re-export specific items to avoid ambiguity
pub use alarm::coordinator::{RingingCoordinator, StopOutcome};
pub use alarm::hardware::RingingHardware;
pub use alarm::ports::{AlarmStore, HardwareController, NotificationPresenter};
pub use scheduling::facade::TriggerScheduler;
pub use scheduling::ports::{PermissionGate, WakeupFacility};
pub use timer::partition::TimerPartitions;
pub use timer::ports::TimerStore;
pub use timer::ticker::CountdownTicker;
pub use trigger::{format_remaining, next_alarm_trigger, next_snooze_trigger, Remaining};
