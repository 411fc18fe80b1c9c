//! Deferred wake-up facility backed by the tokio timer wheel.

mod wakeup;

pub use wakeup::TokioWakeupFacility;
