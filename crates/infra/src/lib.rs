//! # Chime Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - The SQLite-backed persistent event store
//! - The tokio-based deferred wake-up facility
//! - Configuration loading (environment + file)
//! - Tracing subscriber setup
//! - Logging-only notification/hardware adapters for development
//!
//! ## Architecture
//! - Implements traits defined in `chime-core`
//! - Depends on `chime-domain` and `chime-core`
//! - Contains all "impure" code (I/O, clocks, OS surfaces)

pub mod config;
pub mod database;
pub mod errors;
pub mod observability;
pub mod scheduling;
pub mod services;

// Re-export commonly used items
pub use database::SqliteEventStore;
pub use scheduling::TokioWakeupFacility;
pub use services::{LogNotifier, NullHardware, StaticPermissions};
