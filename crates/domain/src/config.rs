//! Runtime configuration structures
//!
//! Loaded by `chime-infra` from environment variables or a config file;
//! consumed by the coordinator, the ticker, and the store adapter.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DB_POOL_SIZE, DEFAULT_RING_TIMEOUT_SECS, DEFAULT_SNOOZE_INTERVAL_MIN,
    DEFAULT_TICK_INTERVAL_MS,
};

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub ticker: TickerConfig,
}

/// Event store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "chime.db".into(), pool_size: DEFAULT_DB_POOL_SIZE }
    }
}

/// Alarm ringing coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Seconds a ringing alarm may go unanswered before it is demoted to
    /// missed.
    #[serde(default = "default_ring_timeout")]
    pub ring_timeout_secs: u64,
    /// Whether alarm playback temporarily overrides the device volume.
    #[serde(default)]
    pub override_device_volume: bool,
    /// Snooze interval applied when an alarm carries no explicit snooze
    /// configuration.
    #[serde(default = "default_snooze_interval")]
    pub default_snooze_interval_min: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            ring_timeout_secs: DEFAULT_RING_TIMEOUT_SECS,
            override_device_volume: false,
            default_snooze_interval_min: DEFAULT_SNOOZE_INTERVAL_MIN,
        }
    }
}

/// Countdown ticker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerConfig {
    /// Cadence of the cooperative tick while at least one timer runs.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self { tick_interval_ms: DEFAULT_TICK_INTERVAL_MS }
    }
}

fn default_pool_size() -> u32 {
    DEFAULT_DB_POOL_SIZE
}

fn default_ring_timeout() -> u64 {
    DEFAULT_RING_TIMEOUT_SECS
}

fn default_snooze_interval() -> u32 {
    DEFAULT_SNOOZE_INTERVAL_MIN
}

fn default_tick_interval() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}
