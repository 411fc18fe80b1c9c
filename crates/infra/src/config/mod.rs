//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Falls back to built-in defaults when neither source exists
//!
//! ## Environment Variables
//! - `CHIME_DB_PATH`: Database file path (required for env loading)
//! - `CHIME_DB_POOL_SIZE`: Connection pool size
//! - `CHIME_RING_TIMEOUT_SECS`: Ring timeout before an alarm is missed
//! - `CHIME_SNOOZE_INTERVAL_MIN`: Default snooze interval
//! - `CHIME_TICK_INTERVAL_MS`: Countdown tick cadence

use std::path::{Path, PathBuf};

use chime_domain::{ChimeError, Config, Result};
use tracing::{debug, info};

const FILE_CANDIDATES: &[&str] =
    &["config.toml", "config.json", "chime.toml", "chime.json"];

/// Load configuration with automatic fallback strategy.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(env_error) => {
            debug!(error = ?env_error, "Failed to load from environment, trying file");
            match load_from_file(None) {
                Ok(config) => Ok(config),
                Err(file_error) => {
                    debug!(error = ?file_error, "No config file found, using defaults");
                    Ok(Config::default())
                }
            }
        }
    }
}

/// Load configuration from environment variables.
///
/// `CHIME_DB_PATH` must be present; every other variable falls back to
/// its default.
///
/// # Errors
/// Returns `ChimeError::Unexpected` when `CHIME_DB_PATH` is missing or a
/// variable fails to parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();
    config.database.path = std::env::var("CHIME_DB_PATH")
        .map_err(|_| ChimeError::Unexpected("CHIME_DB_PATH not set".into()))?;

    if let Some(pool_size) = parse_env("CHIME_DB_POOL_SIZE")? {
        config.database.pool_size = pool_size;
    }
    if let Some(timeout) = parse_env("CHIME_RING_TIMEOUT_SECS")? {
        config.coordinator.ring_timeout_secs = timeout;
    }
    if let Some(interval) = parse_env("CHIME_SNOOZE_INTERVAL_MIN")? {
        config.coordinator.default_snooze_interval_min = interval;
    }
    if let Some(tick) = parse_env("CHIME_TICK_INTERVAL_MS")? {
        config.ticker.tick_interval_ms = tick;
    }
    Ok(config)
}

/// Load configuration from a JSON or TOML file.
///
/// When `path` is `None`, probes the candidate file names in the working
/// directory and its parent.
pub fn load_from_file(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => probe_config_file()
            .ok_or_else(|| ChimeError::Unexpected("no config file found".into()))?,
    };

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| ChimeError::Unexpected(format!("failed to read {}: {e}", path.display())))?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&contents)
            .map_err(|e| ChimeError::Unexpected(format!("invalid JSON config: {e}")))?,
        Some("toml") => toml::from_str(&contents)
            .map_err(|e| ChimeError::Unexpected(format!("invalid TOML config: {e}")))?,
        other => {
            return Err(ChimeError::Unexpected(format!(
                "unsupported config extension {other:?}"
            )))
        }
    };

    info!(path = %path.display(), "Configuration loaded from file");
    Ok(config)
}

fn probe_config_file() -> Option<PathBuf> {
    let bases = [PathBuf::from("."), PathBuf::from("..")];
    for base in &bases {
        for candidate in FILE_CANDIDATES {
            let path = base.join(candidate);
            if path.is_file() {
                return Some(path);
            }
        }
    }
    None
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ChimeError::Unexpected(format!("invalid value for {name}: {raw}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn temp_config(extension: &str, contents: &str) -> std::path::PathBuf {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().with_extension(extension);
        let mut renamed = std::fs::File::create(&path).unwrap();
        renamed.write_all(contents.as_bytes()).unwrap();
        // Keep the original handle alive long enough; the renamed copy is
        // what the test reads.
        drop(file);
        path
    }

    #[test]
    fn loads_toml_file() {
        let path = temp_config(
            "toml",
            "[database]\npath = \"/tmp/chime.db\"\npool_size = 8\n\n[ticker]\ntick_interval_ms = 250\n",
        );
        let config = load_from_file(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.database.path, "/tmp/chime.db");
        assert_eq!(config.database.pool_size, 8);
        assert_eq!(config.ticker.tick_interval_ms, 250);
    }

    #[test]
    fn loads_json_file() {
        let path = temp_config(
            "json",
            "{\"database\": {\"path\": \"/tmp/chime.db\"}, \"coordinator\": {\"ring_timeout_secs\": 120}}",
        );
        let config = load_from_file(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.database.path, "/tmp/chime.db");
        assert_eq!(config.coordinator.ring_timeout_secs, 120);
    }

    #[test]
    fn rejects_unknown_extension() {
        let path = temp_config("yaml", "database:\n  path: /tmp/x\n");
        let err = load_from_file(Some(&path)).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ChimeError::Unexpected(_)));
    }
}
