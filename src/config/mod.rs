//! Coordinator configuration
//!
//! Loaded from a JSON file; every field is optional and defaults to the
//! value below. Environment variables override file values:
//!
//! | Field | Default | Environment |
//! |---|---|---|
//! | `maximum_backoff_ms` | 10000 | `CANOPY_MAXIMUM_BACKOFF_MS` |
//! | `commit_fair_lock` | true | `CANOPY_COMMIT_FAIR_LOCK` |
//! | `checkpoints_lock_wait_secs` | 10 | `CANOPY_CHECKPOINTS_LOCK_WAIT_TIME` |
//! | `dispatch_changes` | true | |

mod errors;

pub use errors::{ConfigError, ConfigErrorCode, ConfigResult};

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::observability::{Event, Logger};

pub const ENV_COMMIT_FAIR_LOCK: &str = "CANOPY_COMMIT_FAIR_LOCK";
pub const ENV_CHECKPOINTS_LOCK_WAIT_TIME: &str = "CANOPY_CHECKPOINTS_LOCK_WAIT_TIME";
pub const ENV_MAXIMUM_BACKOFF_MS: &str = "CANOPY_MAXIMUM_BACKOFF_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Optimistic backoff ceiling before escalating to the persisted lock
    #[serde(default = "default_maximum_backoff_ms")]
    pub maximum_backoff_ms: u64,

    /// Admit writers in arrival order
    #[serde(default = "default_true")]
    pub commit_fair_lock: bool,

    /// How long checkpoint creation waits for the write permit
    #[serde(default = "default_checkpoints_lock_wait_secs")]
    pub checkpoints_lock_wait_secs: u64,

    /// Install a `ChangeDispatcher` when no notifier is supplied
    #[serde(default = "default_true")]
    pub dispatch_changes: bool,
}

fn default_maximum_backoff_ms() -> u64 {
    10_000
}

fn default_checkpoints_lock_wait_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            maximum_backoff_ms: default_maximum_backoff_ms(),
            commit_fair_lock: true,
            checkpoints_lock_wait_secs: default_checkpoints_lock_wait_secs(),
            dispatch_changes: true,
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::read_failed(format!("Failed to read {}", path.display()), e))?;
        let config = Self::from_json(&content)?;
        let shown = path.display().to_string();
        Logger::event(Event::ConfigLoaded, &[("path", shown.as_str())]);
        Ok(config)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: CoordinatorConfig = serde_json::from_str(content)
            .map_err(|e| ConfigError::invalid(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, then validate
    pub fn apply_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_COMMIT_FAIR_LOCK) {
            self.commit_fair_lock = parse_bool(ENV_COMMIT_FAIR_LOCK, &value)?;
        }
        if let Some(value) = lookup(ENV_CHECKPOINTS_LOCK_WAIT_TIME) {
            self.checkpoints_lock_wait_secs = parse_u64(ENV_CHECKPOINTS_LOCK_WAIT_TIME, &value)?;
        }
        if let Some(value) = lookup(ENV_MAXIMUM_BACKOFF_MS) {
            self.maximum_backoff_ms = parse_u64(ENV_MAXIMUM_BACKOFF_MS, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.maximum_backoff_ms == 0 {
            return Err(ConfigError::invalid("maximum_backoff_ms must be > 0"));
        }
        if self.checkpoints_lock_wait_secs == 0 {
            return Err(ConfigError::invalid("checkpoints_lock_wait_secs must be > 0"));
        }
        Ok(())
    }

    pub fn maximum_backoff(&self) -> Duration {
        Duration::from_millis(self.maximum_backoff_ms)
    }

    pub fn checkpoints_lock_wait(&self) -> Duration {
        Duration::from_secs(self.checkpoints_lock_wait_secs)
    }
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ConfigError::invalid(format!(
            "{} must be true or false, got '{}'",
            key, other
        ))),
    }
}

fn parse_u64(key: &str, value: &str) -> ConfigResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(format!("{} must be a positive integer, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::from_json("{}").unwrap();
        assert_eq!(config, CoordinatorConfig::default());
        assert_eq!(config.maximum_backoff(), Duration::from_secs(10));
        assert_eq!(config.checkpoints_lock_wait(), Duration::from_secs(10));
        assert!(config.commit_fair_lock);
        assert!(config.dispatch_changes);
    }

    #[test]
    fn test_partial_file() {
        let config =
            CoordinatorConfig::from_json(r#"{"maximum_backoff_ms": 50, "commit_fair_lock": false}"#)
                .unwrap();
        assert_eq!(config.maximum_backoff_ms, 50);
        assert!(!config.commit_fair_lock);
        assert_eq!(config.checkpoints_lock_wait_secs, 10);
    }

    #[test]
    fn test_rejects_zero_values() {
        let err = CoordinatorConfig::from_json(r#"{"maximum_backoff_ms": 0}"#).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::CanopyConfigInvalid);

        let err = CoordinatorConfig::from_json(r#"{"checkpoints_lock_wait_secs": 0}"#).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::CanopyConfigInvalid);
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = CoordinatorConfig::from_json("{not json").unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::CanopyConfigInvalid);
    }

    #[test]
    fn test_overrides() {
        let config = CoordinatorConfig::default()
            .apply_overrides(lookup(&[
                (ENV_COMMIT_FAIR_LOCK, "FALSE"),
                (ENV_CHECKPOINTS_LOCK_WAIT_TIME, "3"),
                (ENV_MAXIMUM_BACKOFF_MS, " 250 "),
            ]))
            .unwrap();
        assert!(!config.commit_fair_lock);
        assert_eq!(config.checkpoints_lock_wait_secs, 3);
        assert_eq!(config.maximum_backoff_ms, 250);
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let err = CoordinatorConfig::default()
            .apply_overrides(lookup(&[(ENV_MAXIMUM_BACKOFF_MS, "soon")]))
            .unwrap_err();
        assert!(err.message().contains(ENV_MAXIMUM_BACKOFF_MS));

        let err = CoordinatorConfig::default()
            .apply_overrides(lookup(&[(ENV_CHECKPOINTS_LOCK_WAIT_TIME, "0")]))
            .unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::CanopyConfigInvalid);
    }
}
