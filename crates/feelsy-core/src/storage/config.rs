//! TOML-based application configuration.
//!
//! Holds:
//! - HTTP bind address and port
//! - Database location override
//! - Reference timezone for "today"
//! - Streak worker tuning (poll interval, batch size, retry budget)
//!
//! Configuration is stored at `~/.config/feelsy/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::clock::DayBoundary;
use crate::error::ConfigError;

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file. Defaults to `feelsy.db` in the data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

/// Reference timezone for calendar-date normalization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Fixed offset from UTC in minutes, e.g. 540 for UTC+9.
    #[serde(default)]
    pub timezone_offset_minutes: i32,
}

/// Background streak worker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakWorkerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Attempts before a job is marked dead.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Applied jobs older than this are purged.
    #[serde(default = "default_retain_done_hours")]
    pub retain_done_hours: u64,
    /// Delay before the first retry of a failed job, doubled per attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/feelsy/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub streak_worker: StreakWorkerConfig,
}

// Default functions
fn default_bind_address() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3000
}
fn default_poll_interval_ms() -> u64 {
    5_000
}
fn default_batch_size() -> usize {
    100
}
fn default_max_attempts() -> u32 {
    5
}
fn default_retain_done_hours() -> u64 {
    24 * 7
}
fn default_retry_backoff_ms() -> u64 {
    1_000
}

const MAX_POLL_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;
const MAX_RETAIN_DONE_HOURS: u64 = 24 * 365 * 100;
const MAX_RETRY_BACKOFF_MS: u64 = 60 * 60 * 1000;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for StreakWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            retain_done_hours: default_retain_done_hours(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<i64>() {
                        serde_json::Value::Number(n.into())
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as integer")));
                    }
                }
                // Optional paths are null until set.
                serde_json::Value::Null if value.is_empty() => serde_json::Value::Null,
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// into the field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.day_boundary()?;
        if self.streak_worker.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "streak_worker.max_attempts".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.streak_worker.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "streak_worker.batch_size".into(),
                message: "must be at least 1".into(),
            });
        }
        check_range(
            "streak_worker.poll_interval_ms",
            self.streak_worker.poll_interval_ms,
            1,
            MAX_POLL_INTERVAL_MS,
        )?;
        check_range(
            "streak_worker.retain_done_hours",
            self.streak_worker.retain_done_hours,
            0,
            MAX_RETAIN_DONE_HOURS,
        )?;
        check_range(
            "streak_worker.retry_backoff_ms",
            self.streak_worker.retry_backoff_ms,
            0,
            MAX_RETRY_BACKOFF_MS,
        )?;
        Ok(())
    }

    /// Reference timezone as a day boundary.
    pub fn day_boundary(&self) -> Result<DayBoundary, ConfigError> {
        DayBoundary::from_offset_minutes(self.clock.timezone_offset_minutes).map_err(|e| {
            ConfigError::InvalidValue {
                key: "clock.timezone_offset_minutes".into(),
                message: e.to_string(),
            }
        })
    }

    /// Resolved database file path.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("feelsy.db")),
        }
    }
}

fn check_range(key: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.into(),
            message: format!("must be between {min} and {max} (got {value})"),
        })
    }
}
