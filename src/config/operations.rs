//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{FileError, Result};
use crate::locks::WaitPolicy;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(FileError::Config)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            FileError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| FileError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| FileError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `wait_timeout_secs` must be finite, not negative, and fit a `Duration`
    /// - `retry_interval_ms` must be positive
    /// - `lock_stale_minutes` must be positive
    pub fn validate(&self) -> Result<()> {
        if let Err(e) = Duration::try_from_secs_f64(self.wait_timeout_secs) {
            return Err(FileError::Config(format!(
                "config validation failed: wait_timeout_secs must be a non-negative number of seconds (found {}: {})",
                self.wait_timeout_secs, e
            )));
        }

        if self.retry_interval_ms == 0 {
            return Err(FileError::Config(
                "config validation failed: retry_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.lock_stale_minutes == 0 {
            return Err(FileError::Config(
                "config validation failed: lock_stale_minutes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// The lock wait timeout as a `Duration`.
    ///
    /// Values `validate` rejects saturate: too large waits forever, negative
    /// or NaN does not wait.
    pub fn wait_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.wait_timeout_secs).unwrap_or(
            if self.wait_timeout_secs > 0.0 {
                Duration::MAX
            } else {
                Duration::ZERO
            },
        )
    }

    /// The poll interval as a `Duration`.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Build the polling policy used by every lock wait.
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            timeout: self.wait_timeout(),
            retry_interval: self.retry_interval(),
            jitter: Duration::from_millis(self.retry_jitter_ms),
        }
    }
}
