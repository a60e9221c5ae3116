//! Watch configuration
//!
//! Settings come from an optional TOML file, then `LINKWATCH_*` environment
//! overrides, and are validated before they reach the registry.

pub mod loader;

pub use loader::{ConfigLoader, EnvLoader, FileLoader};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::clock::SystemClock;
use crate::core::constants::{DEFAULT_POLLING_INTERVAL, MAX_SYMLINK_DEPTH};
use crate::core::errors::ConfigError;
use crate::watcher::{host_is_case_insensitive, ExclusionFilters, WatchOptions};

/// Upper bound accepted for `max_symlink_depth`
pub const MAX_CONFIGURABLE_DEPTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub polling_interval_ms: u64,
    pub max_symlink_depth: usize,
    /// Unset means "whatever the host filesystem does"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_insensitive_keys: Option<bool>,
    pub exclusions: ExclusionFilters,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            polling_interval_ms: DEFAULT_POLLING_INTERVAL.as_millis() as u64,
            max_symlink_depth: MAX_SYMLINK_DEPTH,
            case_insensitive_keys: None,
            exclusions: ExclusionFilters::default(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "polling_interval_ms".to_string(),
                value: self.polling_interval_ms.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(1..=MAX_CONFIGURABLE_DEPTH).contains(&self.max_symlink_depth) {
            return Err(ConfigError::InvalidValue {
                field: "max_symlink_depth".to_string(),
                value: self.max_symlink_depth.to_string(),
                reason: format!("must be between 1 and {}", MAX_CONFIGURABLE_DEPTH),
            });
        }
        Ok(())
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            value: format!("{:?}", self),
            reason: e.to_string(),
        })
    }

    /// Runtime options for a registry, using the system clock
    pub fn to_options(&self) -> WatchOptions {
        WatchOptions {
            polling_interval: self.polling_interval(),
            max_symlink_depth: self.max_symlink_depth,
            case_insensitive_keys: self
                .case_insensitive_keys
                .unwrap_or_else(host_is_case_insensitive),
            exclusions: self.exclusions,
            clock: Arc::new(SystemClock),
        }
    }
}

impl TryFrom<WatchConfig> for WatchOptions {
    type Error = ConfigError;

    fn try_from(config: WatchConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        Ok(config.to_options())
    }
}

/// File layer (missing file means defaults), then environment, then validation
pub async fn load_config(path: &Path) -> Result<WatchConfig, ConfigError> {
    let base = match FileLoader::new(path).load().await {
        Ok(config) => config,
        Err(ConfigError::FileNotFound { path }) => {
            debug!("No config file at {}, using defaults", path.display());
            WatchConfig::default()
        }
        Err(e) => return Err(e),
    };

    let config = EnvLoader::default().apply_env_overrides(base);
    config.validate()?;
    Ok(config)
}
