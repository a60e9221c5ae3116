//! Configuration loaders: TOML file and environment overrides

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use super::WatchConfig;
use crate::core::constants::ENV_PREFIX;
use crate::core::errors::ConfigError;

/// Source of a [`WatchConfig`]
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    async fn load(&self) -> Result<WatchConfig, ConfigError>;

    async fn save(&self, config: &WatchConfig) -> Result<(), ConfigError>;

    async fn exists(&self) -> bool;

    fn loader_type(&self) -> &'static str;
}

/// TOML configuration file
#[derive(Debug, Clone)]
pub struct FileLoader {
    file_path: PathBuf,
}

impl FileLoader {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

#[async_trait]
impl ConfigLoader for FileLoader {
    async fn load(&self) -> Result<WatchConfig, ConfigError> {
        debug!("Loading config from file: {}", self.file_path.display());

        let content = match fs::read_to_string(&self.file_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::FileNotFound {
                    path: self.file_path.clone(),
                })
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.file_path.clone(),
                    source,
                })
            }
        };

        let config: WatchConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: self.file_path.clone(),
            reason: e.to_string(),
        })?;

        info!("Loaded config from file: {}", self.file_path.display());
        Ok(config)
    }

    async fn save(&self, config: &WatchConfig) -> Result<(), ConfigError> {
        let content = config.to_toml()?;

        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        fs::write(&self.file_path, content)
            .await
            .map_err(|source| ConfigError::Io {
                path: self.file_path.clone(),
                source,
            })?;

        info!("Saved config to file: {}", self.file_path.display());
        Ok(())
    }

    async fn exists(&self) -> bool {
        fs::metadata(&self.file_path).await.is_ok()
    }

    fn loader_type(&self) -> &'static str {
        "file"
    }
}

/// `LINKWATCH_*` environment variables layered over a base config
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var<T: FromStr>(&self, name: &str) -> Option<T> {
        let key = format!("{}{}", self.prefix, name);
        let raw = env::var(&key).ok()?;
        match raw.trim().parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring unparsable {}={:?}", key, raw);
                None
            }
        }
    }

    pub fn apply_env_overrides(&self, mut config: WatchConfig) -> WatchConfig {
        if let Some(interval) = self.var::<u64>("POLLING_INTERVAL_MS") {
            config.polling_interval_ms = interval;
            debug!("Applied env override: polling_interval_ms = {}", interval);
        }

        if let Some(depth) = self.var::<usize>("MAX_SYMLINK_DEPTH") {
            config.max_symlink_depth = depth;
            debug!("Applied env override: max_symlink_depth = {}", depth);
        }

        if let Some(case_insensitive) = self.var::<bool>("CASE_INSENSITIVE_KEYS") {
            config.case_insensitive_keys = Some(case_insensitive);
            debug!(
                "Applied env override: case_insensitive_keys = {}",
                case_insensitive
            );
        }

        if let Some(exclude) = self.var::<bool>("EXCLUDE_HIDDEN") {
            config.exclusions.hidden = exclude;
            config.exclusions.dot_prefixed = exclude;
            debug!("Applied env override: exclusions.hidden = {}", exclude);
        }

        config
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(ENV_PREFIX)
    }
}

#[async_trait]
impl ConfigLoader for EnvLoader {
    async fn load(&self) -> Result<WatchConfig, ConfigError> {
        debug!("Loading config from environment with prefix {}", self.prefix);
        Ok(self.apply_env_overrides(WatchConfig::default()))
    }

    async fn save(&self, _config: &WatchConfig) -> Result<(), ConfigError> {
        warn!("Cannot save configuration to environment variables");
        Err(ConfigError::InvalidValue {
            field: "loader".to_string(),
            value: "environment".to_string(),
            reason: "environment variables are read-only".to_string(),
        })
    }

    async fn exists(&self) -> bool {
        env::vars().any(|(key, _)| key.starts_with(&self.prefix))
    }

    fn loader_type(&self) -> &'static str {
        "environment"
    }
}
