use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::{load_config, WatchConfig};
use crate::core::constants::DEFAULT_CONFIG_FILE;

pub mod config;
pub mod resolve;
pub mod watch;

/// Trait for CLI command implementations
#[async_trait]
pub trait Command {
    /// Execute the command with the given arguments
    async fn execute(&self) -> Result<()>;
}

/// Explicit `--config` path, or the default file in the working directory
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(std::env::current_dir()?.join(DEFAULT_CONFIG_FILE)),
    }
}

/// Effective configuration for a command
pub async fn effective_config(explicit: Option<&Path>) -> Result<WatchConfig> {
    let path = config_path(explicit)?;
    Ok(load_config(&path).await?)
}
