use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

use crate::cli::args::ConfigAction;
use crate::cli::commands::{config_path, effective_config, Command};
use crate::config::{ConfigLoader, FileLoader, WatchConfig};

pub struct ConfigCommand {
    action: ConfigAction,
    config_file: Option<PathBuf>,
}

impl ConfigCommand {
    pub fn new(action: ConfigAction, config_file: Option<PathBuf>) -> Self {
        Self {
            action,
            config_file,
        }
    }
}

#[async_trait]
impl Command for ConfigCommand {
    async fn execute(&self) -> Result<()> {
        let path = config_path(self.config_file.as_deref())?;

        match &self.action {
            ConfigAction::Init => {
                let loader = FileLoader::new(&path);
                if loader.exists().await {
                    println!("Configuration already exists at {}", path.display());
                } else {
                    loader.save(&WatchConfig::default()).await?;
                    println!("Configuration initialized at {}", path.display());
                }
            }

            ConfigAction::Show => {
                let config = effective_config(Some(&path)).await?;
                print!("{}", config.to_toml()?);
            }
        }

        Ok(())
    }
}
