use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::change_token::ChangeSubscription;
use crate::cli::args::WatchArgs;
use crate::cli::commands::{effective_config, Command};
use crate::config::WatchConfig;
use crate::provider::PollingFileProvider;

pub struct WatchCommand {
    args: WatchArgs,
    config_file: Option<PathBuf>,
}

impl WatchCommand {
    pub fn new(args: WatchArgs, config_file: Option<PathBuf>) -> Self {
        Self { args, config_file }
    }

    fn root(&self) -> Result<PathBuf> {
        let cwd = std::env::current_dir()?;
        Ok(match &self.args.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => cwd.join(root),
            None => cwd,
        })
    }

    fn apply_overrides(&self, mut config: WatchConfig) -> Result<WatchConfig> {
        if let Some(interval_ms) = self.args.interval_ms {
            config.polling_interval_ms = interval_ms;
        }
        config.validate()?;
        Ok(config)
    }

    /// One re-arming subscription per key, each reporting into `changes`
    fn subscribe(
        &self,
        provider: &Arc<PollingFileProvider>,
        changes: mpsc::UnboundedSender<String>,
    ) -> Vec<ChangeSubscription> {
        self.args
            .keys
            .iter()
            .filter_map(|key| {
                if provider.watch(key).is_null() {
                    warn!("Key {:?} cannot be watched and will never report changes", key);
                    return None;
                }
                let producer_provider = Arc::clone(provider);
                let producer_key = key.clone();
                let reported_key = key.clone();
                let changes = changes.clone();
                Some(crate::change_token::on_change(
                    move || producer_provider.watch(&producer_key),
                    move || {
                        let _ = changes.send(reported_key.clone());
                    },
                ))
            })
            .collect()
    }
}

#[async_trait]
impl Command for WatchCommand {
    async fn execute(&self) -> Result<()> {
        let config = self.apply_overrides(effective_config(self.config_file.as_deref()).await?)?;
        let root = self.root()?;
        let provider = Arc::new(
            PollingFileProvider::new(&root, config.to_options())
                .with_context(|| format!("Cannot watch under {}", root.display()))?,
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscriptions = self.subscribe(&provider, tx);
        if subscriptions.is_empty() {
            anyhow::bail!("None of the given keys can be watched");
        }
        info!(
            "Watching {} key(s) under {} every {:?}",
            subscriptions.len(),
            provider.root().display(),
            Duration::from_millis(config.polling_interval_ms)
        );

        loop {
            tokio::select! {
                changed = rx.recv() => {
                    let Some(key) = changed else { break };
                    info!("Change detected: {}", key);
                    println!("{} changed {}", Local::now().format("%Y-%m-%d %H:%M:%S"), key);
                    if self.args.once {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping watch");
                    break;
                }
            }
        }

        drop(subscriptions);
        provider.dispose();
        Ok(())
    }
}
