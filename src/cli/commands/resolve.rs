use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::args::ResolveArgs;
use crate::cli::commands::{effective_config, Command};
use crate::symlink::SymlinkResolver;

pub struct ResolveCommand {
    args: ResolveArgs,
    config_file: Option<PathBuf>,
}

impl ResolveCommand {
    pub fn new(args: ResolveArgs, config_file: Option<PathBuf>) -> Self {
        Self { args, config_file }
    }
}

#[derive(Debug, Serialize)]
pub struct Resolution {
    pub path: PathBuf,
    pub target: PathBuf,
    pub is_symlink: bool,
    pub modified: Option<String>,
}

impl Resolution {
    pub fn of(resolver: &SymlinkResolver, path: &Path) -> Result<Self> {
        let target = resolver
            .resolve_final_target(path)
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        let modified = resolver
            .final_modification_time(path)
            .with_context(|| format!("Failed to read modification time of {}", path.display()))?
            .map(|mtime| DateTime::<Utc>::from(mtime).to_rfc3339_opts(SecondsFormat::Millis, true));

        Ok(Self {
            path: path.to_path_buf(),
            is_symlink: resolver.is_symlink(path),
            target,
            modified,
        })
    }
}

#[async_trait]
impl Command for ResolveCommand {
    async fn execute(&self) -> Result<()> {
        let config = effective_config(self.config_file.as_deref()).await?;
        let resolver = SymlinkResolver::for_host()
            .with_max_depth(self.args.max_depth.unwrap_or(config.max_symlink_depth));

        let resolution = Resolution::of(&resolver, &self.args.path)?;
        if self.args.json {
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        } else {
            println!(
                "{} -> {} (modified: {})",
                resolution.path.display(),
                resolution.target.display(),
                resolution.modified.as_deref().unwrap_or("missing")
            );
        }
        Ok(())
    }
}
