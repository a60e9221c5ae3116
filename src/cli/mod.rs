pub mod args;
pub mod commands;

pub use args::{Cli, Commands, ConfigAction, ResolveArgs, WatchArgs};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::config::ConfigCommand;
use commands::resolve::ResolveCommand;
use commands::watch::WatchCommand;
use commands::Command;

/// `RUST_LOG` wins; otherwise `linkwatch=info`, or `debug` with `--verbose`
fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("linkwatch={}", log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command: Box<dyn Command + Send + Sync> = match cli.command {
        Commands::Resolve(args) => Box::new(ResolveCommand::new(args, cli.config)),
        Commands::Watch(args) => Box::new(WatchCommand::new(args, cli.config)),
        Commands::Config { action } => Box::new(ConfigCommand::new(action, cli.config)),
    };
    command.execute().await
}
