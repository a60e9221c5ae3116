use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Resolve symbolic link chains and watch linked configuration files.
///
/// # Examples
///
/// ```bash
/// # Follow a link chain to its final target
/// linkwatch resolve /etc/app/appsettings.json
///
/// # Poll a config file and every JSON file below conf/
/// linkwatch watch appsettings.json 'conf/*.json' --root /etc/app
///
/// # Print the effective configuration
/// linkwatch config show
/// ```
#[derive(Parser, Debug)]
#[command(name = "linkwatch")]
#[command(about = "Symbolic link resolution and polling change detection")]
#[command(version)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: ./.linkwatch.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow a symbolic link chain to its final target
    Resolve(ResolveArgs),

    /// Poll paths or glob patterns and report changes
    Watch(WatchArgs),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Path to resolve
    pub path: PathBuf,

    /// Maximum number of link hops to follow
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Root-relative paths or glob patterns to watch
    #[arg(required = true)]
    pub keys: Vec<String>,

    /// Directory the keys are relative to (default: current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Polling interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Exit after the first change
    #[arg(long)]
    pub once: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Write a configuration file with default values
    Init,

    /// Show the effective configuration (file plus environment)
    Show,
}
