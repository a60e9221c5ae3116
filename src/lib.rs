//! # linkwatch
//!
//! Change detection for configuration files reached through symbolic links.
//!
//! Native file notification APIs often stay silent when the target of a link
//! is swapped (Kubernetes config maps, Docker secrets, `ln -sfn` deploys).
//! linkwatch instead resolves link chains itself and polls the final
//! target's modification time, exposing the result as one-shot change
//! tokens.
//!
//! ## Core Features
//!
//! - **Link resolution**: follow a symbolic link chain to its final target on
//!   Unix and Windows (reparse points), bounded to 32 hops
//! - **Change tokens**: sticky one-shot signals with callbacks, composites and
//!   re-arming subscriptions
//! - **Polling registry**: per-key deduplicated polling of files and glob
//!   patterns driven by one background timer
//! - **File provider**: root-confined lookups, listings and watches
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use linkwatch::{PollingFileProvider, WatchOptions};
//!
//! let provider = PollingFileProvider::new("/etc/app", WatchOptions::default())?;
//! let token = provider.watch("appsettings.json");
//! let _registration = token.register_callback(|| println!("configuration changed"));
//! # Ok::<(), linkwatch::ProviderError>(())
//! ```
//!
//! ## Module Overview
//!
//! - [`symlink`] - Link probes, reparse buffer decoding and chain resolution
//! - [`change_token`] - Change token types and subscriptions
//! - [`watcher`] - Polling registry, watch keys and the timer
//! - [`provider`] - Root-confined file provider
//! - [`linked`] - Watching a configuration file through its link
//! - [`config`] - TOML and environment configuration
//! - [`cli`] - Command-line interface

/// Change tokens and re-arming subscriptions
pub mod change_token;
/// Command-line interface and argument parsing
pub mod cli;
/// Configuration loading and validation
pub mod config;
/// Shared constants, errors and the clock abstraction
pub mod core;
/// Configuration files reached through symbolic links
pub mod linked;
/// Root-confined file provider with polling watches
pub mod provider;
/// Symbolic link probing and resolution
pub mod symlink;
/// Polling watch registry
pub mod watcher;

pub use change_token::{
    on_change, CallbackRegistration, CancellationChangeToken, ChangeSubscription, ChangeToken,
    CompositeChangeToken, PollingFileChangeToken, PollingWildcardChangeToken,
};
pub use config::WatchConfig;
pub use self::core::*;
pub use linked::LinkedFile;
pub use provider::{FileInfo, PhysicalFileInfo, PollingFileProvider};
pub use symlink::{SymlinkProbe, SymlinkResolver};
pub use watcher::{ExclusionFilters, PollingRegistry, WatchOptions};
