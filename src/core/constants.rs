/// Shared constants for link resolution and polling.
use std::time::Duration;

/// Maximum number of symbolic link hops followed before giving up
pub const MAX_SYMLINK_DEPTH: usize = 32;

/// Default spacing between re-checks of a polled target
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(4);

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "LINKWATCH_";

/// Default configuration file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = ".linkwatch.toml";

/// Characters that start a glob expression in a watch key
pub const GLOB_METACHARACTERS: &[char] = &['*', '?', '['];

/// Name of the background polling thread
pub const TIMER_THREAD_NAME: &str = "linkwatch-poll";

/// Windows reparse point constants
pub mod reparse {
    /// `IO_REPARSE_TAG_SYMLINK`
    pub const IO_REPARSE_TAG_SYMLINK: u32 = 0xA000_000C;

    /// `SYMLINK_FLAG_RELATIVE`
    pub const SYMLINK_FLAG_RELATIVE: u32 = 1;

    /// `FSCTL_GET_REPARSE_POINT`
    pub const FSCTL_GET_REPARSE_POINT: u32 = 0x0009_00A8;

    /// Fixed header of a symbolic link reparse buffer, in bytes
    pub const SYMLINK_HEADER_LEN: usize = 20;

    /// Growth step for the reparse buffer, in bytes
    pub const MAX_PATH: usize = 260;
}
