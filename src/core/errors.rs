/// Domain-specific error types for linkwatch using thiserror
///
/// Link resolution, configuration loading and provider construction each get
/// their own enum so callers can match on the failure they care about.
/// Polling paths never surface these; they degrade to "target missing".
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for linkwatch operations
#[derive(Error, Debug)]
pub enum LinkWatchError {
    #[error("Link resolution failed")]
    Link(#[from] LinkError),

    #[error("Configuration error")]
    Config(#[from] ConfigError),

    #[error("File provider error")]
    Provider(#[from] ProviderError),

    #[error("Failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Symbolic link resolution errors
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Not a symbolic link: {path}")]
    NotALink { path: PathBuf },

    #[error("Symbolic link chain starting at {path} exceeds {max_depth} hops")]
    LinkCycleExceeded { path: PathBuf, max_depth: usize },

    #[error("OS error while reading {path}: {source}")]
    Os {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed reparse data for {path}: {reason}")]
    DataFormat { path: PathBuf, reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to parse configuration {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid configuration value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Polling file provider construction errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider root must be an absolute path: {path}")]
    RootNotAbsolute { path: PathBuf },

    #[error("Provider root directory not found: {path}")]
    RootNotFound { path: PathBuf },
}

impl LinkError {
    /// Check if the caller can fall back to treating the path as a plain file
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LinkError::NotALink { .. })
    }

    /// Raw OS error code, when the failure came from a syscall
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            LinkError::Os { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// True when the underlying syscall reported a missing file or directory
    pub fn is_not_found(&self) -> bool {
        match self {
            LinkError::Os { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    pub fn os(path: impl Into<PathBuf>, source: io::Error) -> Self {
        LinkError::Os {
            path: path.into(),
            source,
        }
    }

    pub fn data_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        LinkError::DataFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl LinkWatchError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            LinkWatchError::Link(err) => err.is_recoverable(),
            LinkWatchError::Config(ConfigError::FileNotFound { .. }) => true,
            _ => false,
        }
    }
}
