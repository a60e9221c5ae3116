//! Cross-platform symbolic link resolution
//!
//! A [`SymlinkProbe`] answers two questions about a single path: is it a
//! symbolic link, and what does it point at. [`SymlinkResolver`] follows a
//! chain of such hops to the final target, bounded by a maximum depth.
//!
//! The probe is chosen once per resolver: [`WindowsProbe`] reads reparse
//! points through `DeviceIoControl`, [`UnixProbe`] uses `lstat`/`readlink`.

pub mod reparse;
pub mod windows_path;

#[cfg(not(windows))]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(not(windows))]
pub use unix::UnixProbe;
#[cfg(windows)]
pub use windows::WindowsProbe;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::core::constants::MAX_SYMLINK_DEPTH;
use crate::core::errors::LinkError;

/// Per-OS primitive for inspecting one link hop
pub trait SymlinkProbe: Send + Sync + fmt::Debug {
    /// True when `path` itself (not its target) is a symbolic link
    fn is_symlink(&self, path: &Path) -> bool;

    /// Immediate target of the link at `path`, made absolute
    ///
    /// Fails with [`LinkError::NotALink`] when `path` is not a link.
    fn read_immediate_target(&self, path: &Path) -> Result<PathBuf, LinkError>;

    /// Short name for diagnostics
    fn name(&self) -> &'static str;
}

/// Probe for the platform this binary was built for
pub fn host_probe() -> Arc<dyn SymlinkProbe> {
    #[cfg(windows)]
    {
        Arc::new(WindowsProbe)
    }
    #[cfg(not(windows))]
    {
        Arc::new(UnixProbe)
    }
}

/// Anchor a relative link target at the directory holding the link
///
/// `..` segments are left for the OS to interpret, because the link's own
/// directory may itself be reached through a link.
pub(crate) fn absolutize_target(link: &Path, target: PathBuf) -> PathBuf {
    if target.is_absolute() {
        return target;
    }
    let base = link.parent().unwrap_or_else(|| Path::new(""));
    base.join(target)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Follows symbolic link chains to their final target
#[derive(Debug, Clone)]
pub struct SymlinkResolver {
    probe: Arc<dyn SymlinkProbe>,
    max_depth: usize,
}

impl SymlinkResolver {
    pub fn new(probe: Arc<dyn SymlinkProbe>) -> Self {
        Self {
            probe,
            max_depth: MAX_SYMLINK_DEPTH,
        }
    }

    /// Resolver backed by the host platform's probe
    pub fn for_host() -> Self {
        Self::new(host_probe())
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn probe_name(&self) -> &'static str {
        self.probe.name()
    }

    pub fn is_symlink(&self, path: &Path) -> bool {
        self.probe.is_symlink(path)
    }

    /// Read a single hop without following further
    pub fn read_link(&self, path: &Path) -> Result<PathBuf, LinkError> {
        self.probe.read_immediate_target(path)
    }

    /// Follow the chain starting at `path` until a non-link is reached
    ///
    /// Only the hop count guards against cycles: a loop shorter than the
    /// depth bound is walked until the bound trips.
    pub fn resolve_final_target(&self, path: &Path) -> Result<PathBuf, LinkError> {
        let mut current = path.to_path_buf();
        let mut depth = 0usize;

        loop {
            if !self.probe.is_symlink(&current) {
                return Ok(current);
            }
            if depth >= self.max_depth {
                return Err(LinkError::LinkCycleExceeded {
                    path: path.to_path_buf(),
                    max_depth: self.max_depth,
                });
            }

            let target = match self.probe.read_immediate_target(&current) {
                Ok(target) => target,
                // replaced by a regular file between the two calls
                Err(LinkError::NotALink { .. }) => return Ok(current),
                Err(e) => return Err(e),
            };
            depth += 1;
            debug!(
                "Link hop {} via {}: {} -> {}",
                depth,
                self.probe.name(),
                current.display(),
                target.display()
            );
            current = target;
        }
    }

    /// `Some(final target)` for a link, `None` for anything else
    pub fn try_link_target(&self, path: &Path) -> Result<Option<PathBuf>, LinkError> {
        if !self.probe.is_symlink(path) {
            return Ok(None);
        }
        self.resolve_final_target(path).map(Some)
    }

    /// Modification time of the ultimate target of `path`
    ///
    /// A missing target, including a dangling link, yields `Ok(None)`,
    /// which orders before every real timestamp.
    pub fn final_modification_time(&self, path: &Path) -> Result<Option<SystemTime>, LinkError> {
        let target = match self.resolve_final_target(path) {
            Ok(target) => target,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        match fs::metadata(&target) {
            Ok(metadata) => metadata
                .modified()
                .map(Some)
                .map_err(|e| LinkError::os(&target, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LinkError::os(&target, e)),
        }
    }
}

impl Default for SymlinkResolver {
    fn default() -> Self {
        Self::for_host()
    }
}
