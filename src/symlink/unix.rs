//! `lstat`/`readlink` probe

use std::fs;
use std::path::{Path, PathBuf};

use super::{absolutize_target, SymlinkProbe};
use crate::core::errors::LinkError;

/// Probe for POSIX filesystems
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixProbe;

impl SymlinkProbe for UnixProbe {
    fn is_symlink(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|metadata| metadata.file_type().is_symlink())
            .unwrap_or(false)
    }

    fn read_immediate_target(&self, path: &Path) -> Result<PathBuf, LinkError> {
        let metadata = fs::symlink_metadata(path).map_err(|e| LinkError::os(path, e))?;
        if !metadata.file_type().is_symlink() {
            return Err(LinkError::NotALink {
                path: path.to_path_buf(),
            });
        }

        let target = fs::read_link(path).map_err(|e| LinkError::os(path, e))?;
        Ok(absolutize_target(path, target))
    }

    fn name(&self) -> &'static str {
        "unix"
    }
}
