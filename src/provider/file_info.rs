use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::symlink::SymlinkResolver;

/// Result of a provider lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileInfo {
    /// Missing, excluded, or outside the provider root
    NotFound { name: String },
    Physical(PhysicalFileInfo),
}

impl FileInfo {
    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        FileInfo::NotFound { name: name.into() }
    }

    pub fn exists(&self) -> bool {
        matches!(self, FileInfo::Physical(_))
    }

    pub fn name(&self) -> &str {
        match self {
            FileInfo::NotFound { name } => name,
            FileInfo::Physical(info) => &info.name,
        }
    }

    pub fn physical(&self) -> Option<&PhysicalFileInfo> {
        match self {
            FileInfo::NotFound { .. } => None,
            FileInfo::Physical(info) => Some(info),
        }
    }
}

/// An entry that exists on disk below the provider root
///
/// Length, directory flag and modification time describe the final target
/// of a link chain; `is_symlink` describes the entry itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalFileInfo {
    pub name: String,
    pub physical_path: PathBuf,
    pub length: u64,
    pub last_modified: Option<SystemTime>,
    pub is_directory: bool,
    pub is_symlink: bool,
}

impl PhysicalFileInfo {
    /// `None` if nothing, not even a dangling link, exists at `path`
    pub fn from_path(path: &Path, resolver: &SymlinkResolver) -> Option<Self> {
        let own = fs::symlink_metadata(path).ok()?;
        let is_symlink = own.file_type().is_symlink() || resolver.is_symlink(path);
        let target = if is_symlink { fs::metadata(path).ok() } else { Some(own) };

        Some(Self {
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            physical_path: path.to_path_buf(),
            length: target.as_ref().map(|m| m.len()).unwrap_or(0),
            last_modified: resolver.final_modification_time(path).ok().flatten(),
            is_directory: target.as_ref().map(|m| m.is_dir()).unwrap_or(false),
            is_symlink,
        })
    }

    pub fn last_modified_utc(&self) -> Option<DateTime<Utc>> {
        self.last_modified.map(DateTime::<Utc>::from)
    }
}
