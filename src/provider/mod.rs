//! File provider rooted at a directory, with polling watches
//!
//! Lookups never leave the root: absolute subpaths, `..` escapes, invalid
//! characters, and excluded entries all report "not found" instead of
//! failing.

mod file_info;

pub use file_info::{FileInfo, PhysicalFileInfo};

use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use tracing::{debug, info};

use crate::change_token::ChangeToken;
use crate::core::errors::ProviderError;
use crate::symlink::SymlinkResolver;
use crate::watcher::keys::{
    has_invalid_filter_chars, has_invalid_path_chars, is_rooted, path_navigates_above_root,
    trim_leading_separators,
};
use crate::watcher::{ExclusionFilters, PollingRegistry, WatchOptions};

#[derive(Debug)]
pub struct PollingFileProvider {
    root: PathBuf,
    exclusions: ExclusionFilters,
    resolver: SymlinkResolver,
    registry: PollingRegistry,
}

impl PollingFileProvider {
    pub fn new(root: impl AsRef<Path>, options: WatchOptions) -> Result<Self, ProviderError> {
        let root = root.as_ref();
        if !root.is_absolute() {
            return Err(ProviderError::RootNotAbsolute {
                path: root.to_path_buf(),
            });
        }
        let root = lexical_full_path(root);
        if !root.is_dir() {
            return Err(ProviderError::RootNotFound { path: root });
        }
        let root = with_trailing_separator(root);

        info!("Created polling file provider at {}", root.display());
        Ok(Self {
            exclusions: options.exclusions,
            resolver: options.resolver(),
            registry: PollingRegistry::new(&root, options),
            root,
        })
    }

    /// Root directory, always ending in a separator
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &PollingRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &SymlinkResolver {
        &self.resolver
    }

    pub fn get_file_info(&self, subpath: &str) -> FileInfo {
        if subpath.is_empty() || has_invalid_path_chars(subpath) {
            return FileInfo::not_found(subpath);
        }
        let subpath = trim_leading_separators(subpath);
        let Some(full_path) = self.full_path(subpath) else {
            return FileInfo::not_found(subpath);
        };
        if self.exclusions.is_excluded(&full_path) {
            debug!("Lookup of excluded entry {}", full_path.display());
            return FileInfo::not_found(subpath);
        }

        match PhysicalFileInfo::from_path(&full_path, &self.resolver) {
            Some(info) => FileInfo::Physical(info),
            None => FileInfo::not_found(subpath),
        }
    }

    /// Visible children of a directory below the root, sorted by name
    ///
    /// An empty subpath lists the root itself.
    pub fn get_directory_contents(&self, subpath: &str) -> Option<Vec<FileInfo>> {
        if has_invalid_path_chars(subpath) {
            return None;
        }
        let subpath = trim_leading_separators(subpath);
        let full_path = self.full_path(subpath)?;
        if !full_path.is_dir() {
            return None;
        }

        let entries = match fs::read_dir(&full_path) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot list {}: {}", full_path.display(), e);
                return None;
            }
        };

        let mut contents: Vec<FileInfo> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| !self.exclusions.is_excluded(path))
            .filter_map(|path| PhysicalFileInfo::from_path(&path, &self.resolver))
            .map(FileInfo::Physical)
            .collect();
        contents.sort_by(|a, b| a.name().cmp(b.name()));
        Some(contents)
    }

    /// Watch a root-relative path or glob; unwatchable filters never fire
    pub fn watch(&self, filter: &str) -> ChangeToken {
        if has_invalid_filter_chars(filter) {
            return ChangeToken::Null;
        }
        self.registry.watch(trim_leading_separators(filter))
    }

    pub fn dispose(&self) {
        self.registry.dispose();
    }

    fn full_path(&self, subpath: &str) -> Option<PathBuf> {
        if is_rooted(subpath) || path_navigates_above_root(subpath) {
            return None;
        }
        let joined = subpath
            .split(['/', '\\'])
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment));
        let full = lexical_full_path(&joined);
        full.starts_with(&self.root).then_some(full)
    }
}

/// Collapse `.` and `..` without touching the filesystem
fn lexical_full_path(path: &Path) -> PathBuf {
    let mut full = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if full.parent().is_some() {
                    full.pop();
                }
            }
            other => full.push(other.as_os_str()),
        }
    }
    full
}

fn with_trailing_separator(path: PathBuf) -> PathBuf {
    let mut raw: OsString = path.into_os_string();
    if !raw.to_string_lossy().ends_with(['/', '\\']) {
        raw.push(MAIN_SEPARATOR.to_string());
    }
    PathBuf::from(raw)
}
