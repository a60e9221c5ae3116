//! Which directory entries are invisible to providers and wildcard scans

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Entry classes hidden from enumeration and lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionFilters {
    /// Names starting with `.`
    pub dot_prefixed: bool,
    /// Hidden attribute on Windows, dot-prefixed names elsewhere
    pub hidden: bool,
    /// System attribute (Windows only)
    pub system: bool,
}

impl ExclusionFilters {
    pub const NONE: Self = Self {
        dot_prefixed: false,
        hidden: false,
        system: false,
    };

    pub const SENSITIVE: Self = Self {
        dot_prefixed: true,
        hidden: true,
        system: true,
    };

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.is_none() {
            return false;
        }
        let dot_prefixed = path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with('.'))
            .unwrap_or(false);
        if self.dot_prefixed && dot_prefixed {
            return true;
        }

        let (hidden, system) = attributes(path, dot_prefixed);
        (self.hidden && hidden) || (self.system && system)
    }
}

impl Default for ExclusionFilters {
    fn default() -> Self {
        Self::SENSITIVE
    }
}

#[cfg(windows)]
fn attributes(path: &Path, _dot_prefixed: bool) -> (bool, bool) {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;

    match std::fs::symlink_metadata(path) {
        Ok(metadata) => {
            let attrs = metadata.file_attributes();
            (
                attrs & FILE_ATTRIBUTE_HIDDEN != 0,
                attrs & FILE_ATTRIBUTE_SYSTEM != 0,
            )
        }
        Err(_) => (false, false),
    }
}

#[cfg(not(windows))]
fn attributes(_path: &Path, dot_prefixed: bool) -> (bool, bool) {
    (dot_prefixed, false)
}
