//! Watch key normalization and root-relative path checks

use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::core::constants::GLOB_METACHARACTERS;
use crate::symlink::windows_path;

const PATH_SEPARATORS: &[char] = &['/', '\\'];

/// Characters rejected in every watch filter
fn is_invalid_filter_char(c: char) -> bool {
    c.is_control() || matches!(c, '"' | '<' | '>' | '|')
}

/// True if `filter` contains characters no watch key may carry
pub fn has_invalid_filter_chars(filter: &str) -> bool {
    filter.chars().any(is_invalid_filter_char)
}

/// Filter characters plus glob metacharacters, for concrete lookups
pub fn has_invalid_path_chars(path: &str) -> bool {
    path.chars()
        .any(|c| is_invalid_filter_char(c) || GLOB_METACHARACTERS.contains(&c))
}

/// True if walking `path` segment by segment ever climbs above its start
pub fn path_navigates_above_root(path: &str) -> bool {
    let mut depth: i64 = 0;
    for segment in path.split(PATH_SEPARATORS) {
        match segment {
            "" | "." => {}
            ".." => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            _ => depth += 1,
        }
    }
    false
}

/// Drop leading separators; relative keys may start with one
pub fn trim_leading_separators(path: &str) -> &str {
    path.trim_start_matches(PATH_SEPARATORS)
}

/// Absolute on this host, or carrying a Windows drive/UNC root
pub fn is_rooted(path: &str) -> bool {
    Path::new(path).is_absolute() || windows_path::is_rooted(path)
}

/// Normalized registry key for a path or glob pattern
#[derive(Debug, Clone)]
pub struct WatchKey {
    normalized: String,
    lookup: String,
}

impl WatchKey {
    /// Normalize `filter`, or `None` if it can never be watched
    ///
    /// Rejected: invalid characters, empty keys, absolute paths and
    /// patterns that escape the root.
    pub fn parse(filter: &str, case_insensitive: bool) -> Option<Self> {
        if has_invalid_filter_chars(filter) {
            return None;
        }
        let normalized = trim_leading_separators(filter).replace('\\', "/");
        if normalized.is_empty() || is_rooted(&normalized) || path_navigates_above_root(&normalized) {
            return None;
        }

        let lookup = if case_insensitive {
            normalized.to_lowercase()
        } else {
            normalized.clone()
        };
        Some(Self { normalized, lookup })
    }

    /// Key with separators normalized to `/`, original case preserved
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Glob metacharacters, or a trailing separator meaning "everything below"
    pub fn is_wildcard(&self) -> bool {
        self.normalized.contains(GLOB_METACHARACTERS) || self.is_directory()
    }

    pub fn is_directory(&self) -> bool {
        self.normalized.ends_with('/')
    }
}

impl PartialEq for WatchKey {
    fn eq(&self, other: &Self) -> bool {
        self.lookup == other.lookup
    }
}

impl Eq for WatchKey {}

impl Hash for WatchKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lookup.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("config.json", "config.json" ; "plain")]
    #[test_case("/config.json", "config.json" ; "leading slash trimmed")]
    #[test_case(r"\\cfg\app.json", "cfg/app.json" ; "backslashes normalized")]
    #[test_case("cfg/../app.json", "cfg/../app.json" ; "inner parent stays inside")]
    fn test_accepted_keys(filter: &str, expected: &str) {
        let key = WatchKey::parse(filter, false).unwrap();
        assert_eq!(key.as_str(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("../secrets.json" ; "escapes root")]
    #[test_case("cfg/../../x" ; "escapes root later")]
    #[test_case("C:/windows/win.ini" ; "drive rooted")]
    #[test_case("a|b" ; "pipe")]
    #[test_case("bad\0name" ; "nul")]
    fn test_rejected_keys(filter: &str) {
        assert!(WatchKey::parse(filter, false).is_none());
    }

    #[test]
    fn test_wildcard_classification() {
        assert!(WatchKey::parse("*.json", false).unwrap().is_wildcard());
        assert!(WatchKey::parse("conf?.json", false).unwrap().is_wildcard());
        assert!(WatchKey::parse("configs/", false).unwrap().is_wildcard());
        assert!(!WatchKey::parse("configs/app.json", false).unwrap().is_wildcard());
    }

    #[test]
    fn test_case_insensitive_keys_compare_equal() {
        let a = WatchKey::parse("Config.JSON", true).unwrap();
        let b = WatchKey::parse("config.json", true).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "Config.JSON");

        let c = WatchKey::parse("Config.JSON", false).unwrap();
        let d = WatchKey::parse("config.json", false).unwrap();
        assert_ne!(c, d);
    }

    #[test]
    fn test_invalid_path_chars_include_globs() {
        assert!(has_invalid_path_chars("*.json"));
        assert!(!has_invalid_filter_chars("*.json"));
        assert!(!has_invalid_path_chars("cfg/app.json"));
    }
}
