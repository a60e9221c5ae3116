//! Windows path algebra on plain strings
//!
//! Relative reparse targets must be combined against the directory holding the
//! link using Windows rules (drive roots, UNC shares, `\\?\` prefixes). Doing
//! this on strings keeps the logic identical on every host.

/// Win32 extended-length prefix
pub const EXTENDED_PREFIX: &str = r"\\?\";

/// NT object manager prefix as stored in reparse buffers
pub const NT_PREFIX: &str = r"\??\";

/// Win32 device namespace prefix
pub const DEVICE_PREFIX: &str = r"\\.\";

const SEPARATOR: char = '\\';

/// Replace `/` with `\`
pub fn normalize_separators(path: &str) -> String {
    path.replace('/', "\\")
}

/// True for `\\?\`, `\\.\` and `\??\` prefixed paths
pub fn is_extended(path: &str) -> bool {
    extended_prefix(path).is_some()
}

fn extended_prefix(path: &str) -> Option<&str> {
    [EXTENDED_PREFIX, DEVICE_PREFIX, NT_PREFIX]
        .into_iter()
        .find(|prefix| path.starts_with(prefix))
        .map(|prefix| &path[..prefix.len()])
}

/// Rewrite an NT `\??\` prefix to the Win32 `\\?\` form accepted by `CreateFileW`
pub fn to_win32_namespace(path: &str) -> String {
    match path.strip_prefix(NT_PREFIX) {
        Some(rest) => format!("{EXTENDED_PREFIX}{rest}"),
        None => path.to_string(),
    }
}

/// Length of the root portion of a separator-normalized, non-extended path
fn root_len(path: &str) -> usize {
    let bytes = path.as_bytes();
    if let Some(rest) = path.strip_prefix(r"\\") {
        // \\server\share\
        let mut separators = rest.match_indices(SEPARATOR).map(|(i, _)| i);
        return match (separators.next(), separators.next()) {
            (Some(_), Some(second)) => 2 + second + 1,
            _ => path.len(),
        };
    }
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return if bytes.get(2) == Some(&b'\\') { 3 } else { 2 };
    }
    if path.starts_with(SEPARATOR) {
        1
    } else {
        0
    }
}

/// True when the path carries a drive, UNC or separator root
pub fn is_rooted(path: &str) -> bool {
    let path = normalize_separators(path);
    is_extended(&path) || root_len(&path) > 0
}

/// Directory containing `path`, or `None` when `path` is a root
pub fn parent(path: &str) -> Option<String> {
    let path = normalize_separators(path);
    let root = root_len(&path);
    let trimmed = path[root..].trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => Some(format!("{}{}", &path[..root], &trimmed[..idx])),
        None if root > 0 => Some(path[..root].to_string()),
        None => Some(String::new()),
    }
}

/// Join `relative` onto `base`; a rooted `relative` wins outright
pub fn combine(base: &str, relative: &str) -> String {
    let base = normalize_separators(base);
    let relative = normalize_separators(relative);
    if base.is_empty() || root_len(&relative) > 0 {
        return relative;
    }
    if base.ends_with(SEPARATOR) {
        format!("{base}{relative}")
    } else {
        format!("{base}{SEPARATOR}{relative}")
    }
}

/// Collapse `.` and `..` segments without ever climbing above the root
pub fn full_path(path: &str) -> String {
    let path = normalize_separators(path);
    let root = root_len(&path);
    let mut segments: Vec<&str> = Vec::new();
    for segment in path[root..].split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let mut result = path[..root].to_string();
    result.push_str(&segments.join("\\"));
    result
}

/// Resolve a relative substitute name against the directory that holds `link_path`
///
/// An extended prefix on the link path is removed before combining and put
/// back afterwards.
pub fn resolve_relative_target(link_path: &str, substitute_name: &str) -> String {
    let link_path = normalize_separators(link_path);
    match extended_prefix(&link_path) {
        Some(prefix) => {
            let rest = &link_path[prefix.len()..];
            let dir = parent(rest).unwrap_or_default();
            format!("{prefix}{}", full_path(&combine(&dir, substitute_name)))
        }
        None => {
            let dir = parent(&link_path).unwrap_or_default();
            full_path(&combine(&dir, substitute_name))
        }
    }
}
