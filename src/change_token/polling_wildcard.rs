use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime};

use glob::{MatchOptions, Pattern, PatternError};
use tracing::debug;
use walkdir::WalkDir;

use super::{PollingChangeToken, PollingContext, TokenSignal};
use crate::watcher::exclusion::ExclusionFilters;

type Snapshot = BTreeMap<PathBuf, Option<SystemTime>>;

#[derive(Debug)]
struct ScanState {
    snapshot: Snapshot,
    last_checked: Instant,
}

/// Polls the set of files under `root` matching a glob
///
/// Adding, removing, or touching any match fires the token. Patterns are
/// matched against `/`-separated paths relative to `root`; a trailing
/// separator watches everything below that directory.
#[derive(Debug)]
pub struct PollingWildcardChangeToken {
    root: PathBuf,
    pattern: Pattern,
    watched: String,
    match_options: MatchOptions,
    exclusions: ExclusionFilters,
    context: PollingContext,
    signal: Arc<TokenSignal>,
    state: Mutex<ScanState>,
}

impl PollingWildcardChangeToken {
    pub fn new(
        root: impl Into<PathBuf>,
        pattern: &str,
        exclusions: ExclusionFilters,
        case_insensitive: bool,
        context: PollingContext,
    ) -> Result<Self, PatternError> {
        let watched = if pattern.ends_with('/') {
            format!("{}**/*", pattern)
        } else {
            pattern.to_string()
        };

        let mut token = Self {
            root: root.into(),
            pattern: Pattern::new(&watched)?,
            watched,
            match_options: MatchOptions {
                case_sensitive: !case_insensitive,
                require_literal_separator: true,
                require_literal_leading_dot: false,
            },
            exclusions,
            signal: TokenSignal::new(),
            state: Mutex::new(ScanState {
                snapshot: Snapshot::new(),
                last_checked: context.clock.now(),
            }),
            context,
        };

        let snapshot = token.scan();
        token
            .state
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot = snapshot;
        Ok(token)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of matches seen at the last evaluation
    pub fn matched_files(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot
            .len()
    }

    fn scan(&self) -> Snapshot {
        let mut snapshot = Snapshot::new();
        let exclusions = self.exclusions;

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| !exclusions.is_excluded(entry.path()));

        for entry in walker.filter_map(|e| e.ok()) {
            let file_type = entry.file_type();
            if !(file_type.is_file() || file_type.is_symlink()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if self.pattern.matches_with(&relative, self.match_options) {
                let mtime = self.context.observe_mtime(entry.path());
                snapshot.insert(entry.into_path(), mtime);
            }
        }
        snapshot
    }
}

impl PollingChangeToken for PollingWildcardChangeToken {
    fn has_changed(&self) -> bool {
        if self.signal.is_fired() {
            return true;
        }
        if self.context.is_frozen() {
            return false;
        }

        let changed = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let now = self.context.clock.now();
            if now.saturating_duration_since(state.last_checked) < self.context.interval {
                return self.signal.is_fired();
            }

            let current = self.scan();
            let changed = current != state.snapshot;
            if changed {
                debug!(
                    "Match set of {} under {} changed ({} -> {} files)",
                    self.watched,
                    self.root.display(),
                    state.snapshot.len(),
                    current.len()
                );
                state.snapshot = current;
            }
            state.last_checked = now;
            changed
        };

        if changed {
            self.signal.fire();
        }
        self.signal.is_fired()
    }

    fn signal(&self) -> &Arc<TokenSignal> {
        &self.signal
    }

    fn watched(&self) -> &str {
        &self.watched
    }
}
