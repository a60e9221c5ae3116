use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime};

use tracing::debug;

use super::{PollingChangeToken, PollingContext, TokenSignal};

#[derive(Debug)]
struct FileState {
    previous_mtime: Option<SystemTime>,
    last_checked: Instant,
}

/// Polls one file's resolved modification time
///
/// The target is followed through any symbolic link chain on every check,
/// so replacing what a link points at counts as a change.
#[derive(Debug)]
pub struct PollingFileChangeToken {
    path: PathBuf,
    watched: String,
    context: PollingContext,
    signal: Arc<TokenSignal>,
    state: Mutex<FileState>,
}

impl PollingFileChangeToken {
    pub fn new(path: impl Into<PathBuf>, context: PollingContext) -> Self {
        let path = path.into();
        let previous_mtime = context.observe_mtime(&path);
        let last_checked = context.clock.now();
        Self {
            watched: path.to_string_lossy().into_owned(),
            path,
            context,
            signal: TokenSignal::new(),
            state: Mutex::new(FileState {
                previous_mtime,
                last_checked,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Modification time observed at the last evaluation
    pub fn observed_mtime(&self) -> Option<SystemTime> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .previous_mtime
    }
}

impl PollingChangeToken for PollingFileChangeToken {
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

            let current = self.context.observe_mtime(&self.path);
            let changed = current != state.previous_mtime;
            if changed {
                debug!(
                    "Modification time of {} moved from {:?} to {:?}",
                    self.path.display(),
                    state.previous_mtime,
                    current
                );
                state.previous_mtime = current;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::constants::DEFAULT_POLLING_INTERVAL;
    use crate::symlink::SymlinkResolver;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn context(clock: &ManualClock) -> PollingContext {
        PollingContext::new(
            SymlinkResolver::for_host(),
            Arc::new(clock.clone()),
            DEFAULT_POLLING_INTERVAL,
        )
    }

    fn touch(path: &Path, offset_secs: u64) {
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(offset_secs))
            .unwrap();
    }

    #[test]
    fn test_change_within_interval_is_debounced() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("appsettings.json");
        fs::write(&file, "{}").unwrap();
        let clock = ManualClock::new();
        let token = PollingFileChangeToken::new(&file, context(&clock));

        touch(&file, 60);
        clock.advance(Duration::from_secs(1));
        assert!(!token.has_changed());

        clock.advance(DEFAULT_POLLING_INTERVAL);
        assert!(token.has_changed());
    }

    #[test]
    fn test_fired_state_is_sticky_after_revert() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("appsettings.json");
        fs::write(&file, "{}").unwrap();
        let original = fs::metadata(&file).unwrap().modified().unwrap();
        let clock = ManualClock::new();
        let token = PollingFileChangeToken::new(&file, context(&clock));

        touch(&file, 60);
        clock.advance(DEFAULT_POLLING_INTERVAL);
        assert!(token.has_changed());

        fs::OpenOptions::new()
            .write(true)
            .open(&file)
            .unwrap()
            .set_modified(original)
            .unwrap();
        for _ in 0..3 {
            clock.advance(DEFAULT_POLLING_INTERVAL);
            assert!(token.has_changed());
        }
    }

    #[test]
    fn test_deleting_the_file_fires() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("appsettings.json");
        fs::write(&file, "{}").unwrap();
        let clock = ManualClock::new();
        let token = PollingFileChangeToken::new(&file, context(&clock));

        fs::remove_file(&file).unwrap();
        clock.advance(DEFAULT_POLLING_INTERVAL);
        assert!(token.has_changed());
        assert_eq!(token.observed_mtime(), None);
    }

    #[test]
    fn test_unchanged_file_never_fires() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("appsettings.json");
        fs::write(&file, "{}").unwrap();
        let clock = ManualClock::new();
        let token = PollingFileChangeToken::new(&file, context(&clock));

        for _ in 0..3 {
            clock.advance(DEFAULT_POLLING_INTERVAL);
            assert!(!token.has_changed());
        }
    }

    #[test]
    fn test_frozen_context_stops_evaluation() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("appsettings.json");
        fs::write(&file, "{}").unwrap();
        let clock = ManualClock::new();
        let ctx = context(&clock);
        let token = PollingFileChangeToken::new(&file, ctx.clone());

        ctx.freeze();
        touch(&file, 60);
        clock.advance(DEFAULT_POLLING_INTERVAL);
        assert!(!token.has_changed());
    }

    #[cfg(unix)]
    #[test]
    fn test_retargeting_a_link_fires() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        let first = dir.path().join("v1.json");
        let second = dir.path().join("v2.json");
        fs::write(&first, "{}").unwrap();
        fs::write(&second, "{}").unwrap();
        touch(&second, 120);
        let link = dir.path().join("appsettings.json");
        symlink(&first, &link).unwrap();

        let clock = ManualClock::new();
        let token = PollingFileChangeToken::new(&link, context(&clock));

        fs::remove_file(&link).unwrap();
        symlink(&second, &link).unwrap();
        clock.advance(DEFAULT_POLLING_INTERVAL);
        assert!(token.has_changed());
    }
}
