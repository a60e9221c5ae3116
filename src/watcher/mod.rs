//! Polling watch registry
//!
//! [`PollingRegistry`] hands out change tokens for paths and glob patterns
//! below a root directory, deduplicates the polling work per key, and runs
//! one lazily started background timer that advances tokens nobody is
//! actively polling.

pub mod exclusion;
pub mod keys;
pub mod timer;

pub use exclusion::ExclusionFilters;
pub use keys::WatchKey;
pub use timer::PollingTimer;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::change_token::{
    CancellationChangeToken, ChangeToken, PollingChangeToken, PollingContext,
    PollingFileChangeToken, PollingWildcardChangeToken,
};
use crate::core::clock::{SharedClock, SystemClock};
use crate::core::constants::{DEFAULT_POLLING_INTERVAL, MAX_SYMLINK_DEPTH};
use crate::symlink::SymlinkResolver;

/// Whether the host filesystem compares names case-insensitively by default
pub fn host_is_case_insensitive() -> bool {
    cfg!(any(windows, target_os = "macos"))
}

/// Runtime settings for a registry and its tokens
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub polling_interval: Duration,
    pub max_symlink_depth: usize,
    pub case_insensitive_keys: bool,
    pub exclusions: ExclusionFilters,
    pub clock: SharedClock,
}

impl WatchOptions {
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionFilters) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn resolver(&self) -> SymlinkResolver {
        SymlinkResolver::for_host().with_max_depth(self.max_symlink_depth)
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            polling_interval: DEFAULT_POLLING_INTERVAL,
            max_symlink_depth: MAX_SYMLINK_DEPTH,
            case_insensitive_keys: host_is_case_insensitive(),
            exclusions: ExclusionFilters::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

#[derive(Debug)]
struct PollingEntry {
    generation: u64,
    token: Arc<dyn PollingChangeToken>,
}

#[derive(Debug)]
struct RegistryShared {
    root: PathBuf,
    options: WatchOptions,
    context: PollingContext,
    entries: DashMap<WatchKey, PollingEntry>,
    cancellations: DashMap<WatchKey, CancellationChangeToken>,
    timer: Mutex<Option<PollingTimer>>,
    disposed: AtomicBool,
    next_generation: AtomicU64,
}

impl RegistryShared {
    fn tick(&self) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }

        let snapshot: Vec<(WatchKey, u64, Arc<dyn PollingChangeToken>)> = self
            .entries
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().generation,
                    Arc::clone(&entry.value().token),
                )
            })
            .collect();

        for (key, generation, token) in snapshot {
            if !token.has_changed() {
                continue;
            }
            // a concurrent watch may already have replaced the fired entry
            if let Entry::Occupied(occupied) = self.entries.entry(key) {
                if occupied.get().generation == generation {
                    // every composite holding this cancellation already reports a change
                    self.cancellations.remove(occupied.key());
                    let (key, _) = occupied.remove_entry();
                    debug!("Evicted fired token for {}", key.as_str());
                }
            }
        }
    }

    /// The key's cancellation token; callers hold the key's `entries` shard
    /// lock so eviction in [`tick`](Self::tick) cannot interleave
    fn cancellation_for(&self, key: &WatchKey) -> CancellationChangeToken {
        self.cancellations
            .entry(key.clone())
            .or_default()
            .value()
            .clone()
    }
}

/// Owner of the key → token map and the shared polling timer
#[derive(Debug)]
pub struct PollingRegistry {
    shared: Arc<RegistryShared>,
}

impl PollingRegistry {
    pub fn new(root: impl Into<PathBuf>, options: WatchOptions) -> Self {
        let context = PollingContext::new(
            options.resolver(),
            Arc::clone(&options.clock),
            options.polling_interval,
        );
        Self {
            shared: Arc::new(RegistryShared {
                root: root.into(),
                options,
                context,
                entries: DashMap::new(),
                cancellations: DashMap::new(),
                timer: Mutex::new(None),
                disposed: AtomicBool::new(false),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.shared.root
    }

    pub fn options(&self) -> &WatchOptions {
        &self.shared.options
    }

    /// Watch a root-relative path or glob pattern
    ///
    /// Keys that are empty, absolute, escape the root, or carry invalid
    /// characters yield [`ChangeToken::Null`], as does any watch after
    /// [`dispose`](Self::dispose). Every call returns its own composite of
    /// the key's cancellation token and the shared polling token.
    pub fn watch(&self, filter: &str) -> ChangeToken {
        if self.is_disposed() {
            return ChangeToken::Null;
        }
        let Some(key) = WatchKey::parse(filter, self.shared.options.case_insensitive_keys) else {
            debug!("Ignoring unwatchable key {:?}", filter);
            return ChangeToken::Null;
        };
        let Some((polling, cancellation)) = self.tokens_for(&key) else {
            return ChangeToken::Null;
        };

        self.ensure_timer();
        ChangeToken::composite(vec![cancellation.into(), ChangeToken::Polling(polling)])
    }

    /// Fire every token handed out for `filter`, as if its target changed
    ///
    /// Returns false if no watch is outstanding for the key.
    pub fn invalidate(&self, filter: &str) -> bool {
        let Some(key) = WatchKey::parse(filter, self.shared.options.case_insensitive_keys) else {
            return false;
        };
        match self.shared.cancellations.remove(&key) {
            Some((key, cancellation)) => {
                debug!("Invalidating watches for {}", key.as_str());
                cancellation.cancel();
                true
            }
            None => false,
        }
    }

    /// Polling entries still waiting to fire or be evicted
    pub fn active_tokens(&self) -> usize {
        self.shared.entries.len()
    }

    pub fn is_timer_running(&self) -> bool {
        self.shared
            .timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    /// Run one evaluation pass now, as the timer would
    pub fn poll_now(&self) {
        self.shared.tick();
    }

    /// Stop the timer and freeze every outstanding token; idempotent
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.context.freeze();
        let timer = self
            .shared
            .timer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(mut timer) = timer {
            timer.stop();
        }
        self.shared.entries.clear();
        self.shared.cancellations.clear();
        info!("Disposed polling registry for {}", self.shared.root.display());
    }

    fn tokens_for(
        &self,
        key: &WatchKey,
    ) -> Option<(Arc<dyn PollingChangeToken>, CancellationChangeToken)> {
        if let Some(entry) = self.shared.entries.get(key) {
            if !entry.token.signal().is_fired() {
                return Some((Arc::clone(&entry.token), self.shared.cancellation_for(key)));
            }
        }

        // construction does I/O, keep it outside the map's shard lock
        let fresh = self.create_token(key)?;
        let generation = self.shared.next_generation.fetch_add(1, Ordering::Relaxed);
        let tokens = match self.shared.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().token.signal().is_fired() {
                    occupied.insert(PollingEntry {
                        generation,
                        token: Arc::clone(&fresh),
                    });
                    (fresh, self.shared.cancellation_for(key))
                } else {
                    (
                        Arc::clone(&occupied.get().token),
                        self.shared.cancellation_for(key),
                    )
                }
            }
            Entry::Vacant(vacant) => {
                let cancellation = self.shared.cancellation_for(key);
                vacant.insert(PollingEntry {
                    generation,
                    token: Arc::clone(&fresh),
                });
                (fresh, cancellation)
            }
        };
        Some(tokens)
    }

    fn create_token(&self, key: &WatchKey) -> Option<Arc<dyn PollingChangeToken>> {
        let context = self.shared.context.clone();
        if key.is_wildcard() {
            match PollingWildcardChangeToken::new(
                &self.shared.root,
                key.as_str(),
                self.shared.options.exclusions,
                self.shared.options.case_insensitive_keys,
                context,
            ) {
                Ok(token) => Some(Arc::new(token)),
                Err(e) => {
                    debug!("Rejecting glob {:?}: {}", key.as_str(), e);
                    None
                }
            }
        } else {
            let path = key
                .as_str()
                .split('/')
                .filter(|segment| !segment.is_empty())
                .fold(self.shared.root.clone(), |path, segment| path.join(segment));
            Some(Arc::new(PollingFileChangeToken::new(path, context)))
        }
    }

    fn ensure_timer(&self) {
        let mut timer = self.shared.timer.lock().unwrap_or_else(|e| e.into_inner());
        if timer.is_some() || self.is_disposed() {
            return;
        }

        let weak: Weak<RegistryShared> = Arc::downgrade(&self.shared);
        match PollingTimer::start(self.shared.options.polling_interval, move || {
            if let Some(shared) = weak.upgrade() {
                shared.tick();
            }
        }) {
            Ok(started) => *timer = Some(started),
            Err(e) => warn!("Could not start polling timer, tokens advance only when read: {}", e),
        }
    }
}

impl Drop for PollingRegistry {
    fn drop(&mut self) {
        self.dispose();
    }
}
