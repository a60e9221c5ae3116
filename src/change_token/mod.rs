//! Change tokens: one-shot "has the watched target changed" signals
//!
//! Every token moves from pending to fired exactly once and never back.
//! Callers either poll [`ChangeToken::has_changed`] or register a callback
//! that runs at the transition. A callback registered on a token that has
//! already fired runs immediately on the registering thread, so a late
//! subscriber never misses the wakeup.
//!
//! Token kinds:
//! - [`CancellationChangeToken`] fires when someone calls `cancel()`
//! - [`PollingFileChangeToken`] fires when a file's resolved modification time moves
//! - [`PollingWildcardChangeToken`] fires when a glob's match set changes
//! - [`CompositeChangeToken`] fires when any child fires

mod composite;
mod polling_file;
mod polling_wildcard;
mod signal;
mod subscription;

pub use composite::CompositeChangeToken;
pub use polling_file::PollingFileChangeToken;
pub use polling_wildcard::PollingWildcardChangeToken;
pub use signal::{CallbackRegistration, TokenSignal};
pub use subscription::{on_change, ChangeSubscription};

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::core::clock::{SharedClock, SystemClock};
use crate::core::constants::DEFAULT_POLLING_INTERVAL;
use crate::symlink::SymlinkResolver;

/// A token whose state is advanced by re-reading the filesystem
pub trait PollingChangeToken: Send + Sync + fmt::Debug {
    /// Re-evaluate if the debounce interval has elapsed; sticky once true
    fn has_changed(&self) -> bool;

    /// The state machine shared with the token's callbacks
    fn signal(&self) -> &Arc<TokenSignal>;

    /// Path or pattern this token watches
    fn watched(&self) -> &str;
}

/// Everything a polling token needs to evaluate its target
#[derive(Debug, Clone)]
pub struct PollingContext {
    pub resolver: SymlinkResolver,
    pub clock: SharedClock,
    pub interval: Duration,
    frozen: Arc<AtomicBool>,
}

impl PollingContext {
    pub fn new(resolver: SymlinkResolver, clock: SharedClock, interval: Duration) -> Self {
        Self {
            resolver,
            clock,
            interval,
            frozen: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop all tokens sharing this context from doing further I/O
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Resolved modification time, with every failure treated as "missing"
    pub(crate) fn observe_mtime(&self, path: &Path) -> Option<SystemTime> {
        match self.resolver.final_modification_time(path) {
            Ok(mtime) => mtime,
            Err(e) => {
                debug!("Treating {} as missing: {}", path.display(), e);
                None
            }
        }
    }
}

impl Default for PollingContext {
    fn default() -> Self {
        Self::new(
            SymlinkResolver::for_host(),
            Arc::new(SystemClock),
            DEFAULT_POLLING_INTERVAL,
        )
    }
}

/// Token fired by an explicit `cancel()`
#[derive(Debug, Clone)]
pub struct CancellationChangeToken {
    signal: Arc<TokenSignal>,
}

impl CancellationChangeToken {
    pub fn new() -> Self {
        Self {
            signal: TokenSignal::new(),
        }
    }

    /// Fire the token; later calls are no-ops
    pub fn cancel(&self) {
        self.signal.fire();
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_fired()
    }
}

impl Default for CancellationChangeToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Any change token handed to callers
#[derive(Debug, Clone)]
pub enum ChangeToken {
    /// Never fires; returned for rejected watch keys
    Null,
    Cancellation(CancellationChangeToken),
    Polling(Arc<dyn PollingChangeToken>),
    Composite(CompositeChangeToken),
}

impl ChangeToken {
    pub fn composite(children: Vec<ChangeToken>) -> Self {
        ChangeToken::Composite(CompositeChangeToken::new(children))
    }

    /// Sticky: once true, true for every thread from then on
    pub fn has_changed(&self) -> bool {
        match self {
            ChangeToken::Null => false,
            ChangeToken::Cancellation(token) => token.is_cancelled(),
            ChangeToken::Polling(token) => token.has_changed(),
            ChangeToken::Composite(token) => token.has_changed(),
        }
    }

    /// Whether registered callbacks can ever run
    pub fn active_change_callbacks(&self) -> bool {
        !self.is_null()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ChangeToken::Null)
    }

    /// Run `callback` once, at the pending → fired transition
    ///
    /// Runs immediately if the token has already fired. Callbacks on a
    /// [`ChangeToken::Null`] are dropped, since it never fires.
    pub fn register_callback<F>(&self, callback: F) -> CallbackRegistration
    where
        F: FnOnce() + Send + 'static,
    {
        match self.signal() {
            Some(signal) => signal.register(Box::new(callback)),
            None => CallbackRegistration::inert(),
        }
    }

    pub(crate) fn signal(&self) -> Option<&Arc<TokenSignal>> {
        match self {
            ChangeToken::Null => None,
            ChangeToken::Cancellation(token) => Some(&token.signal),
            ChangeToken::Polling(token) => Some(token.signal()),
            ChangeToken::Composite(token) => Some(token.signal()),
        }
    }
}

impl From<CancellationChangeToken> for ChangeToken {
    fn from(token: CancellationChangeToken) -> Self {
        ChangeToken::Cancellation(token)
    }
}

impl From<CompositeChangeToken> for ChangeToken {
    fn from(token: CompositeChangeToken) -> Self {
        ChangeToken::Composite(token)
    }
}
