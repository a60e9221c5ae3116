//! One-way fired flag with at-most-once callbacks

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::warn;

pub(crate) type Callback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct CallbackList {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

/// Pending → fired state machine shared by every token kind
///
/// The transition is a compare-and-swap, so the lazy getter and the
/// background tick can race to fire and exactly one of them runs the
/// callbacks.
#[derive(Default)]
pub struct TokenSignal {
    fired: AtomicBool,
    callbacks: Mutex<CallbackList>,
}

impl TokenSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Flip to fired and run registered callbacks on the calling thread
    ///
    /// Returns true only for the call that performed the transition.
    pub fn fire(&self) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let entries = {
            let mut list = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut list.entries)
        };
        for (id, callback) in entries {
            if catch_unwind(AssertUnwindSafe(callback)).is_err() {
                warn!("Change callback {} panicked", id);
            }
        }
        true
    }

    /// Register `callback`; runs it immediately if already fired
    pub(crate) fn register(self: &Arc<Self>, callback: Callback) -> CallbackRegistration {
        {
            let mut list = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
            if !self.is_fired() {
                let id = list.next_id;
                list.next_id += 1;
                list.entries.push((id, callback));
                return CallbackRegistration {
                    signal: Arc::downgrade(self),
                    id: Some(id),
                };
            }
        }

        callback();
        CallbackRegistration::inert()
    }

    fn unregister(&self, id: u64) {
        let mut list = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
        list.entries.retain(|(entry_id, _)| *entry_id != id);
    }

    pub(crate) fn pending_callbacks(&self) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }
}

impl fmt::Debug for TokenSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSignal")
            .field("fired", &self.is_fired())
            .field("pending_callbacks", &self.pending_callbacks())
            .finish()
    }
}

/// Handle to a registered change callback
///
/// Dropping the handle keeps the callback registered; call
/// [`CallbackRegistration::unregister`] to release it early.
#[derive(Debug)]
#[must_use = "dropping the registration keeps the callback; call unregister() to release it"]
pub struct CallbackRegistration {
    signal: Weak<TokenSignal>,
    id: Option<u64>,
}

impl CallbackRegistration {
    /// Registration that refers to nothing
    pub fn inert() -> Self {
        Self {
            signal: Weak::new(),
            id: None,
        }
    }

    /// False when the callback already ran or the token can never fire
    pub fn is_active(&self) -> bool {
        self.id.is_some() && self.signal.upgrade().is_some_and(|s| !s.is_fired())
    }

    /// Remove the callback if it has not run yet
    pub fn unregister(self) {
        if let (Some(id), Some(signal)) = (self.id, self.signal.upgrade()) {
            signal.unregister(id);
        }
    }
}
