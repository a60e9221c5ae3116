use std::fmt;
use std::sync::{Arc, Mutex};

use super::{CallbackRegistration, ChangeToken, TokenSignal};

struct CompositeInner {
    children: Vec<ChangeToken>,
    signal: Arc<TokenSignal>,
    child_registrations: Mutex<Vec<CallbackRegistration>>,
}

impl Drop for CompositeInner {
    fn drop(&mut self) {
        // long-lived children (the registry's cached tokens) must not keep our forwarders
        let registrations = std::mem::take(
            &mut *self
                .child_registrations
                .lock()
                .unwrap_or_else(|e| e.into_inner()),
        );
        for registration in registrations {
            registration.unregister();
        }
    }
}

/// Fires the first time any child is observed fired
#[derive(Clone)]
pub struct CompositeChangeToken {
    inner: Arc<CompositeInner>,
}

impl CompositeChangeToken {
    pub fn new(children: Vec<ChangeToken>) -> Self {
        let signal = TokenSignal::new();
        let inner = Arc::new(CompositeInner {
            children,
            signal: Arc::clone(&signal),
            child_registrations: Mutex::new(Vec::new()),
        });

        let registrations: Vec<CallbackRegistration> = inner
            .children
            .iter()
            .map(|child| {
                let forward = Arc::downgrade(&signal);
                child.register_callback(move || {
                    if let Some(signal) = forward.upgrade() {
                        signal.fire();
                    }
                })
            })
            .collect();
        *inner
            .child_registrations
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = registrations;

        Self { inner }
    }

    pub fn children(&self) -> &[ChangeToken] {
        &self.inner.children
    }

    /// Short-circuits on the first fired child
    pub fn has_changed(&self) -> bool {
        if self.inner.signal.is_fired() {
            return true;
        }
        if self.inner.children.iter().any(ChangeToken::has_changed) {
            self.inner.signal.fire();
            return true;
        }
        false
    }

    pub(crate) fn signal(&self) -> &Arc<TokenSignal> {
        &self.inner.signal
    }
}

impl fmt::Debug for CompositeChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeChangeToken")
            .field("children", &self.inner.children)
            .field("fired", &self.inner.signal.is_fired())
            .finish()
    }
}
