use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{CallbackRegistration, ChangeToken};

type Producer = Box<dyn Fn() -> ChangeToken + Send + Sync>;
type Consumer = Box<dyn Fn() + Send + Sync>;

struct SubscriptionState {
    producer: Producer,
    consumer: Consumer,
    stopped: AtomicBool,
    /// Bumped by every arm; only the newest arm may fill `current`
    epoch: AtomicU64,
    current: Mutex<Option<(ChangeToken, CallbackRegistration)>>,
}

/// Keeps a re-arming change subscription alive
///
/// Dropping it stops re-arming and releases the current token.
pub struct ChangeSubscription {
    state: Arc<SubscriptionState>,
}

impl ChangeSubscription {
    /// Stop reacting to further changes
    pub fn stop(&self) {
        self.state.stopped.store(true, Ordering::Release);
        let current = self
            .state
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some((_, registration)) = current {
            registration.unregister();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::Acquire)
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSubscription")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Call `consumer` on every change, re-arming with a fresh token from `producer`
///
/// Change tokens are one-shot; this is the loop that turns them into a
/// standing subscription.
pub fn on_change<P, C>(producer: P, consumer: C) -> ChangeSubscription
where
    P: Fn() -> ChangeToken + Send + Sync + 'static,
    C: Fn() + Send + Sync + 'static,
{
    let state = Arc::new(SubscriptionState {
        producer: Box::new(producer),
        consumer: Box::new(consumer),
        stopped: AtomicBool::new(false),
        epoch: AtomicU64::new(0),
        current: Mutex::new(None),
    });
    arm(&state);
    ChangeSubscription { state }
}

fn arm(state: &Arc<SubscriptionState>) {
    if state.stopped.load(Ordering::Acquire) {
        return;
    }

    let epoch = state.epoch.fetch_add(1, Ordering::AcqRel) + 1;
    let token = (state.producer)();
    if token.is_null() {
        debug!("Change subscription producer returned a null token");
    }

    let weak = Arc::downgrade(state);
    let registration = token.register_callback(move || {
        let Some(state) = weak.upgrade() else {
            return;
        };
        if state.stopped.load(Ordering::Acquire) {
            return;
        }
        (state.consumer)();
        arm(&state);
    });

    install(state, epoch, token, registration);
}

/// Park the armed token unless it fired meanwhile and a newer arm took over
fn install(
    state: &SubscriptionState,
    epoch: u64,
    token: ChangeToken,
    registration: CallbackRegistration,
) {
    let mut current = state.current.lock().unwrap_or_else(|e| e.into_inner());
    let superseded = state.epoch.load(Ordering::Acquire) != epoch;
    if superseded || !registration.is_active() || state.stopped.load(Ordering::Acquire) {
        drop(current);
        return;
    }
    let previous = current.replace((token, registration));
    drop(current);
    drop(previous);
}
