//! Background polling timer

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::core::constants::TIMER_THREAD_NAME;

/// Periodic tick on a dedicated thread; first tick fires immediately
///
/// The thread drives a current-thread tokio runtime so callers need not be
/// inside a runtime themselves.
#[derive(Debug)]
pub struct PollingTimer {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    period: Duration,
}

impl PollingTimer {
    pub fn start<F>(period: Duration, tick: F) -> io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let handle = thread::Builder::new()
            .name(TIMER_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let mut interval = tokio::time::interval(period);
                    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

                    loop {
                        tokio::select! {
                            _ = &mut shutdown_rx => break,
                            _ = interval.tick() => {
                                if std::panic::catch_unwind(std::panic::AssertUnwindSafe(&tick)).is_err() {
                                    warn!("Polling tick panicked; continuing");
                                }
                            }
                        }
                    }
                });
                debug!("Polling timer thread exiting");
            })?;

        info!("Started polling timer with period {:?}", period);
        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
            period,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stop ticking; waits for an in-flight tick unless called from the tick itself
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            warn!("Polling timer thread panicked");
        }
        info!("Stopped polling timer");
    }
}

impl Drop for PollingTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
