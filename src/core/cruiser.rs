//! Periodic tick driver.
//!
//! A [`Cruiser`] owns one dedicated OS thread that calls [`Tick::tick`], then
//! sleeps for the configured interval, until deactivated.
//!
//! # Design Principles
//!
//! - **Cancellation, not termination**: deactivation drops the stop sender; the
//!   loop notices after its current tick and exits on its own
//! - **Ticks never overlap**: one thread, one tick at a time
//! - **A bad tick is not fatal**: panics are caught and logged, the loop goes on

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::HubError;

/// Default tick interval in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 250;

/// Work performed on every cruiser cycle.
pub trait Tick: Send + Sync + 'static {
    /// Run one cycle. Must not block for long; it delays the next cycle.
    fn tick(&self);
}

struct Run {
    /// Dropping the sender disconnects the channel and stops the loop.
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives a [`Tick`] target on a background thread.
pub struct Cruiser {
    name: String,
    interval_ms: Arc<AtomicU64>,
    run: Mutex<Option<Run>>,
}

impl Cruiser {
    /// Create an inactive cruiser whose thread will be called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        let cruiser = Self {
            name: name.into(),
            interval_ms: Arc::new(AtomicU64::new(DEFAULT_INTERVAL_MS)),
            run: Mutex::new(None),
        };
        cruiser.set_interval(interval);
        cruiser
    }

    /// Time slept between ticks.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    /// Change the interval. Applies from the next sleep; clamped to at least 1 ms.
    pub fn set_interval(&self, interval: Duration) {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);
        self.interval_ms.store(ms, Ordering::Relaxed);
    }

    /// Whether the tick thread is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.run
            .lock()
            .as_ref()
            .is_some_and(|run| !run.handle.is_finished())
    }

    /// Start ticking `target`. No-op while already active.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::CruiserStart`] if the thread cannot be spawned.
    pub fn activate(&self, target: Arc<dyn Tick>) -> Result<(), HubError> {
        let mut run = self.run.lock();
        if run.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return Ok(());
        }
        if let Some(stale) = run.take() {
            let _ = stale.handle.join();
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let interval_ms = Arc::clone(&self.interval_ms);
        let name = self.name.clone();
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || cruise(&name, target.as_ref(), &interval_ms, &stop_rx))
            .map_err(HubError::CruiserStart)?;

        info!(cruiser = %self.name, interval_ms = self.interval_ms.load(Ordering::Relaxed), "cruiser activated");
        *run = Some(Run { stop_tx, handle });
        Ok(())
    }

    /// Stop ticking after the current tick. No-op while inactive.
    ///
    /// Waits for the thread to exit unless called from the tick thread itself.
    pub fn deactivate(&self) {
        let Some(Run { stop_tx, handle }) = self.run.lock().take() else {
            return;
        };
        drop(stop_tx);
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            warn!(cruiser = %self.name, "cruiser thread panicked");
        }
        info!(cruiser = %self.name, "cruiser deactivated");
    }
}

impl Drop for Cruiser {
    fn drop(&mut self) {
        // Signal stop but don't join: dropping the run drops the sender.
        if self.run.get_mut().take().is_some() {
            debug!(cruiser = %self.name, "cruiser dropped while active - thread will exit after its tick");
        }
    }
}

fn cruise(name: &str, target: &dyn Tick, interval_ms: &AtomicU64, stop_rx: &Receiver<()>) {
    debug!(cruiser = name, "cruiser loop started");
    loop {
        if panic::catch_unwind(AssertUnwindSafe(|| target.tick())).is_err() {
            error!(cruiser = name, "tick panicked; continuing with next cycle");
        }
        let interval = Duration::from_millis(interval_ms.load(Ordering::Relaxed).max(1));
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!(cruiser = name, "cruiser loop exiting");
}
