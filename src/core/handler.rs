//! Per-key status subscription bridging background execution to a polling
//! consumer.
//!
//! A [`WorkHandler`] never calls its subscribers from the execution or tick
//! threads. The consumer calls [`WorkHandler::notify_status`] (usually through
//! `StatusHub::notify_status`) on its own cadence; each call compares the
//! work's progress and speed with the last notified values and fires the
//! matching callbacks, then fires completion exactly once.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{AsyncWork, WorkError, WorkOutput};

type ProgressCallback = Arc<dyn Fn(f32) + Send + Sync>;
type SpeedCallback = Arc<dyn Fn(f64) + Send + Sync>;
type CompletedCallback<T> = Arc<dyn Fn(&Result<T, WorkError>) + Send + Sync>;

struct Subscribers<T> {
    progress: Vec<ProgressCallback>,
    speed: Vec<SpeedCallback>,
    completed: Vec<CompletedCallback<T>>,
}

struct Inner<T: WorkOutput> {
    work: AsyncWork<T>,
    subscribers: Mutex<Subscribers<T>>,
    last_progress: AtomicU32,
    last_speed: AtomicU64,
    completed: AtomicBool,
    /// Held for the duration of one notification pass.
    notifying: Mutex<()>,
}

/// Status subscription for one work.
///
/// Cloning shares the subscription.
pub struct WorkHandler<T: WorkOutput> {
    inner: Arc<Inner<T>>,
}

impl<T: WorkOutput> Clone for WorkHandler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: WorkOutput> fmt::Debug for WorkHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkHandler")
            .field("work", &self.inner.work)
            .field("completed", &self.is_completed())
            .finish_non_exhaustive()
    }
}

impl<T: WorkOutput> WorkHandler<T> {
    /// Subscription for `work` with no callbacks yet.
    #[must_use]
    pub fn new(work: AsyncWork<T>) -> Self {
        Self {
            inner: Arc::new(Inner {
                work,
                subscribers: Mutex::new(Subscribers {
                    progress: Vec::new(),
                    speed: Vec::new(),
                    completed: Vec::new(),
                }),
                last_progress: AtomicU32::new(0f32.to_bits()),
                last_speed: AtomicU64::new(0f64.to_bits()),
                completed: AtomicBool::new(false),
                notifying: Mutex::new(()),
            }),
        }
    }

    /// Called with the new progress whenever it changed since the last pass.
    pub fn on_progress_changed(&self, callback: impl Fn(f32) + Send + Sync + 'static) -> &Self {
        self.inner.subscribers.lock().progress.push(Arc::new(callback));
        self
    }

    /// Called with the new speed whenever it changed since the last pass.
    pub fn on_speed_changed(&self, callback: impl Fn(f64) + Send + Sync + 'static) -> &Self {
        self.inner.subscribers.lock().speed.push(Arc::new(callback));
        self
    }

    /// Called once with the final outcome.
    ///
    /// If completion was already dispatched, `callback` runs immediately on
    /// the calling thread.
    pub fn on_completed(
        &self,
        callback: impl Fn(&Result<T, WorkError>) + Send + Sync + 'static,
    ) -> &Self {
        {
            let mut subscribers = self.inner.subscribers.lock();
            if !self.is_completed() {
                subscribers.completed.push(Arc::new(callback));
                return self;
            }
        }
        if let Some(outcome) = self.inner.work.outcome() {
            callback(&outcome);
        }
        self
    }

    /// Observed work.
    #[must_use]
    pub fn work(&self) -> &AsyncWork<T> {
        &self.inner.work
    }

    /// Key of the observed work.
    #[must_use]
    pub fn key(&self) -> &str {
        self.inner.work.key()
    }

    /// Abort the observed work.
    pub fn abort(&self) {
        self.inner.work.abort();
    }

    /// Block until the work is `Done` or the timeout elapses.
    pub fn wait_done(&self, timeout: Duration) -> bool {
        self.inner.work.wait_done(timeout)
    }

    /// True once the completion callbacks were dispatched.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// True when both handlers are the same subscription.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run one notification pass. Returns true once the handler is retired.
    ///
    /// A re-entrant call from inside a callback is skipped.
    pub fn notify_status(&self) -> bool {
        let Some(_notifying) = self.inner.notifying.try_lock() else {
            return false;
        };
        if self.is_completed() {
            return true;
        }

        // Read Done first: progress written before completion is then final.
        let work = &self.inner.work;
        let done = work.is_done();
        let progress = work.progress();
        let speed = work.speed();

        let (on_progress, on_speed) = {
            let subscribers = self.inner.subscribers.lock();
            (subscribers.progress.clone(), subscribers.speed.clone())
        };
        if self.inner.last_progress.swap(progress.to_bits(), Ordering::AcqRel) != progress.to_bits() {
            for callback in &on_progress {
                callback(progress);
            }
        }
        if self.inner.last_speed.swap(speed.to_bits(), Ordering::AcqRel) != speed.to_bits() {
            for callback in &on_speed {
                callback(speed);
            }
        }

        if !done {
            return false;
        }
        let Some(outcome) = work.outcome() else {
            return false;
        };
        let on_completed = {
            let mut subscribers = self.inner.subscribers.lock();
            self.inner.completed.store(true, Ordering::Release);
            std::mem::take(&mut subscribers.completed)
        };
        for callback in &on_completed {
            callback(&outcome);
        }
        true
    }
}
