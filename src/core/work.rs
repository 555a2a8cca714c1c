//! Shared work handle and per-attempt execution context.
//!
//! An [`AsyncWork`] wraps a host [`Work`] body with everything the hubs need to
//! track it: identity, progress/speed meters, lifecycle phase and outcome.
//! Handles are cheap clones of one shared state, which is how key-based reuse
//! hands the same execution to several submitters.
//!
//! # Lifecycle
//!
//! ```text
//! Pending ──start──▶ Running ──attempt ends──▶ Settled ──finalize──▶ Done
//!                       ▲                         │
//!                       └────────── retry ────────┘
//! ```
//!
//! `Settled` only exists while a hub tracks the work: the hub decides whether
//! to retry or finalize, so consumers never see a retried failure as `Done`.
//! Standalone execution goes straight from `Running` to `Done`.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{AbortHandle, AbortRegistration, Abortable, BoxFuture};
use futures::FutureExt;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{Spawn, Work, WorkError, WorkOutput};
use crate::runtime::api::WorkSnapshot;

/// Process-unique work identifier (distinct from the dedup key).
pub type WorkId = u64;

static NEXT_WORK_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle phase of a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkPhase {
    /// Created, not started.
    Pending,
    /// One execution attempt is in flight.
    Running,
    /// An attempt concluded; the owning hub has not decided retry vs. finalize.
    Settled,
    /// Terminal. Result or error is available.
    Done,
}

impl WorkPhase {
    /// True once the latest attempt has concluded.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Settled | Self::Done)
    }
}

/// Progress state shared between a handle and its running attempt.
///
/// The generation lives under the same lock as the readings, so a superseded
/// attempt can never overwrite the values of the attempt that replaced it.
#[derive(Debug, Default)]
struct Meter {
    reading: Mutex<Reading>,
    aborted: AtomicBool,
}

#[derive(Debug, Default, Clone, Copy)]
struct Reading {
    generation: u64,
    progress: f32,
    speed: f64,
}

impl Meter {
    fn reset(&self, generation: u64) {
        *self.reading.lock() = Reading {
            generation,
            ..Reading::default()
        };
    }

    /// Apply `update` only while `generation` is the current attempt.
    fn update(&self, generation: u64, update: impl FnOnce(&mut Reading)) {
        let mut reading = self.reading.lock();
        if reading.generation == generation {
            update(&mut reading);
        }
    }

    fn complete(&self) {
        self.reading.lock().progress = 1.0;
    }

    fn generation(&self) -> u64 {
        self.reading.lock().generation
    }

    fn progress(&self) -> f32 {
        self.reading.lock().progress
    }

    fn speed(&self) -> f64 {
        self.reading.lock().speed
    }
}

/// Handle given to a running attempt for reporting progress.
#[derive(Debug, Clone)]
pub struct WorkContext {
    meter: Arc<Meter>,
    generation: u64,
    attempt: u32,
}

impl WorkContext {
    /// One-based number of this attempt (retries increment it).
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Report absolute progress, clamped to `[0, 1]`.
    pub fn set_progress(&self, progress: f32) {
        if progress.is_nan() {
            return;
        }
        self.meter.update(self.generation, |r| r.progress = progress.clamp(0.0, 1.0));
    }

    /// Add to the current progress, clamped to `[0, 1]`.
    pub fn add_progress(&self, delta: f32) {
        if delta.is_nan() {
            return;
        }
        self.meter
            .update(self.generation, |r| r.progress = (r.progress + delta).clamp(0.0, 1.0));
    }

    /// Report throughput in whatever unit the host uses.
    pub fn set_speed(&self, speed: f64) {
        self.meter.update(self.generation, |r| r.speed = speed);
    }

    /// Progress reported so far by this attempt.
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.meter.progress()
    }

    /// True when the work was aborted or this attempt has been superseded.
    ///
    /// Long-running bodies should check this between steps and bail out.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.meter.aborted.load(Ordering::Acquire) || !self.is_current()
    }

    fn is_current(&self) -> bool {
        self.meter.generation() == self.generation
    }
}

/// Mutable per-work state, guarded by one mutex so `Done` is only visible
/// after the outcome is stored.
struct Slot<T> {
    phase: WorkPhase,
    outcome: Option<Result<T, WorkError>>,
    generation: u64,
    managed: bool,
    abort: Option<AbortHandle>,
    from_cache: bool,
}

struct Shared<T> {
    id: WorkId,
    key: String,
    meter: Arc<Meter>,
    attempts: AtomicU32,
    slot: Mutex<Slot<T>>,
    done: Condvar,
}

impl<T> Shared<T> {
    fn new(key: String, phase: WorkPhase, outcome: Option<Result<T, WorkError>>) -> Self {
        Self {
            id: NEXT_WORK_ID.fetch_add(1, Ordering::Relaxed),
            key,
            meter: Arc::new(Meter::default()),
            attempts: AtomicU32::new(0),
            slot: Mutex::new(Slot {
                phase,
                outcome,
                generation: 0,
                managed: false,
                abort: None,
                from_cache: false,
            }),
            done: Condvar::new(),
        }
    }

    /// Record the outcome of attempt `generation`. Stale attempts are ignored.
    fn settle(&self, generation: u64, outcome: Result<T, WorkError>) {
        let mut slot = self.slot.lock();
        if slot.generation != generation || slot.phase != WorkPhase::Running {
            return;
        }
        slot.outcome = Some(outcome);
        slot.abort = None;
        if slot.managed {
            slot.phase = WorkPhase::Settled;
        } else {
            slot.phase = WorkPhase::Done;
            self.done.notify_all();
        }
    }
}

/// Settles the attempt as aborted if its future is dropped before finishing.
struct SettleGuard<T> {
    shared: Arc<Shared<T>>,
    generation: u64,
    armed: bool,
}

impl<T> Drop for SettleGuard<T> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.settle(self.generation, Err(WorkError::Aborted));
        }
    }
}

/// Bookkeeping for one prepared attempt.
struct Attempt {
    generation: u64,
    number: u32,
    registration: AbortRegistration,
}

/// Shared handle to a unit of work.
///
/// Cloning is cheap; all clones observe the same execution.
pub struct AsyncWork<T: WorkOutput> {
    shared: Arc<Shared<T>>,
    job: Option<Arc<dyn Work<Output = T>>>,
}

impl<T: WorkOutput> Clone for AsyncWork<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            job: self.job.clone(),
        }
    }
}

impl<T: WorkOutput> fmt::Debug for AsyncWork<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncWork")
            .field("id", &self.shared.id)
            .field("key", &self.shared.key)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl<T: WorkOutput> AsyncWork<T> {
    /// Wrap a work body. The key comes from [`Work::key`], or a random UUID.
    pub fn new<W>(work: W) -> Self
    where
        W: Work<Output = T>,
    {
        let key = work.key().unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            shared: Arc::new(Shared::new(key, WorkPhase::Pending, None)),
            job: Some(Arc::new(work)),
        }
    }

    /// A handle that is already `Done` with `value`.
    pub fn completed(key: impl Into<String>, value: T) -> Self {
        let shared = Shared::new(key.into(), WorkPhase::Done, Some(Ok(value)));
        shared.meter.complete();
        Self {
            shared: Arc::new(shared),
            job: None,
        }
    }

    /// Process-unique identifier.
    #[must_use]
    pub fn id(&self) -> WorkId {
        self.shared.id
    }

    /// Dedup/reuse key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.shared.key
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> WorkPhase {
        self.shared.slot.lock().phase
    }

    /// True once the work is terminal.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.phase() == WorkPhase::Done
    }

    /// Progress in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.shared.meter.progress()
    }

    /// Last reported speed.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.shared.meter.speed()
    }

    /// Number of execution attempts started so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::Acquire)
    }

    /// True once [`abort`](Self::abort) was called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.shared.meter.aborted.load(Ordering::Acquire)
    }

    /// True when the result was served from a result cache instead of executing.
    #[must_use]
    pub fn is_from_cache(&self) -> bool {
        self.shared.slot.lock().from_cache
    }

    /// Successful result, once `Done`.
    #[must_use]
    pub fn result(&self) -> Option<T> {
        let slot = self.shared.slot.lock();
        if slot.phase != WorkPhase::Done {
            return None;
        }
        slot.outcome.as_ref().and_then(|o| o.as_ref().ok().cloned())
    }

    /// Final error, once `Done`.
    #[must_use]
    pub fn error(&self) -> Option<WorkError> {
        let slot = self.shared.slot.lock();
        if slot.phase != WorkPhase::Done {
            return None;
        }
        slot.outcome.as_ref().and_then(|o| o.as_ref().err().cloned())
    }

    /// Final outcome, once `Done`.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<T, WorkError>> {
        let slot = self.shared.slot.lock();
        if slot.phase != WorkPhase::Done {
            return None;
        }
        slot.outcome.clone()
    }

    /// True when both handles refer to the same work.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Execute the body on the current task and return the outcome.
    ///
    /// Only a `Pending` work runs; otherwise this returns whatever outcome is
    /// available without executing anything.
    pub async fn execute(&self) -> Option<Result<T, WorkError>> {
        if let Some(attempt) = self.prepare(false) {
            self.attempt_future(attempt).await;
        }
        self.outcome()
    }

    /// Start the body in the background. Returns false if the work is not
    /// `Pending`.
    pub fn execute_async(&self, spawner: &dyn Spawn) -> bool {
        match self.prepare(false) {
            Some(attempt) => {
                spawner.spawn(self.attempt_future(attempt));
                true
            }
            None => false,
        }
    }

    /// Abort the work.
    ///
    /// A pending work becomes `Done` with [`WorkError::Aborted`]. A running
    /// body sees [`WorkContext::is_aborted`] and its future is dropped at the
    /// next suspension point; the attempt then concludes as aborted.
    pub fn abort(&self) {
        self.shared.meter.aborted.store(true, Ordering::Release);
        let mut slot = self.shared.slot.lock();
        match slot.phase {
            WorkPhase::Pending => {
                slot.outcome = Some(Err(WorkError::Aborted));
                slot.phase = WorkPhase::Done;
                self.shared.done.notify_all();
            }
            WorkPhase::Running => {
                if let Some(handle) = slot.abort.take() {
                    handle.abort();
                }
            }
            WorkPhase::Settled | WorkPhase::Done => {}
        }
    }

    /// Block until the work is `Done` or the timeout elapses.
    ///
    /// A timeout too large to represent as a deadline waits indefinitely.
    pub fn wait_done(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.shared.slot.lock();
        while slot.phase != WorkPhase::Done {
            match deadline {
                Some(deadline) => {
                    if self.shared.done.wait_until(&mut slot, deadline).timed_out() {
                        return slot.phase == WorkPhase::Done;
                    }
                }
                None => self.shared.done.wait(&mut slot),
            }
        }
        true
    }

    /// Serializable view of the current state.
    #[must_use]
    pub fn snapshot(&self) -> WorkSnapshot {
        let slot = self.shared.slot.lock();
        let error = match &slot.outcome {
            Some(Err(err)) if slot.phase == WorkPhase::Done => Some(err.to_string()),
            _ => None,
        };
        WorkSnapshot {
            id: self.shared.id,
            key: self.shared.key.clone(),
            phase: slot.phase,
            progress: self.progress(),
            speed: self.speed(),
            attempts: self.attempts(),
            from_cache: slot.from_cache,
            error,
        }
    }

    /// Start an attempt on behalf of a hub (admission or retry).
    pub(crate) fn start(&self, spawner: &dyn Spawn) -> bool {
        match self.prepare(true) {
            Some(attempt) => {
                debug!(work_id = self.id(), key = %self.key(), attempt = attempt.number, "work started");
                spawner.spawn(self.attempt_future(attempt));
                true
            }
            None => false,
        }
    }

    /// Error of the concluded attempt awaiting a hub decision, if it failed.
    pub(crate) fn settled_error(&self) -> Option<WorkError> {
        let slot = self.shared.slot.lock();
        if slot.phase != WorkPhase::Settled {
            return None;
        }
        slot.outcome.as_ref().and_then(|o| o.as_ref().err().cloned())
    }

    /// Successful value of the latest attempt, whether `Settled` or `Done`.
    pub(crate) fn settled_value(&self) -> Option<T> {
        let slot = self.shared.slot.lock();
        if !slot.phase.is_finished() {
            return None;
        }
        slot.outcome.as_ref().and_then(|o| o.as_ref().ok().cloned())
    }

    /// Make a settled work terminal and wake waiters.
    pub(crate) fn finalize(&self) {
        let mut slot = self.shared.slot.lock();
        if slot.phase == WorkPhase::Settled {
            slot.phase = WorkPhase::Done;
            self.shared.done.notify_all();
        }
    }

    /// Stop hub tracking: the current attempt, when it concludes, goes
    /// straight to `Done`.
    pub(crate) fn release(&self) {
        let mut slot = self.shared.slot.lock();
        slot.managed = false;
        if slot.phase == WorkPhase::Settled {
            slot.phase = WorkPhase::Done;
            self.shared.done.notify_all();
        }
    }

    /// Complete a pending work with a cached value instead of executing it.
    pub(crate) fn complete_from_cache(&self, value: T) -> bool {
        let mut slot = self.shared.slot.lock();
        if slot.phase != WorkPhase::Pending {
            return false;
        }
        slot.outcome = Some(Ok(value));
        slot.from_cache = true;
        slot.phase = WorkPhase::Done;
        self.shared.meter.complete();
        self.shared.done.notify_all();
        true
    }

    fn prepare(&self, managed: bool) -> Option<Attempt> {
        let mut slot = self.shared.slot.lock();
        let startable = match slot.phase {
            WorkPhase::Pending => true,
            WorkPhase::Settled => managed,
            WorkPhase::Running | WorkPhase::Done => false,
        };
        if !startable {
            return None;
        }
        slot.generation += 1;
        let generation = slot.generation;
        let (handle, registration) = AbortHandle::new_pair();
        slot.phase = WorkPhase::Running;
        slot.outcome = None;
        slot.managed = managed;
        slot.abort = Some(handle);
        self.shared.meter.reset(generation);
        let number = self.shared.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        Some(Attempt {
            generation,
            number,
            registration,
        })
    }

    fn attempt_future(&self, attempt: Attempt) -> BoxFuture<'static, ()> {
        let shared = Arc::clone(&self.shared);
        let job = self.job.clone();
        let generation = attempt.generation;
        let guard = SettleGuard {
            shared: Arc::clone(&shared),
            generation,
            armed: true,
        };
        let ctx = WorkContext {
            meter: Arc::clone(&shared.meter),
            generation,
            attempt: attempt.number,
        };

        let body = async move {
            let mut guard = guard;
            let outcome = match job {
                Some(job) => match AssertUnwindSafe(job.execute(&ctx)).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(payload) => Err(WorkError::Panicked(panic_message(payload.as_ref()))),
                },
                None => Err(WorkError::Other("work has no body to execute".into())),
            };
            guard.armed = false;
            shared.settle(generation, outcome);
        };

        Abortable::new(body, attempt.registration).map(|_| ()).boxed()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
