//! Bounded-concurrency work hub.
//!
//! The hub owns a FIFO waiting queue and a working set. Every tick:
//!
//! 1. **Admission**: while a slot is free, the queue head is started. Works that
//!    are already `Done` (pre-completed by a cache layer, aborted while queued)
//!    are finalized right away without consuming a slot.
//! 2. **Completion**: every working item whose attempt concluded is either
//!    restarted in place (failure the resolver accepts) or removed and
//!    finalized.
//!
//! Finalization clears the retry ledger entry, notifies the observer, and only
//! then makes the work `Done`. It runs after the state lock is released, so
//! observers may call back into the hub.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::cruiser::{Cruiser, Tick, DEFAULT_INTERVAL_MS};
use super::{AsyncWork, ErrorKind, HubError, RetryResolver, Spawn, Work, WorkOutput, WorkPhase};
use crate::runtime::api::HubSnapshot;
use crate::util::clock::now_ms;

/// Default concurrency ceiling of a bare [`WorkHub`].
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Hook for layers wrapping a [`WorkHub`].
///
/// Called from the tick with no hub lock held.
pub trait WorkObserver<T: WorkOutput>: Send + Sync {
    /// A work left the hub. Its outcome is readable but it is not `Done` yet.
    fn on_finalized(&self, work: &AsyncWork<T>);

    /// End of every tick.
    fn on_tick(&self) {}
}

/// Operations shared by every hub layer.
pub trait HubControl {
    /// Ceiling on simultaneously executing works.
    fn concurrency(&self) -> usize;
    /// Change the ceiling. Running works are never preempted.
    fn set_concurrency(&self, concurrency: usize);
    /// Works waiting for a slot.
    fn waitings(&self) -> usize;
    /// Works currently holding a slot.
    fn workings(&self) -> usize;
    /// Tick interval.
    fn interval(&self) -> Duration;
    /// Change the tick interval, effective from the next sleep.
    fn set_interval(&self, interval: Duration);
    /// Whether the background tick loop runs.
    fn is_active(&self) -> bool;
    /// Start the background tick loop.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::CruiserStart`] if the tick thread cannot be spawned.
    fn activate(&self) -> Result<(), HubError>;
    /// Stop the background tick loop after its current tick.
    fn deactivate(&self);
    /// Stop ticking. Executing works keep running unless they are cleared.
    fn abort(&self) {
        self.deactivate();
    }
    /// Stop tracking executing works and/or discard queued ones.
    fn clear(&self, workings: bool, waitings: bool);
    /// Run one tick on the calling thread.
    fn tick(&self);
    /// Serializable view of the hub.
    fn snapshot(&self) -> HubSnapshot;
}

struct Queues<T: WorkOutput> {
    waiting: VecDeque<AsyncWork<T>>,
    working: Vec<AsyncWork<T>>,
}

/// Works dropped by a [`WorkHub::clear_tracked`] call.
pub(crate) struct Cleared<T: WorkOutput> {
    pub(crate) working: Vec<AsyncWork<T>>,
    pub(crate) waiting: Vec<AsyncWork<T>>,
}

pub(crate) struct HubCore<T: WorkOutput> {
    state: Mutex<Queues<T>>,
    concurrency: AtomicUsize,
    resolver: Mutex<Option<Box<dyn RetryResolver>>>,
    observer: Option<Arc<dyn WorkObserver<T>>>,
    spawner: Arc<dyn Spawn>,
    /// Serializes manual and cruiser ticks.
    ticking: Mutex<()>,
}

impl<T: WorkOutput> HubCore<T> {
    fn run_tick(&self) {
        let _ticking = self.ticking.lock();
        let finished = {
            let mut state = self.state.lock();
            let mut finished = self.admit(&mut state);
            finished.extend(self.collect_completed(&mut state));
            finished
        };

        for work in finished {
            self.finalize(&work);
        }
        if let Some(observer) = &self.observer {
            observer.on_tick();
        }
    }

    fn admit(&self, state: &mut Queues<T>) -> Vec<AsyncWork<T>> {
        let concurrency = self.concurrency.load(Ordering::Acquire);
        let mut finished = Vec::new();
        while state.working.len() < concurrency {
            let Some(work) = state.waiting.pop_front() else {
                break;
            };
            if work.is_done() {
                finished.push(work);
                continue;
            }
            if state.working.iter().any(|w| w.ptr_eq(&work)) {
                trace!(work_id = work.id(), "work already holds a slot; dropping duplicate");
                continue;
            }
            if !work.start(self.spawner.as_ref()) {
                trace!(work_id = work.id(), phase = ?work.phase(), "work already started elsewhere; tracking it");
            }
            state.working.push(work);
        }
        finished
    }

    fn collect_completed(&self, state: &mut Queues<T>) -> Vec<AsyncWork<T>> {
        let mut resolver = self.resolver.lock();
        let mut finished = Vec::new();
        let mut index = 0;
        while index < state.working.len() {
            let work = &state.working[index];
            match work.phase() {
                WorkPhase::Pending | WorkPhase::Running => {
                    index += 1;
                    continue;
                }
                WorkPhase::Settled => {
                    if let Some(error) = work.settled_error() {
                        let retry = !work.is_aborted()
                            && error.kind() != ErrorKind::Aborted
                            && resolver
                                .as_mut()
                                .is_some_and(|r| r.retryable(work.id(), &error));
                        if retry {
                            warn!(work_id = work.id(), key = %work.key(), error = %error, "work failed; retrying");
                            if work.start(self.spawner.as_ref()) {
                                index += 1;
                                continue;
                            }
                        }
                    }
                }
                WorkPhase::Done => {}
            }
            finished.push(state.working.remove(index));
        }
        finished
    }

    fn finalize(&self, work: &AsyncWork<T>) {
        if let Some(resolver) = self.resolver.lock().as_mut() {
            resolver.clear(work.id());
        }
        if let Some(observer) = &self.observer {
            observer.on_finalized(work);
        }
        work.finalize();
        debug!(work_id = work.id(), key = %work.key(), attempts = work.attempts(), "work finalized");
    }

    fn enqueue(&self, work: AsyncWork<T>) {
        trace!(work_id = work.id(), key = %work.key(), "work enqueued");
        self.state.lock().waiting.push_back(work);
    }

    fn clear(&self, workings: bool, waitings: bool) -> Cleared<T> {
        let cleared = {
            let mut state = self.state.lock();
            let working: Vec<_> = if workings {
                state.working.drain(..).collect()
            } else {
                Vec::new()
            };
            let waiting: Vec<_> = if waitings {
                state.waiting.drain(..).collect()
            } else {
                Vec::new()
            };
            if workings {
                if let Some(resolver) = self.resolver.lock().as_mut() {
                    resolver.clear_all();
                }
            }
            Cleared { working, waiting }
        };

        for work in cleared.working.iter().chain(&cleared.waiting) {
            work.abort();
            work.release();
        }
        if !cleared.working.is_empty() || !cleared.waiting.is_empty() {
            warn!(
                workings = cleared.working.len(),
                waitings = cleared.waiting.len(),
                "hub cleared; dropped works aborted"
            );
        }
        cleared
    }
}

impl<T: WorkOutput> Tick for HubCore<T> {
    fn tick(&self) {
        self.run_tick();
    }
}

/// Tick-driven scheduler with a concurrency ceiling and optional retries.
///
/// # Example
///
/// ```rust,ignore
/// use prometheus_work_hub::core::{HubControl, TolerableErrorResolver, WorkHub};
/// use prometheus_work_hub::runtime::ThreadSpawner;
///
/// let hub = WorkHub::new(Arc::new(ThreadSpawner::new()))
///     .with_concurrency(4)
///     .with_resolver(Box::new(TolerableErrorResolver::any_error(3)));
/// hub.activate()?;
/// let work = hub.enqueue(FetchTile { url });
/// work.wait_done(Duration::from_secs(5));
/// ```
pub struct WorkHub<T: WorkOutput> {
    core: Arc<HubCore<T>>,
    cruiser: Cruiser,
}

impl<T: WorkOutput> WorkHub<T> {
    /// Hub ticking every 250 ms with a concurrency of 3 and no retries.
    #[must_use]
    pub fn new(spawner: Arc<dyn Spawn>) -> Self {
        Self::build(spawner, None)
    }

    /// Hub reporting finalized works to `observer`.
    #[must_use]
    pub fn observed(spawner: Arc<dyn Spawn>, observer: Arc<dyn WorkObserver<T>>) -> Self {
        Self::build(spawner, Some(observer))
    }

    fn build(spawner: Arc<dyn Spawn>, observer: Option<Arc<dyn WorkObserver<T>>>) -> Self {
        Self {
            core: Arc::new(HubCore {
                state: Mutex::new(Queues {
                    waiting: VecDeque::new(),
                    working: Vec::new(),
                }),
                concurrency: AtomicUsize::new(DEFAULT_CONCURRENCY),
                resolver: Mutex::new(None),
                observer,
                spawner,
                ticking: Mutex::new(()),
            }),
            cruiser: Cruiser::new("work-hub-cruiser", Duration::from_millis(DEFAULT_INTERVAL_MS)),
        }
    }

    /// Set the tick interval.
    #[must_use]
    pub fn with_interval(self, interval: Duration) -> Self {
        self.cruiser.set_interval(interval);
        self
    }

    /// Set the concurrency ceiling.
    #[must_use]
    pub fn with_concurrency(self, concurrency: usize) -> Self {
        self.set_concurrency(concurrency);
        self
    }

    /// Install a retry policy.
    #[must_use]
    pub fn with_resolver(self, resolver: Box<dyn RetryResolver>) -> Self {
        self.set_resolver(Some(resolver));
        self
    }

    /// Replace the retry policy. `None` disables retries.
    pub fn set_resolver(&self, resolver: Option<Box<dyn RetryResolver>>) {
        *self.core.resolver.lock() = resolver;
    }

    /// Entries currently held by the retry ledger.
    #[must_use]
    pub fn retry_ledger_len(&self) -> usize {
        self.core.resolver.lock().as_ref().map_or(0, |r| r.len())
    }

    /// Wrap `work` and queue it. Returns the handle for observing it.
    pub fn enqueue<W>(&self, work: W) -> AsyncWork<T>
    where
        W: Work<Output = T>,
    {
        self.enqueue_handle(AsyncWork::new(work))
    }

    /// Queue an existing handle. Returns it for chaining.
    pub fn enqueue_handle(&self, work: AsyncWork<T>) -> AsyncWork<T> {
        self.core.enqueue(work.clone());
        work
    }

    /// Same as [`HubControl::clear`] but hands back the dropped works.
    pub(crate) fn clear_tracked(&self, workings: bool, waitings: bool) -> Cleared<T> {
        self.core.clear(workings, waitings)
    }
}

impl<T: WorkOutput> HubControl for WorkHub<T> {
    fn concurrency(&self) -> usize {
        self.core.concurrency.load(Ordering::Acquire)
    }

    fn set_concurrency(&self, concurrency: usize) {
        self.core.concurrency.store(concurrency, Ordering::Release);
    }

    fn waitings(&self) -> usize {
        self.core.state.lock().waiting.len()
    }

    fn workings(&self) -> usize {
        self.core.state.lock().working.len()
    }

    fn interval(&self) -> Duration {
        self.cruiser.interval()
    }

    fn set_interval(&self, interval: Duration) {
        self.cruiser.set_interval(interval);
    }

    fn is_active(&self) -> bool {
        self.cruiser.is_active()
    }

    fn activate(&self) -> Result<(), HubError> {
        let target: Arc<dyn Tick> = self.core.clone();
        self.cruiser.activate(target)
    }

    fn deactivate(&self) {
        self.cruiser.deactivate();
    }

    fn clear(&self, workings: bool, waitings: bool) {
        self.core.clear(workings, waitings);
    }

    fn tick(&self) {
        self.core.run_tick();
    }

    fn snapshot(&self) -> HubSnapshot {
        let (waitings, workings) = {
            let state = self.core.state.lock();
            (state.waiting.len(), state.working.len())
        };
        HubSnapshot {
            concurrency: self.concurrency(),
            waitings,
            workings,
            active: self.is_active(),
            interval_ms: u64::try_from(self.interval().as_millis()).unwrap_or(u64::MAX),
            retry_ledger: self.retry_ledger_len(),
            taken_at_ms: now_ms(),
        }
    }
}

impl<T: WorkOutput> Drop for WorkHub<T> {
    fn drop(&mut self) {
        self.cruiser.deactivate();
    }
}
