//! Key-based dedup and result reuse on top of [`WorkHub`].

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::work_hub::{HubControl, WorkHub, WorkObserver};
use super::{AsyncWork, Cacher, HubError, Spawn, Work, WorkOutput};
use crate::runtime::api::HubSnapshot;

type WorkCacher<T> = Box<dyn Cacher<AsyncWork<T>>>;
type ResultCacher<T> = Box<dyn Cacher<T>>;

struct Caches<T: WorkOutput> {
    works: Option<WorkCacher<T>>,
    results: Option<ResultCacher<T>>,
}

/// Both cachers behind one lock, shared with the hub as its observer.
struct CacheLayer<T: WorkOutput> {
    caches: Mutex<Caches<T>>,
}

impl<T: WorkOutput> WorkObserver<T> for CacheLayer<T> {
    fn on_finalized(&self, work: &AsyncWork<T>) {
        let mut caches = self.caches.lock();
        if let Some(works) = caches.works.as_mut() {
            // A newer submission may have taken the key since this work was registered.
            if works.get(work.key()).is_some_and(|cached| cached.ptr_eq(work)) {
                works.remove(work.key());
            }
        }
        if work.is_from_cache() {
            return;
        }
        if let (Some(results), Some(value)) = (caches.results.as_mut(), work.settled_value()) {
            trace!(key = %work.key(), "result cached");
            results.set(work.key(), value);
        }
    }

    fn on_tick(&self) {
        let mut caches = self.caches.lock();
        if let Some(results) = caches.results.as_mut() {
            let swept = results.sweep();
            if swept > 0 {
                trace!(swept, "expired results swept");
            }
        }
    }
}

/// Hub that merges submissions sharing a key.
///
/// A submission whose key matches an in-flight work gets that work's handle
/// back. A submission whose key has a live cached result completes at once
/// without executing. Without cachers this behaves exactly like [`WorkHub`].
pub struct CacheHub<T: WorkOutput> {
    hub: WorkHub<T>,
    layer: Arc<CacheLayer<T>>,
}

impl<T: WorkOutput> CacheHub<T> {
    /// Create a cache hub. Pass `None` to disable either cache.
    #[must_use]
    pub fn new(
        spawner: Arc<dyn Spawn>,
        work_cacher: Option<Box<dyn Cacher<AsyncWork<T>>>>,
        result_cacher: Option<Box<dyn Cacher<T>>>,
    ) -> Self {
        let layer = Arc::new(CacheLayer {
            caches: Mutex::new(Caches {
                works: work_cacher,
                results: result_cacher,
            }),
        });
        let observer: Arc<dyn WorkObserver<T>> = layer.clone();
        Self {
            hub: WorkHub::observed(spawner, observer),
            layer,
        }
    }

    /// Apply `configure` to the underlying [`WorkHub`] builder.
    #[must_use]
    pub fn configure(mut self, configure: impl FnOnce(WorkHub<T>) -> WorkHub<T>) -> Self {
        self.hub = configure(self.hub);
        self
    }

    /// Underlying work hub.
    #[must_use]
    pub const fn work_hub(&self) -> &WorkHub<T> {
        &self.hub
    }

    /// Submit a work body. The returned handle may belong to an earlier
    /// submission of the same key.
    pub fn enqueue<W>(&self, work: W) -> AsyncWork<T>
    where
        W: Work<Output = T>,
    {
        self.enqueue_handle(AsyncWork::new(work))
    }

    /// Submit an existing handle, deduplicating by its key.
    pub fn enqueue_handle(&self, work: AsyncWork<T>) -> AsyncWork<T> {
        let mut caches = self.layer.caches.lock();

        if let Some(works) = caches.works.as_mut() {
            if let Some(existing) = works.get(work.key()) {
                if !existing.is_done() {
                    debug!(key = %work.key(), work_id = existing.id(), "joined in-flight work");
                    return existing;
                }
                works.remove(work.key());
            }
        }

        if let Some(value) = caches.results.as_mut().and_then(|r| r.get(work.key())) {
            if work.complete_from_cache(value) {
                debug!(key = %work.key(), work_id = work.id(), "served from result cache");
                return self.hub.enqueue_handle(work);
            }
        }

        if let Some(works) = caches.works.as_mut() {
            works.set(work.key(), work.clone());
        }
        self.hub.enqueue_handle(work)
    }

    /// Live entries in the work cacher.
    #[must_use]
    pub fn cached_works(&self) -> usize {
        self.layer
            .caches
            .lock()
            .works
            .as_ref()
            .map_or(0, |c| c.len())
    }

    /// Live entries in the result cacher.
    #[must_use]
    pub fn cached_results(&self) -> usize {
        self.layer
            .caches
            .lock()
            .results
            .as_ref()
            .map_or(0, |c| c.len())
    }

    /// Drop every cached result.
    pub fn clear_results(&self) {
        if let Some(results) = self.layer.caches.lock().results.as_mut() {
            results.clear();
        }
    }
}

impl<T: WorkOutput> HubControl for CacheHub<T> {
    fn concurrency(&self) -> usize {
        self.hub.concurrency()
    }

    fn set_concurrency(&self, concurrency: usize) {
        self.hub.set_concurrency(concurrency);
    }

    fn waitings(&self) -> usize {
        self.hub.waitings()
    }

    fn workings(&self) -> usize {
        self.hub.workings()
    }

    fn interval(&self) -> std::time::Duration {
        self.hub.interval()
    }

    fn set_interval(&self, interval: std::time::Duration) {
        self.hub.set_interval(interval);
    }

    fn is_active(&self) -> bool {
        self.hub.is_active()
    }

    fn activate(&self) -> Result<(), HubError> {
        self.hub.activate()
    }

    fn deactivate(&self) {
        self.hub.deactivate();
    }

    fn clear(&self, workings: bool, waitings: bool) {
        let cleared = self.hub.clear_tracked(workings, waitings);
        let mut caches = self.layer.caches.lock();
        let Some(works) = caches.works.as_mut() else {
            return;
        };
        for work in cleared.working.iter().chain(&cleared.waiting) {
            if works.get(work.key()).is_some_and(|cached| cached.ptr_eq(work)) {
                works.remove(work.key());
            }
        }
    }

    fn tick(&self) {
        self.hub.tick();
    }

    fn snapshot(&self) -> HubSnapshot {
        self.hub.snapshot()
    }
}
