//! Hub handing out per-key status handlers polled by a consumer thread.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use super::cache_hub::CacheHub;
use super::handler::WorkHandler;
use super::work_hub::HubControl;
use super::{AsyncWork, Cacher, HubError, Spawn, Work, WorkOutput};
use crate::runtime::api::HubSnapshot;

/// [`CacheHub`] whose submissions return a [`WorkHandler`].
///
/// Handlers are shared per key while the key's work is outstanding. The host
/// calls [`notify_status`](Self::notify_status) from its own thread (render
/// loop, UI timer, ...) to receive callbacks there instead of on the
/// execution threads.
///
/// # Example
///
/// ```rust,ignore
/// let hub = build_status_hub(&HubConfig::default(), spawner)?;
/// hub.activate()?;
/// hub.enqueue(FetchTile { url })
///     .on_progress_changed(|p| bar.set(p))
///     .on_completed(|outcome| show(outcome));
///
/// loop {
///     hub.notify_status();
///     std::thread::sleep(Duration::from_millis(16));
/// }
/// ```
pub struct StatusHub<T: WorkOutput> {
    hub: CacheHub<T>,
    handlers: Mutex<HashMap<String, WorkHandler<T>>>,
}

impl<T: WorkOutput> StatusHub<T> {
    /// Create a status hub. Pass `None` to disable either cache.
    #[must_use]
    pub fn new(
        spawner: Arc<dyn Spawn>,
        work_cacher: Option<Box<dyn Cacher<AsyncWork<T>>>>,
        result_cacher: Option<Box<dyn Cacher<T>>>,
    ) -> Self {
        Self::wrap(CacheHub::new(spawner, work_cacher, result_cacher))
    }

    /// Layer status handlers over an existing cache hub.
    #[must_use]
    pub fn wrap(hub: CacheHub<T>) -> Self {
        Self {
            hub,
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Underlying cache hub.
    #[must_use]
    pub const fn cache_hub(&self) -> &CacheHub<T> {
        &self.hub
    }

    /// Submit a work body and return the handler for its key.
    pub fn enqueue<W>(&self, work: W) -> WorkHandler<T>
    where
        W: Work<Output = T>,
    {
        self.enqueue_handle(AsyncWork::new(work))
    }

    /// Submit an existing handle and return the handler for its key.
    ///
    /// While an earlier submission of the same key is outstanding its handler
    /// is returned, so new subscribers observe the original execution.
    pub fn enqueue_handle(&self, work: AsyncWork<T>) -> WorkHandler<T> {
        let mut handlers = self.handlers.lock();
        let work = self.hub.enqueue_handle(work);
        if let Some(existing) = handlers.get(work.key()) {
            if !existing.is_completed() {
                return existing.clone();
            }
        }
        let handler = WorkHandler::new(work);
        handlers.insert(handler.key().to_string(), handler.clone());
        handler
    }

    /// Handlers still waiting for completion.
    #[must_use]
    pub fn live_handlers(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Dispatch pending progress, speed and completion events.
    ///
    /// Callbacks run on the calling thread with no hub lock held, so they may
    /// submit more work. Completed handlers are retired afterwards.
    pub fn notify_status(&self) {
        let snapshot: Vec<WorkHandler<T>> = {
            let handlers = self.handlers.lock();
            if handlers.is_empty() {
                return;
            }
            handlers.values().cloned().collect()
        };

        let retired: Vec<WorkHandler<T>> = snapshot
            .into_iter()
            .filter(WorkHandler::notify_status)
            .collect();
        if retired.is_empty() {
            return;
        }

        let mut handlers = self.handlers.lock();
        for handler in &retired {
            // A callback may already have replaced the entry for this key.
            if handlers.get(handler.key()).is_some_and(|h| h.ptr_eq(handler)) {
                handlers.remove(handler.key());
                trace!(key = %handler.key(), "handler retired");
            }
        }
    }
}

impl<T: WorkOutput> HubControl for StatusHub<T> {
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

    fn interval(&self) -> Duration {
        self.hub.interval()
    }

    fn set_interval(&self, interval: Duration) {
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
        self.hub.clear(workings, waitings);
        self.handlers.lock().clear();
    }

    fn tick(&self) {
        self.hub.tick();
    }

    fn snapshot(&self) -> HubSnapshot {
        self.hub.snapshot()
    }
}
