//! Tokio runtime spawner implementation.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::runtime::{Handle, Runtime};

use crate::core::Spawn;

/// Tokio-based spawner that executes work bodies on a tokio runtime.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: Handle,
    /// Keeps an owned runtime alive for as long as any clone of the spawner.
    _runtime: Option<Arc<Runtime>>,
}

impl TokioSpawner {
    /// Create a new `TokioSpawner` from a tokio runtime handle.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self {
            handle,
            _runtime: None,
        }
    }

    /// Create a `TokioSpawner` owning a new multi-threaded runtime with the given worker threads.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while building the runtime.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, std::io::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("work-hub-exec")
            .enable_all()
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            _runtime: Some(Arc::new(runtime)),
        })
    }

    /// Owned runtime with one worker thread per CPU.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while building the runtime.
    pub fn with_default_threads() -> Result<Self, std::io::Error> {
        Self::with_worker_threads(num_cpus::get())
    }

    /// Handle of the runtime works are spawned on.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Spawn for TokioSpawner {
    fn spawn(&self, fut: BoxFuture<'static, ()>) {
        self.handle.spawn(fut);
    }
}
