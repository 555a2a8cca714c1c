//! Thread-per-execution spawner for hosts without an async runtime.

use std::thread;

use futures::future::BoxFuture;
use tracing::error;

use crate::core::Spawn;

/// Runs every work body on its own named OS thread with a local executor.
///
/// Suits blocking or CPU-bound bodies and hosts that do not run tokio. Bodies
/// that depend on tokio primitives (timers, I/O) need [`TokioSpawner`] instead.
///
/// [`TokioSpawner`]: crate::runtime::TokioSpawner
#[derive(Debug, Clone)]
pub struct ThreadSpawner {
    name: String,
    stack_size: Option<usize>,
}

impl ThreadSpawner {
    /// Spawner whose threads are named `work-hub-exec`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "work-hub-exec".into(),
            stack_size: None,
        }
    }

    /// Override the thread name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the thread stack size (bytes).
    #[must_use]
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }
}

impl Default for ThreadSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl Spawn for ThreadSpawner {
    fn spawn(&self, fut: BoxFuture<'static, ()>) {
        let mut builder = thread::Builder::new().name(self.name.clone());
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        // On failure the future is dropped, which concludes the attempt as aborted.
        if let Err(e) = builder.spawn(move || futures::executor::block_on(fut)) {
            error!(error = %e, "failed to spawn work execution thread");
        }
    }
}
