//! Shared helpers for integration tests.
//!
//! Test works block on a flume channel, so each attempt concludes exactly when
//! the test sends it an outcome.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use prometheus_work_hub::core::{Spawn, Work, WorkContext, WorkError};
use prometheus_work_hub::runtime::ThreadSpawner;

/// Work whose attempts wait for an outcome from its [`Gate`].
pub struct GatedWork {
    key: Option<String>,
    outcomes: flume::Receiver<Result<u32, WorkError>>,
    started: Arc<AtomicUsize>,
}

/// Test-side control of a [`GatedWork`].
#[derive(Clone)]
pub struct Gate {
    outcomes: flume::Sender<Result<u32, WorkError>>,
    started: Arc<AtomicUsize>,
}

impl Gate {
    /// Let the next attempt succeed with `value`.
    pub fn succeed(&self, value: u32) {
        self.outcomes.send(Ok(value)).expect("work dropped its gate");
    }

    /// Let the next attempt fail with `error`.
    pub fn fail(&self, error: WorkError) {
        self.outcomes.send(Err(error)).expect("work dropped its gate");
    }

    /// Attempts that reached the body so far.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

/// Gated work with an explicit key.
pub fn gated(key: &str) -> (GatedWork, Gate) {
    gated_with(Some(key.to_string()))
}

/// Gated work with a random key.
pub fn gated_anonymous() -> (GatedWork, Gate) {
    gated_with(None)
}

fn gated_with(key: Option<String>) -> (GatedWork, Gate) {
    let (tx, rx) = flume::unbounded();
    let started = Arc::new(AtomicUsize::new(0));
    (
        GatedWork {
            key,
            outcomes: rx,
            started: Arc::clone(&started),
        },
        Gate {
            outcomes: tx,
            started,
        },
    )
}

#[async_trait]
impl Work for GatedWork {
    type Output = u32;

    fn key(&self) -> Option<String> {
        self.key.clone()
    }

    async fn execute(&self, ctx: &WorkContext) -> Result<u32, WorkError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        ctx.set_progress(0.5);
        ctx.set_speed(128.0);
        let outcome = self
            .outcomes
            .recv_async()
            .await
            .unwrap_or_else(|_| Err(WorkError::Other("gate closed".into())));
        if outcome.is_ok() {
            ctx.set_progress(1.0);
        }
        outcome
    }
}

/// Spawner running each attempt on its own thread.
pub fn spawner() -> Arc<dyn Spawn> {
    Arc::new(ThreadSpawner::new().with_name("test-work"))
}

/// Poll `cond` until it holds or five seconds pass.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}
