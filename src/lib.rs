//! # Prometheus Work Hub
//!
//! A tick-driven, bounded-concurrency work scheduler with retries, key-based
//! reuse, and polled status notification.
//!
//! Callers submit units of asynchronous work identified by a key. A background
//! "cruiser" thread ticks the hub on a fixed interval: each tick admits queued
//! works up to a concurrency ceiling, restarts failed works the retry policy
//! accepts, and finalizes the rest. Hosts that render or run a UI loop poll
//! status on their own thread instead of receiving callbacks from execution
//! threads.
//!
//! ## Layers
//!
//! Each layer wraps the previous one by delegation:
//!
//! - [`core::WorkHub`]: FIFO admission, concurrency ceiling, retries via a
//!   [`core::RetryResolver`]
//! - [`core::CacheHub`]: submissions sharing a key converge on one execution;
//!   recent results are served from a TTL cache without executing
//! - [`core::StatusHub`]: one [`core::WorkHandler`] per outstanding key whose
//!   callbacks fire when the host calls `notify_status`
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prometheus_work_hub::builders::build_status_hub;
//! use prometheus_work_hub::config::HubConfig;
//! use prometheus_work_hub::core::HubControl;
//! use prometheus_work_hub::runtime::TokioSpawner;
//!
//! let spawner = Arc::new(TokioSpawner::with_default_threads()?);
//! let hub = build_status_hub::<Vec<u8>>(&HubConfig::from_env()?, spawner)?;
//! hub.activate()?;
//!
//! hub.enqueue(FetchTile::new(url))
//!     .on_progress_changed(|p| println!("progress {p:.2}"))
//!     .on_completed(|outcome| println!("done: {}", outcome.is_ok()));
//!
//! loop {
//!     hub.notify_status();
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! ```
//!
//! For complete examples, see:
//! - `tests/status_hub_test.rs` - end-to-end notification flow
//! - `tests/work_hub_test.rs` - admission and retry scenarios

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: work contract, retry policy, cachers, hubs.
pub mod core;
/// Configuration models for hubs, retries, and caches.
pub mod config;
/// Builders to construct hubs from configuration.
pub mod builders;
/// Infrastructure adapters: in-memory cacher backends.
pub mod infra;
/// Runtime adapters (tokio, OS threads) and serializable status views.
pub mod runtime;
/// Shared utilities.
pub mod util;
