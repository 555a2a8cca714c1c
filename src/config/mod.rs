//! Configuration models for hubs, retries, and caches.

pub mod hub;

pub use hub::{HubConfig, DEFAULT_TOLERABLE_ERRORS, ENV_PREFIX};
