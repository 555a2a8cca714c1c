//! Serializable status views for hosts (dashboards, debug endpoints, logs).

use serde::{Deserialize, Serialize};

use crate::core::{WorkId, WorkPhase};

/// Point-in-time view of a hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubSnapshot {
    /// Concurrency ceiling.
    pub concurrency: usize,
    /// Works waiting for a slot.
    pub waitings: usize,
    /// Works currently executing.
    pub workings: usize,
    /// Whether the cruiser is ticking.
    pub active: bool,
    /// Tick interval in milliseconds.
    pub interval_ms: u64,
    /// Entries held by the retry resolver.
    pub retry_ledger: usize,
    /// Capture time (ms since epoch).
    pub taken_at_ms: u128,
}

/// Point-in-time view of a work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSnapshot {
    /// Work identifier.
    pub id: WorkId,
    /// Dedup key.
    pub key: String,
    /// Lifecycle phase.
    pub phase: WorkPhase,
    /// Progress in `[0, 1]`.
    pub progress: f32,
    /// Last reported speed.
    pub speed: f64,
    /// Attempts started.
    pub attempts: u32,
    /// Served from the result cache.
    pub from_cache: bool,
    /// Final error message, once done.
    pub error: Option<String>,
}
