//! Factory functions assembling hubs from a [`HubConfig`].
//!
//! Disabled features come back as `None` rather than as errors: a zero
//! retry budget yields no resolver and a zero cache capacity yields no cacher.

use std::sync::Arc;

use tracing::debug;

use crate::config::HubConfig;
use crate::core::{
    AsyncWork, CacheHub, Cacher, HubError, RetryResolver, Spawn, StatusHub, TolerableErrorResolver,
    WorkHub, WorkOutput,
};
use crate::infra::cache::{BoundedCacher, TimeoutCacher};

fn validated(cfg: &HubConfig) -> Result<(), HubError> {
    cfg.validate().map_err(HubError::InvalidConfig)
}

/// Retry policy for `cfg`, or `None` when `retry_times` is 0.
#[must_use]
pub fn build_resolver(cfg: &HubConfig) -> Option<Box<dyn RetryResolver>> {
    if cfg.retry_times == 0 {
        return None;
    }
    Some(Box::new(TolerableErrorResolver::new(
        cfg.retry_times,
        cfg.effective_tolerable_errors(),
    )))
}

/// In-flight work cacher, or `None` when `max_cache_count` is 0.
#[must_use]
pub fn build_work_cacher<T: WorkOutput>(cfg: &HubConfig) -> Option<Box<dyn Cacher<AsyncWork<T>>>> {
    (cfg.max_cache_count > 0)
        .then(|| Box::new(BoundedCacher::new(cfg.max_cache_count)) as Box<dyn Cacher<AsyncWork<T>>>)
}

/// Result cacher with TTL, or `None` when `max_cache_count` is 0.
#[must_use]
pub fn build_result_cacher<T: WorkOutput>(cfg: &HubConfig) -> Option<Box<dyn Cacher<T>>> {
    (cfg.max_cache_count > 0).then(|| {
        Box::new(TimeoutCacher::new(cfg.max_cache_count, cfg.cache_timeout())) as Box<dyn Cacher<T>>
    })
}

fn configure<T: WorkOutput>(hub: WorkHub<T>, cfg: &HubConfig) -> WorkHub<T> {
    let hub = hub
        .with_interval(cfg.interval())
        .with_concurrency(cfg.concurrency);
    match build_resolver(cfg) {
        Some(resolver) => hub.with_resolver(resolver),
        None => hub,
    }
}

/// Plain work hub.
///
/// # Errors
///
/// Returns [`HubError::InvalidConfig`] when `cfg` does not validate.
pub fn build_work_hub<T: WorkOutput>(
    cfg: &HubConfig,
    spawner: Arc<dyn Spawn>,
) -> Result<WorkHub<T>, HubError> {
    validated(cfg)?;
    debug!(?cfg, "building work hub");
    Ok(configure(WorkHub::new(spawner), cfg))
}

/// Work hub with key-based dedup and result reuse.
///
/// # Errors
///
/// Returns [`HubError::InvalidConfig`] when `cfg` does not validate.
pub fn build_cache_hub<T: WorkOutput>(
    cfg: &HubConfig,
    spawner: Arc<dyn Spawn>,
) -> Result<CacheHub<T>, HubError> {
    validated(cfg)?;
    debug!(?cfg, "building cache hub");
    let hub = CacheHub::new(spawner, build_work_cacher(cfg), build_result_cacher(cfg));
    Ok(hub.configure(|inner| configure(inner, cfg)))
}

/// Cache hub handing out polled status handlers.
///
/// # Errors
///
/// Returns [`HubError::InvalidConfig`] when `cfg` does not validate.
pub fn build_status_hub<T: WorkOutput>(
    cfg: &HubConfig,
    spawner: Arc<dyn Spawn>,
) -> Result<StatusHub<T>, HubError> {
    Ok(StatusHub::wrap(build_cache_hub(cfg, spawner)?))
}
