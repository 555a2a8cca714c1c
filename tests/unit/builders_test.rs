//! Tests for builder modules

use std::sync::Arc;
use std::time::Duration;

use prometheus_work_hub::builders::{
    build_resolver, build_result_cacher, build_status_hub, build_work_cacher, build_work_hub,
};
use prometheus_work_hub::config::HubConfig;
use prometheus_work_hub::core::{ErrorKind, HubControl, HubError, Spawn, WorkError};
use prometheus_work_hub::runtime::ThreadSpawner;

fn spawner() -> Arc<dyn Spawn> {
    Arc::new(ThreadSpawner::new())
}

#[test]
fn test_resolver_disabled_by_zero_retries() {
    assert!(build_resolver(&HubConfig::default().with_retry_times(0)).is_none());
}

#[test]
fn test_resolver_uses_default_allowlist() {
    let mut resolver = build_resolver(&HubConfig::default()).unwrap();
    assert!(!resolver.retryable(1, &WorkError::Other("bad".into())));
    assert!(resolver.retryable(1, &WorkError::Timeout("slow".into())));
    assert!(resolver.retryable(1, &WorkError::Network("reset".into())));
    assert!(resolver.retryable(1, &WorkError::Network("reset".into())));
    assert!(!resolver.retryable(1, &WorkError::Network("reset".into())));
}

#[test]
fn test_resolver_with_empty_allowlist_retries_anything() {
    let cfg = HubConfig::default().with_tolerable_errors(Vec::<ErrorKind>::new());
    let mut resolver = build_resolver(&cfg).unwrap();
    assert!(resolver.retryable(1, &WorkError::Other("bad".into())));
}

#[test]
fn test_cachers_disabled_by_zero_capacity() {
    let cfg = HubConfig::default().with_max_cache_count(0);
    assert!(build_work_cacher::<u32>(&cfg).is_none());
    assert!(build_result_cacher::<u32>(&cfg).is_none());
}

#[test]
fn test_cachers_use_configured_capacity() {
    let cfg = HubConfig::default().with_max_cache_count(2);
    let mut results = build_result_cacher::<u32>(&cfg).unwrap();
    assert_eq!(results.max_count(), 2);
    results.set("a", 1);
    results.set("b", 2);
    results.set("c", 3);
    assert_eq!(results.len(), 2);
    assert_eq!(results.get("a"), None);
}

#[test]
fn test_work_hub_applies_config() {
    let cfg = HubConfig::default()
        .with_concurrency(7)
        .with_interval_ms(30)
        .with_retry_times(0);
    let hub = build_work_hub::<u32>(&cfg, spawner()).unwrap();
    assert_eq!(hub.concurrency(), 7);
    assert_eq!(hub.interval(), Duration::from_millis(30));
    assert_eq!(hub.retry_ledger_len(), 0);
}

#[test]
fn test_invalid_config_is_rejected() {
    let cfg = HubConfig::default().with_interval_ms(0);
    assert!(matches!(
        build_work_hub::<u32>(&cfg, spawner()),
        Err(HubError::InvalidConfig(_))
    ));
    assert!(build_status_hub::<u32>(&cfg, spawner()).is_err());
}
