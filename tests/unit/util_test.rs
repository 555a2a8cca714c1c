//! Tests for utility functions

use std::sync::Arc;
use std::time::Duration;

use prometheus_work_hub::core::Cacher;
use prometheus_work_hub::infra::TimeoutCacher;
use prometheus_work_hub::util::{init_tracing, now_ms, Clock, ManualClock};

#[test]
fn test_manual_clock_drives_ttl_cacher() {
    let clock = Arc::new(ManualClock::new());
    let mut cacher = TimeoutCacher::with_clock(4, Duration::from_millis(50), clock.clone());
    cacher.set("k", 1u8);

    let before = clock.now();
    clock.advance(Duration::from_millis(50));
    assert_eq!(clock.now() - before, Duration::from_millis(50));
    assert_eq!(cacher.get("k"), Some(1));

    clock.advance(Duration::from_millis(1));
    assert_eq!(cacher.get("k"), None);
}

#[test]
fn test_now_ms_is_monotonic_enough() {
    let a = now_ms();
    let b = now_ms();
    assert!(b >= a);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialised twice without panicking");
}
