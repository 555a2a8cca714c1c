//! Tests for configuration parsing and validation

use std::collections::HashMap;
use std::time::Duration;

use prometheus_work_hub::config::{HubConfig, DEFAULT_TOLERABLE_ERRORS};
use prometheus_work_hub::core::ErrorKind;

#[test]
fn test_defaults() {
    let cfg = HubConfig::default();
    assert_eq!(cfg.interval_ms, 250);
    assert_eq!(cfg.concurrency, 10);
    assert_eq!(cfg.retry_times, 3);
    assert_eq!(cfg.tolerable_errors, None);
    assert_eq!(cfg.max_cache_count, 100);
    assert_eq!(cfg.cache_timeout(), Duration::from_millis(5_000));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_zero_interval_is_rejected() {
    assert!(HubConfig::default().with_interval_ms(0).validate().is_err());
}

#[test]
fn test_zero_capacities_are_permissive() {
    let cfg = HubConfig::default()
        .with_concurrency(0)
        .with_retry_times(0)
        .with_max_cache_count(0);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_tolerable_error_resolution() {
    let cfg = HubConfig::default();
    assert_eq!(
        cfg.effective_tolerable_errors(),
        Some(DEFAULT_TOLERABLE_ERRORS.to_vec())
    );

    let any = HubConfig::default().with_tolerable_errors(Vec::<ErrorKind>::new());
    assert_eq!(any.effective_tolerable_errors(), None);

    let io_only = HubConfig::default().with_tolerable_errors([ErrorKind::Io]);
    assert_eq!(io_only.effective_tolerable_errors(), Some(vec![ErrorKind::Io]));
}

#[test]
fn test_from_json_str_fills_defaults() {
    let cfg = HubConfig::from_json_str(
        r#"{ "concurrency": 4, "tolerable_errors": ["timeout"] }"#,
    )
    .unwrap();
    assert_eq!(cfg.concurrency, 4);
    assert_eq!(cfg.interval_ms, 250);
    assert_eq!(cfg.tolerable_errors, Some(vec![ErrorKind::Timeout]));
}

#[test]
fn test_from_json_str_rejects_invalid() {
    assert!(HubConfig::from_json_str(r#"{ "interval_ms": 0 }"#).is_err());
    assert!(HubConfig::from_json_str("not json").is_err());
}

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn test_from_lookup_reads_prefixed_variables() {
    let cfg = HubConfig::from_lookup(lookup(&[
        ("WORK_HUB_INTERVAL_MS", "100"),
        ("WORK_HUB_CONCURRENCY", " 6 "),
        ("WORK_HUB_RETRY_TIMES", "1"),
        ("WORK_HUB_TOLERABLE_ERRORS", "network, io"),
        ("WORK_HUB_MAX_CACHE_COUNT", "0"),
        ("WORK_HUB_CACHE_TIMEOUT_MS", "750"),
    ]))
    .unwrap();
    assert_eq!(cfg.interval_ms, 100);
    assert_eq!(cfg.concurrency, 6);
    assert_eq!(cfg.retry_times, 1);
    assert_eq!(
        cfg.tolerable_errors,
        Some(vec![ErrorKind::Network, ErrorKind::Io])
    );
    assert_eq!(cfg.max_cache_count, 0);
    assert_eq!(cfg.cache_timeout_ms, 750);
}

#[test]
fn test_from_lookup_empty_tolerable_list_means_any() {
    let cfg = HubConfig::from_lookup(lookup(&[("WORK_HUB_TOLERABLE_ERRORS", "")])).unwrap();
    assert_eq!(cfg.tolerable_errors, Some(Vec::new()));
    assert_eq!(cfg.effective_tolerable_errors(), None);
}

#[test]
fn test_from_lookup_rejects_bad_values() {
    assert!(HubConfig::from_lookup(lookup(&[("WORK_HUB_CONCURRENCY", "many")])).is_err());
    assert!(HubConfig::from_lookup(lookup(&[("WORK_HUB_TOLERABLE_ERRORS", "gremlins")])).is_err());
    assert!(HubConfig::from_lookup(lookup(&[("WORK_HUB_INTERVAL_MS", "0")])).is_err());
}
