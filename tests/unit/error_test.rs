//! Tests for error types

use std::io;

use prometheus_work_hub::core::{ErrorKind, HubError, WorkError};

#[test]
fn test_work_error_messages() {
    assert_eq!(format!("{}", WorkError::Aborted), "work aborted");
    assert_eq!(
        format!("{}", WorkError::Timeout("dns".into())),
        "timed out: dns"
    );
    assert_eq!(format!("{}", WorkError::Other("plain".into())), "plain");
}

#[test]
fn test_work_error_kinds() {
    assert_eq!(WorkError::Network("x".into()).kind(), ErrorKind::Network);
    assert_eq!(WorkError::Panicked("x".into()).kind(), ErrorKind::Panicked);
    assert_eq!(WorkError::Aborted.kind(), ErrorKind::Aborted);
}

#[test]
fn test_io_error_classification() {
    let reset = WorkError::from(io::Error::new(io::ErrorKind::ConnectionReset, "peer"));
    assert_eq!(reset.kind(), ErrorKind::Network);
    let would_block = WorkError::from(io::Error::new(io::ErrorKind::WouldBlock, "busy"));
    assert_eq!(would_block.kind(), ErrorKind::Timeout);
    let denied = WorkError::from(io::Error::new(io::ErrorKind::PermissionDenied, "no"));
    assert_eq!(denied.kind(), ErrorKind::Io);
}

#[test]
fn test_error_kind_serde_names() {
    let json = serde_json::to_string(&[ErrorKind::Network, ErrorKind::Timeout]).unwrap();
    assert_eq!(json, r#"["network","timeout"]"#);
    let parsed: Vec<ErrorKind> = serde_json::from_str(r#"["io","other"]"#).unwrap();
    assert_eq!(parsed, vec![ErrorKind::Io, ErrorKind::Other]);
}

#[test]
fn test_hub_error_display() {
    let err = HubError::InvalidConfig("interval_ms must be greater than 0".into());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: interval_ms must be greater than 0"
    );
}
