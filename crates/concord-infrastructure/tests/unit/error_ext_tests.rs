//! Error context extension tests

use concord_domain::error::Error;
use concord_infrastructure::error_ext::ErrorContext;

fn io_failure() -> std::result::Result<(), std::io::Error> {
    Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
}

#[test]
fn test_io_context() {
    let err = io_failure().io_context("Failed to read file").unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert!(err.to_string().contains("Failed to read file: gone"));
}

#[test]
fn test_config_context() {
    let err = io_failure().config_context("Bad config").unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
}

#[test]
fn test_store_context_is_retryable() {
    let err = io_failure().store_context("Store down").unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable { .. }));
    assert!(err.is_retryable());
    assert_eq!(err.http_status(), 503);
}

#[test]
fn test_lazy_context() {
    let err = io_failure()
        .with_context(|| format!("attempt {}", 3))
        .unwrap_err();
    assert!(matches!(err, Error::Internal { .. }));
    assert!(err.to_string().contains("attempt 3"));
}

#[test]
fn test_ok_passes_through() {
    let value: std::result::Result<u8, std::io::Error> = Ok(7);
    assert_eq!(value.context("unused").unwrap(), 7);
}
