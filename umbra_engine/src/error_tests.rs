//! Unit tests for error.rs
//!
//! Tests all Error variants, the fatal payload and the error macros.

use crate::error::{Error, FatalError, Result};
use serial_test::serial;

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("queue submit failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("queue submit failed"));
}

#[test]
fn test_out_of_memory_display() {
    let err = Error::OutOfMemory;
    assert_eq!(format!("{}", err), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("shadow resolution must be > 0".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid resource"));
    assert!(display.contains("shadow resolution"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("no graphics queue".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Initialization failed"));
    assert!(display.contains("no graphics queue"));
}

#[test]
fn test_invalid_state_display() {
    let err = Error::InvalidState("end_frame called without begin_frame".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid state"));
    assert!(display.contains("end_frame"));
}

#[test]
fn test_fatal_display() {
    let err = Error::Fatal(FatalError::new("fence wait timed out"));
    assert_eq!(format!("{}", err), "Fatal error: fence wait timed out");
}

// ============================================================================
// FATAL ERROR TESTS
// ============================================================================

#[test]
fn test_is_fatal() {
    assert!(Error::Fatal(FatalError::new("device lost")).is_fatal());
    assert!(!Error::OutOfMemory.is_fatal());
    assert!(!Error::InvalidState("x".to_string()).is_fatal());
}

#[test]
fn test_fatal_error_keeps_message() {
    let fatal = FatalError::new("acquire timed out");
    assert_eq!(fatal.message(), "acquire timed out");
}

#[test]
fn test_fatal_error_clone_shares_backtrace() {
    let fatal = FatalError::new("device lost");
    let cloned = fatal.clone();
    assert!(std::ptr::eq(fatal.backtrace(), cloned.backtrace()));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug() {
    let debug = format!("{:?}", Error::InvalidState("twice".to_string()));
    assert!(debug.contains("InvalidState"));
}

#[test]
fn test_result_propagation() {
    fn inner() -> Result<u32> {
        Err(Error::InvalidResource("missing".to_string()))
    }
    fn outer() -> Result<u32> {
        let v = inner()?;
        Ok(v + 1)
    }
    assert!(matches!(outer(), Err(Error::InvalidResource(_))));
}

// ============================================================================
// MACRO TESTS
// ============================================================================

#[test]
#[serial]
fn test_engine_err_builds_backend_error() {
    let err = crate::engine_err!("umbra::test", "bad value {}", 42);
    match err {
        Error::BackendError(msg) => assert_eq!(msg, "bad value 42"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
#[serial]
fn test_engine_bail_returns_early() {
    fn fails() -> Result<()> {
        crate::engine_bail!("umbra::test", "stop here");
    }
    assert!(matches!(fails(), Err(Error::BackendError(_))));
}

#[test]
#[serial]
fn test_engine_fatal_builds_fatal() {
    let err = crate::engine_fatal!("umbra::test", "device lost ({})", "VK_ERROR_DEVICE_LOST");
    assert!(err.is_fatal());
    assert!(format!("{}", err).contains("VK_ERROR_DEVICE_LOST"));
}
