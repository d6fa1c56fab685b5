//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, DefaultLogger formatting and the global logger.
//! Tests touching the global logger are marked #[serial].

use crate::log::{self, DefaultLogger, LogEntry, LogSeverity, Logger};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Logger capturing entries for inspection
#[derive(Clone, Default)]
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        // Other tests log concurrently; only keep this module's entries.
        if entry.source == SOURCE {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }
}

const SOURCE: &str = "umbra::log_tests";

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// DEFAULT LOGGER FORMAT TESTS
// ============================================================================

#[test]
fn test_format_plain_without_file_line() {
    let entry = LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "umbra::FrameOrchestrator".to_string(),
        message: "Resize committed".to_string(),
        file: None,
        line: None,
    };
    let line = DefaultLogger::format_plain(&entry);
    assert!(line.contains("[INFO ]"));
    assert!(line.contains("[umbra::FrameOrchestrator]"));
    assert!(line.ends_with("Resize committed"));
}

#[test]
fn test_format_plain_with_file_line() {
    let entry = LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "umbra::vulkan".to_string(),
        message: "Device lost".to_string(),
        file: Some("vulkan.rs"),
        line: Some(42),
    };
    let line = DefaultLogger::format_plain(&entry);
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("Device lost (vulkan.rs:42)"));
}

#[test]
fn test_default_logger_does_not_panic() {
    let entry = LogEntry {
        severity: LogSeverity::Warn,
        timestamp: SystemTime::now(),
        source: "umbra::test".to_string(),
        message: "hello".to_string(),
        file: None,
        line: None,
    };
    DefaultLogger.log(&entry);
}

// ============================================================================
// GLOBAL LOGGER TESTS
// ============================================================================

#[test]
#[serial]
fn test_set_logger_captures_macros() {
    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());

    crate::engine_info!(SOURCE, "frame {}", 7);
    crate::engine_warn!(SOURCE, "suboptimal");

    log::reset_logger();

    let entries = capture.entries.lock().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].severity, LogSeverity::Info);
    assert_eq!(entries[0].message, "frame 7");
    assert_eq!(entries[1].severity, LogSeverity::Warn);
    assert!(entries[0].file.is_none());
}

#[test]
#[serial]
fn test_engine_error_records_file_and_line() {
    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());

    crate::engine_error!(SOURCE, "boom");

    log::reset_logger();

    let entries = capture.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert!(entries[0].file.unwrap().ends_with("log_tests.rs"));
    assert!(entries[0].line.is_some());
}

#[test]
#[serial]
fn test_reset_logger_stops_capture() {
    let capture = CaptureLogger::default();
    log::set_logger(capture.clone());
    log::reset_logger();

    crate::engine_debug!(SOURCE, "not captured");

    assert!(capture.entries.lock().unwrap().is_empty());
}
