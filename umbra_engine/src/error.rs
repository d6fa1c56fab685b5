/// Error types for the Umbra renderer

use std::backtrace::Backtrace;
use std::fmt;
use std::sync::Arc;

/// Renderer error type
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error
    BackendError(String),
    /// Out of memory
    OutOfMemory,
    /// Invalid resource
    InvalidResource(String),
    /// Initialization failed
    InitializationFailed(String),
    /// Operation called in the wrong frame state (e.g. end_frame without begin_frame)
    InvalidState(String),
    /// Unrecoverable GPU failure (device lost, fence or acquire timeout)
    Fatal(FatalError),
}

/// Unrecoverable failure with the backtrace captured where it was raised
#[derive(Debug, Clone)]
pub struct FatalError {
    message: String,
    backtrace: Arc<Backtrace>,
}

impl FatalError {
    /// Create a fatal error, capturing the current backtrace
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            backtrace: Arc::new(Backtrace::force_capture()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl Error {
    /// Whether this error must end the process (see [`terminate`])
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::Fatal(fatal) => write!(f, "Fatal error: {}", fatal.message),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for renderer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Log a fatal error with its backtrace and abort the process.
///
/// There is no degraded mode: once the device or the presentation surface is
/// lost the frame loop cannot make progress.
pub fn terminate(error: &Error) -> ! {
    crate::engine_error!("umbra::terminate", "{}", error);
    if let Error::Fatal(fatal) = error {
        crate::engine_error!("umbra::terminate", "Backtrace:\n{}", fatal.backtrace());
    }
    std::process::abort()
}

// ===== ERROR MACROS =====

/// Log an ERROR and build an `Error::BackendError` from the same message
///
/// # Example
///
/// ```no_run
/// # use umbra_engine::engine_err;
/// let code = -4;
/// let err = engine_err!("umbra::vulkan", "Failed to map memory: {:?}", code);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::umbra::Error::BackendError(message)
    }};
}

/// Log an ERROR and return early with an `Error::BackendError`
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

/// Log an ERROR and build an `Error::Fatal` (backtrace captured here)
#[macro_export]
macro_rules! engine_fatal {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::umbra::Error::Fatal($crate::umbra::FatalError::new(message))
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
