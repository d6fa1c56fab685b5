/// CPU/GPU synchronization primitives

use std::time::Duration;
use crate::error::Result;

/// Completion fence signaled by the GPU when a submission finishes
pub trait Fence: Send + Sync {
    /// Block until signaled.
    ///
    /// Expiry of `timeout` is an `Error::Fatal`: a frame that never completes
    /// means the device is gone.
    fn wait(&self, timeout: Duration) -> Result<()>;

    /// Return to the unsignaled state
    fn reset(&self) -> Result<()>;
}

/// Binary semaphore ordering GPU work within one frame slot
/// (image acquired -> rendering, rendering done -> present)
pub trait Semaphore: Send + Sync {}
