/// Swapchain trait - presentation surface

use std::time::Duration;
use crate::error::Result;
use crate::graphics_device::{CommandList, Semaphore, Texture, TextureFormat};

/// Result of acquiring a presentable image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Image acquired; `suboptimal` means the surface should be recreated soon
    Acquired { image_index: u32, suboptimal: bool },
    /// The surface changed and must be recreated before presenting
    OutOfDate,
}

/// Result of presenting an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Optimal,
    Suboptimal,
    OutOfDate,
}

/// Presentation surface with its images
pub trait Swapchain: Send + Sync {
    /// Acquire the next presentable image, signaling `signal` when it is ready.
    ///
    /// Expiry of `timeout` is an `Error::Fatal`.
    fn acquire_next_image(&mut self, signal: &dyn Semaphore, timeout: Duration) -> Result<AcquireOutcome>;

    /// Record the transitions and the scaled blit copying `source` (left in
    /// transfer-source layout) into presentable image `image_index`, leaving
    /// the image ready for presentation.
    fn record_present_blit(
        &self,
        command_list: &mut dyn CommandList,
        source: &dyn Texture,
        image_index: u32,
    ) -> Result<()>;

    /// Present image `image_index` once `wait` is signaled
    fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<PresentOutcome>;

    /// Recreate the swapchain for a new window size.
    ///
    /// The caller guarantees the device is idle.
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;

    fn image_count(&self) -> usize;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn format(&self) -> TextureFormat;
}
