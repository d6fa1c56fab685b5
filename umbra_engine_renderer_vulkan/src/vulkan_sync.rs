/// Fence and Semaphore - Vulkan implementations of the sync traits

use umbra_engine::umbra::render::{Fence as RendererFence, Semaphore as RendererSemaphore};
use umbra_engine::umbra::Result;
use umbra_engine::{engine_err, engine_fatal};
use ash::vk;
use std::sync::Arc;
use std::time::Duration;

use crate::vulkan_context::GpuContext;

pub struct Fence {
    ctx: Arc<GpuContext>,
    pub(crate) fence: vk::Fence,
}

impl Fence {
    pub(crate) fn new(ctx: Arc<GpuContext>, fence: vk::Fence) -> Self {
        Self { ctx, fence }
    }

    /// # Safety
    ///
    /// `fence` must have been created by a `VulkanGraphicsDevice`.
    pub(crate) unsafe fn from_dyn(fence: &dyn RendererFence) -> &Fence {
        &*(fence as *const dyn RendererFence as *const Fence)
    }
}

impl RendererFence for Fence {
    fn wait(&self, timeout: Duration) -> Result<()> {
        let nanos = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        unsafe {
            match self.ctx.device.wait_for_fences(&[self.fence], true, nanos) {
                Ok(()) => Ok(()),
                Err(vk::Result::TIMEOUT) => Err(engine_fatal!(
                    "umbra::vulkan",
                    "Fence not signaled within {:?}: GPU hang",
                    timeout
                )),
                Err(e) => Err(engine_fatal!("umbra::vulkan", "Fence wait failed: {:?}", e)),
            }
        }
    }

    fn reset(&self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .reset_fences(&[self.fence])
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to reset fence: {:?}", e))
        }
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}

pub struct Semaphore {
    ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
}

impl Semaphore {
    pub(crate) fn new(ctx: Arc<GpuContext>, semaphore: vk::Semaphore) -> Self {
        Self { ctx, semaphore }
    }

    /// # Safety
    ///
    /// `semaphore` must have been created by a `VulkanGraphicsDevice`.
    pub(crate) unsafe fn from_dyn(semaphore: &dyn RendererSemaphore) -> &Semaphore {
        &*(semaphore as *const dyn RendererSemaphore as *const Semaphore)
    }
}

impl RendererSemaphore for Semaphore {}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}
