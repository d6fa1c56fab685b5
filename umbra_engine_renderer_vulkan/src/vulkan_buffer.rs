/// Buffer - Vulkan implementation of the Buffer trait

use umbra_engine::umbra::{render::Buffer as RendererBuffer, Result};
use umbra_engine::{engine_bail, engine_err};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer implementation (host-visible, persistently mapped)
pub struct Buffer {
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
    label: String,
    size: u64,
}

impl Buffer {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        buffer: vk::Buffer,
        allocation: Allocation,
        label: String,
        size: u64,
    ) -> Self {
        Self { ctx, buffer, allocation: Some(allocation), label, size }
    }

    /// # Safety
    ///
    /// `buffer` must have been created by a `VulkanGraphicsDevice`.
    pub(crate) unsafe fn from_dyn(buffer: &dyn RendererBuffer) -> &Buffer {
        &*(buffer as *const dyn RendererBuffer as *const Buffer)
    }

    /// Bind the allocation to the buffer; called once right after creation
    pub(crate) fn bind_memory(&self) -> Result<()> {
        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| engine_err!("umbra::vulkan", "Buffer '{}' has no GPU allocation", self.label))?;
        unsafe {
            self.ctx
                .device
                .bind_buffer_memory(self.buffer, allocation.memory(), allocation.offset())
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to bind memory for buffer '{}': {:?}", self.label, e))
        }
    }
}

impl RendererBuffer for Buffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > self.size) {
            engine_bail!(
                "umbra::vulkan",
                "Buffer '{}' overflow: writing {} bytes at {} into {} bytes",
                self.label, data.len(), offset, self.size
            );
        }

        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| engine_err!("umbra::vulkan", "Buffer '{}' update failed: no GPU allocation", self.label))?;

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| engine_err!("umbra::vulkan", "Buffer '{}' is not CPU-accessible", self.label))?
            .as_ptr() as *mut u8;

        // SAFETY: range checked above, the mapping lives as long as the allocation
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped_ptr.add(offset as usize), data.len());
        }
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut shared) = self.ctx.lock_shared() {
                    shared.allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
