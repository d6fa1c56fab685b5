/// Texture - Vulkan implementation of the Texture trait

use umbra_engine::umbra::render::{Texture as RendererTexture, TextureInfo};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan texture implementation
///
/// `view` covers every array layer and is the one bound for sampling (depth
/// aspect only for depth/stencil formats). Attachment views of single layers
/// are separate `RenderTarget` objects.
pub struct Texture {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    pub(crate) info: TextureInfo,
}

impl Texture {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        image: vk::Image,
        view: vk::ImageView,
        allocation: Allocation,
        info: TextureInfo,
    ) -> Self {
        Self { ctx, image, view, allocation: Some(allocation), info }
    }

    /// Downcast a trait object created by this backend
    ///
    /// # Safety
    ///
    /// `texture` must have been created by a `VulkanGraphicsDevice`.
    pub(crate) unsafe fn from_dyn(texture: &dyn RendererTexture) -> &Texture {
        &*(texture as *const dyn RendererTexture as *const Texture)
    }
}

impl RendererTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);

            // Don't panic if the lock is poisoned; the image still has to go
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut shared) = self.ctx.lock_shared() {
                    shared.allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_image(self.image, None);
        }
    }
}
