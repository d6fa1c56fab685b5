/// RenderTarget - Vulkan implementation of the RenderTarget trait

use umbra_engine::umbra::render::{RenderTarget as RendererRenderTarget, TextureFormat};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Single-layer attachment view of a texture.
///
/// Owns its image view. The texture itself must stay alive while the view is
/// in use; the G-buffer targets keep both.
pub struct RenderTarget {
    ctx: Arc<GpuContext>,
    pub(crate) image_view: vk::ImageView,
    width: u32,
    height: u32,
    format: TextureFormat,
    layer: u32,
}

impl RenderTarget {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        image_view: vk::ImageView,
        width: u32,
        height: u32,
        format: TextureFormat,
        layer: u32,
    ) -> Self {
        Self { ctx, image_view, width, height, format, layer }
    }

    /// # Safety
    ///
    /// `target` must have been created by a `VulkanGraphicsDevice`.
    pub(crate) unsafe fn from_dyn(target: &dyn RendererRenderTarget) -> &RenderTarget {
        &*(target as *const dyn RendererRenderTarget as *const RenderTarget)
    }
}

impl RendererRenderTarget for RenderTarget {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn layer(&self) -> u32 {
        self.layer
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.image_view, None);
        }
    }
}
