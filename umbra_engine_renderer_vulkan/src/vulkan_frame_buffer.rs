/// Framebuffer - Vulkan implementation of the Framebuffer trait
///
/// Groups the color and depth attachment views of one render pass instance.
/// Built by the G-buffer targets and rebuilt whenever they are invalidated.

use umbra_engine::umbra::render::{Framebuffer as RendererFramebuffer, RenderTarget as RendererRenderTarget};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

pub struct Framebuffer {
    ctx: Arc<GpuContext>,
    pub(crate) framebuffer: vk::Framebuffer,
    width: u32,
    height: u32,
    /// Attachment views must outlive the VkFramebuffer
    _attachments: Vec<Arc<dyn RendererRenderTarget>>,
}

impl Framebuffer {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        framebuffer: vk::Framebuffer,
        width: u32,
        height: u32,
        attachments: Vec<Arc<dyn RendererRenderTarget>>,
    ) -> Self {
        Self { ctx, framebuffer, width, height, _attachments: attachments }
    }
}

impl RendererFramebuffer for Framebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
