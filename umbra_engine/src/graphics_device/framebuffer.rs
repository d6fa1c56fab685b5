/// Framebuffer trait - binds render targets to a render pass

use std::sync::Arc;
use crate::graphics_device::{RenderPass, RenderTarget};

/// Framebuffer trait
pub trait Framebuffer: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Descriptor for creating a framebuffer
#[derive(Clone)]
pub struct FramebufferDesc<'a> {
    pub render_pass: &'a Arc<dyn RenderPass>,
    pub color_attachments: Vec<Arc<dyn RenderTarget>>,
    pub depth_attachment: Option<Arc<dyn RenderTarget>>,
    pub width: u32,
    pub height: u32,
}
