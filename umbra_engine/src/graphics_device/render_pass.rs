/// RenderPass trait - describes how attachments are loaded and stored

use crate::graphics_device::TextureFormat;

/// Render pass trait
pub trait RenderPass: Send + Sync {
    fn color_attachment_count(&self) -> u32;
    fn has_depth_attachment(&self) -> bool;
}

/// Descriptor for creating a render pass
#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    pub color_attachments: Vec<AttachmentDesc>,
    pub depth_attachment: Option<AttachmentDesc>,
}

/// Descriptor for a single attachment in a render pass
#[derive(Debug, Clone, Copy)]
pub struct AttachmentDesc {
    pub format: TextureFormat,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    /// Layout the attachment is in when the pass begins
    pub initial_layout: ImageLayout,
    /// Layout the pass leaves the attachment in
    pub final_layout: ImageLayout,
}

impl AttachmentDesc {
    /// Cleared and stored, kept in its attachment layout across the pass.
    /// Transitions in and out of the pass are explicit barriers.
    pub fn cleared(format: TextureFormat) -> Self {
        let layout = if format.is_depth() {
            ImageLayout::DepthStencilAttachment
        } else {
            ImageLayout::ColorAttachment
        };
        Self {
            format,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            initial_layout: layout,
            final_layout: layout,
        }
    }
}

/// Load operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

/// Store operation for an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// Image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    /// Undefined layout (initial state, contents discarded)
    Undefined,
    ColorAttachment,
    DepthStencilAttachment,
    /// Sampling-ready
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    PresentSrc,
}
