/// CommandList trait - for recording rendering commands

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    BindingGroup, Buffer, Framebuffer, ImageLayout, IndexType, Pipeline, RenderPass,
    ShaderStageFlags, Texture,
};

/// Command list for recording rendering commands
///
/// Commands are recorded and later submitted with `GraphicsDevice::submit`.
pub trait CommandList: Send + Sync {
    /// Begin recording commands (resets previously recorded content)
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Begin a render pass
    ///
    /// # Arguments
    ///
    /// * `render_pass` - The render pass to begin
    /// * `framebuffer` - The framebuffer containing color and depth/stencil attachments
    /// * `clear_values` - Clear values, colors first then depth
    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Bind a binding group to a pipeline slot
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Pipeline whose layout the group is bound against
    /// * `set_index` - Set index (0 = per-frame globals, 1 = per-pass or per-material)
    /// * `binding_group` - The binding group to bind
    fn bind_binding_group(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()>;

    /// Push constants to the currently bound pipeline
    fn push_constants(&mut self, stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()>;

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()>;

    /// Draw non-indexed vertices (full-screen triangles)
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    /// Draw indexed vertices
    ///
    /// # Arguments
    ///
    /// * `index_count` - Number of indices to draw
    /// * `first_index` - Index of first index
    /// * `vertex_offset` - Value added to vertex index before indexing into the vertex buffer
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;

    /// Record image layout transitions. Must be called outside a render pass.
    fn pipeline_barrier(&mut self, barriers: &[ImageBarrier<'_>]) -> Result<()>;
}

/// Layout transition of a range of array layers of a texture
#[derive(Clone, Copy)]
pub struct ImageBarrier<'a> {
    pub texture: &'a dyn Texture,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub base_layer: u32,
    pub layer_count: u32,
}

impl<'a> ImageBarrier<'a> {
    /// Transition covering every layer of the texture
    pub fn whole(texture: &'a dyn Texture, old_layout: ImageLayout, new_layout: ImageLayout) -> Self {
        Self {
            texture,
            old_layout,
            new_layout,
            base_layer: 0,
            layer_count: texture.info().array_layers,
        }
    }
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering `width` x `height` with the full [0, 1] depth range
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}
