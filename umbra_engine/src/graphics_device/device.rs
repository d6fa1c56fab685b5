/// GraphicsDevice trait - factory for GPU resources and queue submission

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    BindingGroup, BindingResource, Buffer, BufferDesc, CommandList, Fence, Framebuffer,
    FramebufferDesc, Pipeline, PipelineDesc, RenderPass, RenderPassDesc, RenderTarget,
    Semaphore, Shader, ShaderDesc, Texture, TextureDesc,
};

/// Main graphics device trait
///
/// Backend implementations (Vulkan, ...) provide the concrete resource types.
/// All methods take `&self`: the device is shared through `Arc` between the
/// frame orchestrator and asset-loading threads. The memory allocator and the
/// descriptor pool sit behind one internal lock.
pub trait GraphicsDevice: Send + Sync {
    /// Create a texture, uploading `desc.data` if present
    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create an attachment view of one array layer of `texture`
    fn create_render_target_view(&self, texture: &dyn Texture, layer: u32) -> Result<Arc<dyn RenderTarget>>;

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    fn create_framebuffer(&self, desc: &FramebufferDesc<'_>) -> Result<Arc<dyn Framebuffer>>;

    /// Create a host-visible, persistently mapped buffer
    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    fn create_shader(&self, desc: ShaderDesc<'_>) -> Result<Arc<dyn Shader>>;

    fn create_pipeline(&self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Allocate a binding group from the device pool for set `set_index` of `pipeline`
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Pipeline whose layout at `set_index` defines the group's layout
    /// * `set_index` - Descriptor set index
    /// * `resources` - One resource per binding, in binding order
    fn create_binding_group(
        &self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: &[BindingResource<'_>],
    ) -> Result<Arc<dyn BindingGroup>>;

    /// Re-point an existing binding group at new resources.
    ///
    /// The GPU must not be reading the group (callers wait for device idle).
    fn update_binding_group(
        &self,
        binding_group: &Arc<dyn BindingGroup>,
        resources: &[BindingResource<'_>],
    ) -> Result<()>;

    /// Create a command list with its own recording pool
    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>>;

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>>;

    /// Submit recorded commands to the graphics queue
    fn submit(&self, submission: &Submission<'_>) -> Result<()>;

    /// Wait for all GPU work to complete
    fn wait_idle(&self) -> Result<()>;

    fn stats(&self) -> DeviceStats;
}

/// One queue submission
pub struct Submission<'a> {
    pub command_list: &'a dyn CommandList,
    /// Waited on at the color-attachment-output and transfer stages
    pub wait_semaphore: Option<&'a dyn Semaphore>,
    pub signal_semaphore: Option<&'a dyn Semaphore>,
    /// Signaled when the submission completes
    pub fence: Option<&'a dyn Fence>,
}

/// Device-wide statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Binding groups currently allocated from the pool
    pub binding_groups_allocated: u32,
    /// Fixed pool capacity
    pub binding_group_capacity: u32,
    pub submissions: u64,
}
