/// Pass trait and the target contract each pass declares.
///
/// A pass records its commands between begin_render_pass() and
/// end_render_pass(). Layout transitions around it are not its concern: the
/// graph reads the pass contract and records the barriers.

use std::sync::Arc;
use crate::error::Result;
use crate::frame::RenderContext;
use crate::graph::targets::{GBufferTargets, TargetRole};
use crate::graphics_device::{
    BindingGroupLayoutDesc, BindingSlotDesc, BindingType, ClearValue, CommandList, Extent2D,
    Framebuffer, GraphicsDevice, ImageLayout, Rect2D, RenderPass, Shader, ShaderDesc,
    ShaderStage, ShaderStageFlags, Viewport,
};

/// Pass identity, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassKind {
    Shadow,
    Main,
    Ssao,
    Light,
}

/// A target written as an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetWrite {
    pub role: TargetRole,
    /// Layout while the pass renders into it
    pub attachment_layout: ImageLayout,
    /// Layout the target is left in for later consumers
    pub final_layout: ImageLayout,
}

impl TargetWrite {
    /// Attachment left sampling-ready
    pub fn sampled_after(role: TargetRole) -> Self {
        Self {
            role,
            attachment_layout: attachment_layout(role),
            final_layout: ImageLayout::ShaderReadOnly,
        }
    }
}

/// Targets a pass reads from (inputs, sampled) and writes to (outputs)
#[derive(Debug, Clone, Default)]
pub struct PassContract {
    pub inputs: Vec<TargetRole>,
    pub outputs: Vec<TargetWrite>,
}

/// One node of the G-buffer graph
pub trait GraphPass: Send + Sync {
    fn kind(&self) -> PassKind;

    fn contract(&self) -> &PassContract;

    fn render_pass(&self) -> &Arc<dyn RenderPass>;

    /// Point the pass's own binding groups at the current targets.
    ///
    /// The first call creates them; later calls (after a rebuild) update them
    /// in place. The GPU must be idle.
    fn bind_targets(&mut self, _device: &dyn GraphicsDevice, _targets: &GBufferTargets) -> Result<()> {
        Ok(())
    }

    /// Record the pass. Every input is already sampling-ready and every
    /// output in its attachment layout.
    fn record(&self, cmd: &mut dyn CommandList, ctx: &RenderContext<'_>) -> Result<()>;
}

/// Opaque SPIR-V blobs for every pass
#[derive(Debug, Clone, Default)]
pub struct PassShaders {
    pub shadow_vertex: Vec<u8>,
    pub main_vertex: Vec<u8>,
    pub main_fragment: Vec<u8>,
    /// Full-screen triangle shared by the SSAO and light passes
    pub fullscreen_vertex: Vec<u8>,
    pub ssao_fragment: Vec<u8>,
    pub light_fragment: Vec<u8>,
}

/// Set index of the per-frame global group in every pipeline
pub const GLOBAL_SET: u32 = 0;
/// Set index of the per-pass or per-material group
pub const PASS_SET: u32 = 1;

/// Layout of the per-frame global group: the `GlobalUniform` buffer
pub fn global_layout() -> BindingGroupLayoutDesc {
    BindingGroupLayoutDesc {
        entries: vec![BindingSlotDesc::new(0, BindingType::UniformBuffer, ShaderStageFlags::VERTEX_FRAGMENT)],
    }
}

/// Fragment-stage sampled textures at bindings `0..count`
pub(crate) fn sampled_slots(count: u32) -> Vec<BindingSlotDesc> {
    (0..count)
        .map(|binding| BindingSlotDesc::new(binding, BindingType::CombinedImageSampler, ShaderStageFlags::FRAGMENT))
        .collect()
}

pub(crate) fn attachment_layout(role: TargetRole) -> ImageLayout {
    if role.format().is_depth() {
        ImageLayout::DepthStencilAttachment
    } else {
        ImageLayout::ColorAttachment
    }
}

pub(crate) fn create_shader(
    device: &dyn GraphicsDevice,
    code: &[u8],
    stage: ShaderStage,
) -> Result<Arc<dyn Shader>> {
    device.create_shader(ShaderDesc { code, stage, entry_point: "main".to_string() })
}

/// Begin `render_pass` on `framebuffer` and cover it with viewport and scissor
pub(crate) fn begin_pass(
    cmd: &mut dyn CommandList,
    render_pass: &Arc<dyn RenderPass>,
    framebuffer: &Arc<dyn Framebuffer>,
    clear_values: &[ClearValue],
    extent: Extent2D,
) -> Result<()> {
    cmd.begin_render_pass(render_pass, framebuffer, clear_values)?;
    cmd.set_viewport(Viewport::full(extent.width, extent.height))?;
    cmd.set_scissor(Rect2D::full(extent.width, extent.height))
}
