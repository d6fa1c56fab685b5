/// Shadow pass: depth-only rendering of shadow casters into each cascade
/// layer of the shadow array

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use crate::error::{Error, Result};
use crate::frame::RenderContext;
use crate::graph::draw::StandardVertex;
use crate::graph::pass::{
    begin_pass, create_shader, global_layout, GraphPass, PassContract, PassKind, PassShaders,
    TargetWrite,
};
use crate::graph::targets::TargetRole;
use crate::graphics_device::{
    bind_all, AttachmentDesc, Bindable, ClearValue, CommandList, CullMode, DepthBias, DepthStencilState,
    Extent2D, GraphicsDevice, Pipeline, PipelineDesc, PrimitiveTopology, PushConstantRange,
    RasterizationState, RenderPass, RenderPassDesc, ShaderStage, ShaderStageFlags,
};
use crate::shadow::CASCADE_COUNT;

/// Per-draw push constants of the shadow pipeline
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ShadowPushConstants {
    pub model: Mat4,
    /// Selects the cascade matrix in the global uniform
    pub cascade_index: u32,
    pub _pad: [u32; 3],
}

/// Slope-scaled depth bias against shadow acne
const SHADOW_DEPTH_BIAS: DepthBias = DepthBias { constant_factor: 1.25, slope_factor: 1.75 };

pub struct ShadowPass {
    render_pass: Arc<dyn RenderPass>,
    pipeline: Arc<dyn Pipeline>,
    contract: PassContract,
}

impl ShadowPass {
    pub fn new(device: &dyn GraphicsDevice, shaders: &PassShaders) -> Result<Self> {
        let depth_format = TargetRole::ShadowDepth.format();
        let render_pass = device.create_render_pass(&RenderPassDesc {
            color_attachments: Vec::new(),
            depth_attachment: Some(AttachmentDesc::cleared(depth_format)),
        })?;

        let pipeline = device.create_pipeline(PipelineDesc {
            label: "shadow".to_string(),
            vertex_shader: create_shader(device, &shaders.shadow_vertex, ShaderStage::Vertex)?,
            fragment_shader: None,
            vertex_layout: StandardVertex::layout(),
            topology: PrimitiveTopology::TriangleList,
            push_constant_ranges: vec![PushConstantRange {
                stages: ShaderStageFlags::VERTEX,
                offset: 0,
                size: std::mem::size_of::<ShadowPushConstants>() as u32,
            }],
            binding_group_layouts: vec![global_layout()],
            rasterization: RasterizationState {
                cull_mode: CullMode::Front,
                depth_bias: Some(SHADOW_DEPTH_BIAS),
                ..Default::default()
            },
            depth_stencil: DepthStencilState::default(),
            color_formats: Vec::new(),
            depth_format: Some(depth_format),
        })?;

        Ok(Self {
            render_pass,
            pipeline,
            contract: PassContract {
                inputs: Vec::new(),
                outputs: vec![TargetWrite::sampled_after(TargetRole::ShadowDepth)],
            },
        })
    }
}

impl GraphPass for ShadowPass {
    fn kind(&self) -> PassKind {
        PassKind::Shadow
    }

    fn contract(&self) -> &PassContract {
        &self.contract
    }

    fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    fn record(&self, cmd: &mut dyn CommandList, ctx: &RenderContext<'_>) -> Result<()> {
        let targets = ctx.targets();
        let resolution = targets.shadow_resolution();
        let extent = Extent2D::new(resolution, resolution);
        let clears = [ClearValue::DepthStencil { depth: 1.0, stencil: 0 }];

        for cascade in 0..CASCADE_COUNT {
            let framebuffer = targets.shadow_framebuffer(cascade).ok_or_else(|| {
                Error::InvalidState(format!("No framebuffer for shadow cascade {}", cascade))
            })?;
            begin_pass(cmd, &self.render_pass, framebuffer, &clears, extent)?;
            bind_all(&Bindable::pipeline_state(&self.pipeline, &[ctx.global_group]), cmd)?;

            for draw in ctx.ordered_draws().filter(|draw| draw.casts_shadow) {
                let constants = ShadowPushConstants {
                    model: draw.transform,
                    cascade_index: cascade as u32,
                    _pad: [0; 3],
                };
                bind_all(&Bindable::mesh(&draw.vertex_buffer, &draw.index_buffer, draw.index_type), cmd)?;
                cmd.push_constants(ShaderStageFlags::VERTEX, 0, bytemuck::bytes_of(&constants))?;
                cmd.draw_indexed(draw.index_count, draw.first_index, draw.vertex_offset)?;
                ctx.count_draw();
            }

            cmd.end_render_pass()?;
        }
        Ok(())
    }
}
