/// Main pass: rasterizes every draw into the G-buffer
/// (normal, albedo, metallic-roughness, depth)

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use crate::error::Result;
use crate::frame::RenderContext;
use crate::graph::draw::StandardVertex;
use crate::graph::pass::{
    begin_pass, create_shader, global_layout, sampled_slots, GraphPass, PassContract, PassKind,
    PassShaders, TargetWrite, PASS_SET,
};
use crate::graph::targets::TargetRole;
use crate::graphics_device::{
    bind_all, AttachmentDesc, Bindable, BindingGroup, BindingGroupLayoutDesc, BindingResource,
    BindingSlotDesc, BindingType, Buffer, ClearValue, CommandList, DepthStencilState,
    GraphicsDevice, Pipeline, PipelineDesc, PrimitiveTopology, PushConstantRange,
    RasterizationState, RenderPass, RenderPassDesc, SamplerType, ShaderStage, ShaderStageFlags,
    Texture,
};

/// Color attachments of the main pass, in attachment order
pub const MAIN_COLOR_TARGETS: [TargetRole; 3] =
    [TargetRole::Normal, TargetRole::Albedo, TargetRole::MetallicRoughness];

/// Per-material uniform data (binding 3 of the material group)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable, PartialEq)]
pub struct MaterialFactors {
    pub base_color: [f32; 4],
    /// x metallic, y roughness
    pub metallic_roughness: [f32; 4],
}

impl MaterialFactors {
    pub const SIZE: u64 = std::mem::size_of::<MaterialFactors>() as u64;
}

impl Default for MaterialFactors {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            metallic_roughness: [0.0, 1.0, 0.0, 0.0],
        }
    }
}

/// Resources of one material, in binding order
pub struct MaterialBindings<'a> {
    pub albedo: &'a dyn Texture,
    pub normal: &'a dyn Texture,
    pub metallic_roughness: &'a dyn Texture,
    pub factors: &'a dyn Buffer,
}

/// Creates material groups compatible with set 1 of the main pipeline.
///
/// Cheap to clone; asset-loading threads hold one.
#[derive(Clone)]
pub struct MaterialLayout {
    pipeline: Arc<dyn Pipeline>,
}

impl MaterialLayout {
    pub fn layout_desc() -> BindingGroupLayoutDesc {
        let mut entries = sampled_slots(3);
        entries.push(BindingSlotDesc::new(3, BindingType::UniformBuffer, ShaderStageFlags::FRAGMENT));
        BindingGroupLayoutDesc { entries }
    }

    pub fn create_group(
        &self,
        device: &dyn GraphicsDevice,
        material: &MaterialBindings<'_>,
    ) -> Result<Arc<dyn BindingGroup>> {
        device.create_binding_group(
            &self.pipeline,
            PASS_SET,
            &[
                BindingResource::SampledTexture(material.albedo, SamplerType::LinearRepeat),
                BindingResource::SampledTexture(material.normal, SamplerType::LinearRepeat),
                BindingResource::SampledTexture(material.metallic_roughness, SamplerType::LinearRepeat),
                BindingResource::UniformBuffer(material.factors),
            ],
        )
    }
}

/// Push constant block: model matrix
pub const MAIN_PUSH_CONSTANT_SIZE: u32 = std::mem::size_of::<Mat4>() as u32;

pub struct MainPass {
    render_pass: Arc<dyn RenderPass>,
    pipeline: Arc<dyn Pipeline>,
    contract: PassContract,
}

impl MainPass {
    pub fn new(device: &dyn GraphicsDevice, shaders: &PassShaders) -> Result<Self> {
        let color_formats: Vec<_> = MAIN_COLOR_TARGETS.iter().map(|role| role.format()).collect();
        let depth_format = TargetRole::Depth.format();

        let render_pass = device.create_render_pass(&RenderPassDesc {
            color_attachments: color_formats.iter().map(|&f| AttachmentDesc::cleared(f)).collect(),
            depth_attachment: Some(AttachmentDesc::cleared(depth_format)),
        })?;

        let pipeline = device.create_pipeline(PipelineDesc {
            label: "main".to_string(),
            vertex_shader: create_shader(device, &shaders.main_vertex, ShaderStage::Vertex)?,
            fragment_shader: Some(create_shader(device, &shaders.main_fragment, ShaderStage::Fragment)?),
            vertex_layout: StandardVertex::layout(),
            topology: PrimitiveTopology::TriangleList,
            push_constant_ranges: vec![PushConstantRange {
                stages: ShaderStageFlags::VERTEX,
                offset: 0,
                size: MAIN_PUSH_CONSTANT_SIZE,
            }],
            binding_group_layouts: vec![global_layout(), MaterialLayout::layout_desc()],
            rasterization: RasterizationState::default(),
            depth_stencil: DepthStencilState::default(),
            color_formats,
            depth_format: Some(depth_format),
        })?;

        let mut outputs: Vec<TargetWrite> =
            MAIN_COLOR_TARGETS.iter().map(|&role| TargetWrite::sampled_after(role)).collect();
        outputs.push(TargetWrite::sampled_after(TargetRole::Depth));

        Ok(Self {
            render_pass,
            pipeline,
            contract: PassContract { inputs: Vec::new(), outputs },
        })
    }

    /// Pipeline owning set 0 (globals) and set 1 (materials)
    pub fn pipeline(&self) -> &Arc<dyn Pipeline> {
        &self.pipeline
    }

    pub fn material_layout(&self) -> MaterialLayout {
        MaterialLayout { pipeline: Arc::clone(&self.pipeline) }
    }
}

impl GraphPass for MainPass {
    fn kind(&self) -> PassKind {
        PassKind::Main
    }

    fn contract(&self) -> &PassContract {
        &self.contract
    }

    fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    fn record(&self, cmd: &mut dyn CommandList, ctx: &RenderContext<'_>) -> Result<()> {
        let [r, g, b, a] = ctx.clear_color;
        let clears = [
            ClearValue::Color([0.0, 0.0, 0.0, 0.0]),
            ClearValue::Color([r, g, b, a]),
            ClearValue::Color([0.0, 0.0, 0.0, 0.0]),
            ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
        ];
        begin_pass(cmd, &self.render_pass, ctx.targets().main_framebuffer(), &clears, ctx.draw_extent)?;

        bind_all(&Bindable::pipeline_state(&self.pipeline, &[ctx.global_group]), cmd)?;

        let mut bound_material: Option<*const ()> = None;
        for draw in ctx.ordered_draws() {
            let material = draw.material.as_ref().unwrap_or(ctx.defaults.material_group());
            let material_ptr = Arc::as_ptr(material) as *const ();
            if bound_material != Some(material_ptr) {
                Bindable::BindingGroup {
                    pipeline: Arc::clone(&self.pipeline),
                    set_index: PASS_SET,
                    group: Arc::clone(material),
                }
                .bind(cmd)?;
                bound_material = Some(material_ptr);
            }
            bind_all(&Bindable::mesh(&draw.vertex_buffer, &draw.index_buffer, draw.index_type), cmd)?;
            cmd.push_constants(ShaderStageFlags::VERTEX, 0, bytemuck::bytes_of(&draw.transform))?;
            cmd.draw_indexed(draw.index_count, draw.first_index, draw.vertex_offset)?;
            ctx.count_draw();
        }

        cmd.end_render_pass()
    }
}
