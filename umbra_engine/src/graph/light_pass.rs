/// Light pass: resolves the G-buffer into the HDR color target
/// (directional light with cascaded shadows, point lights, ambient, fog)

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::frame::RenderContext;
use crate::graph::pass::{
    attachment_layout, begin_pass, create_shader, global_layout, sampled_slots, GraphPass,
    PassContract, PassKind, PassShaders, TargetWrite, PASS_SET,
};
use crate::graph::targets::{GBufferTargets, TargetRole};
use crate::graphics_device::{
    bind_all, AttachmentDesc, Bindable, BindingGroup, BindingGroupLayoutDesc, BindingResource, ClearValue,
    CommandList, CullMode, DepthStencilState, GraphicsDevice, ImageLayout, Pipeline,
    PipelineDesc, PrimitiveTopology, RasterizationState, RenderPass, RenderPassDesc,
    SamplerType, ShaderStage, VertexLayout,
};

/// Sampled inputs in binding order, with the sampler each one uses
const LIGHT_INPUTS: [(TargetRole, SamplerType); 6] = [
    (TargetRole::Normal, SamplerType::NearestClamp),
    (TargetRole::Albedo, SamplerType::NearestClamp),
    (TargetRole::MetallicRoughness, SamplerType::NearestClamp),
    (TargetRole::Depth, SamplerType::NearestClamp),
    (TargetRole::Occlusion, SamplerType::LinearClamp),
    (TargetRole::ShadowDepth, SamplerType::Shadow),
];

pub struct LightPass {
    render_pass: Arc<dyn RenderPass>,
    pipeline: Arc<dyn Pipeline>,
    contract: PassContract,
    binding_group: Option<Arc<dyn BindingGroup>>,
}

impl LightPass {
    pub fn new(device: &dyn GraphicsDevice, shaders: &PassShaders) -> Result<Self> {
        let color_format = TargetRole::LightColor.format();
        let render_pass = device.create_render_pass(&RenderPassDesc {
            color_attachments: vec![AttachmentDesc::cleared(color_format)],
            depth_attachment: None,
        })?;

        let pipeline = device.create_pipeline(PipelineDesc {
            label: "light".to_string(),
            vertex_shader: create_shader(device, &shaders.fullscreen_vertex, ShaderStage::Vertex)?,
            fragment_shader: Some(create_shader(device, &shaders.light_fragment, ShaderStage::Fragment)?),
            vertex_layout: VertexLayout::default(),
            topology: PrimitiveTopology::TriangleList,
            push_constant_ranges: Vec::new(),
            binding_group_layouts: vec![
                global_layout(),
                BindingGroupLayoutDesc { entries: sampled_slots(LIGHT_INPUTS.len() as u32) },
            ],
            rasterization: RasterizationState { cull_mode: CullMode::None, ..Default::default() },
            depth_stencil: DepthStencilState::disabled(),
            color_formats: vec![color_format],
            depth_format: None,
        })?;

        Ok(Self {
            render_pass,
            pipeline,
            contract: PassContract {
                inputs: LIGHT_INPUTS.iter().map(|(role, _)| *role).collect(),
                // Blit source for presentation
                outputs: vec![TargetWrite {
                    role: TargetRole::LightColor,
                    attachment_layout: attachment_layout(TargetRole::LightColor),
                    final_layout: ImageLayout::TransferSrc,
                }],
            },
            binding_group: None,
        })
    }

    pub fn binding_group(&self) -> Option<&Arc<dyn BindingGroup>> {
        self.binding_group.as_ref()
    }
}

impl GraphPass for LightPass {
    fn kind(&self) -> PassKind {
        PassKind::Light
    }

    fn contract(&self) -> &PassContract {
        &self.contract
    }

    fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    fn bind_targets(&mut self, device: &dyn GraphicsDevice, targets: &GBufferTargets) -> Result<()> {
        let resources: Vec<BindingResource<'_>> = LIGHT_INPUTS
            .iter()
            .map(|&(role, sampler)| BindingResource::SampledTexture(targets.texture(role).as_ref(), sampler))
            .collect();
        if let Some(group) = &self.binding_group {
            return device.update_binding_group(group, &resources);
        }
        self.binding_group = Some(device.create_binding_group(&self.pipeline, PASS_SET, &resources)?);
        Ok(())
    }

    fn record(&self, cmd: &mut dyn CommandList, ctx: &RenderContext<'_>) -> Result<()> {
        let Some(inputs) = &self.binding_group else {
            return Err(Error::InvalidState("Light pass recorded before its inputs were bound".to_string()));
        };

        begin_pass(
            cmd,
            &self.render_pass,
            ctx.targets().light_framebuffer(),
            &[ClearValue::Color(ctx.clear_color)],
            ctx.draw_extent,
        )?;
        bind_all(&Bindable::pipeline_state(&self.pipeline, &[ctx.global_group, inputs]), cmd)?;
        cmd.draw(3, 0)?;
        ctx.count_draw();
        cmd.end_render_pass()
    }
}
