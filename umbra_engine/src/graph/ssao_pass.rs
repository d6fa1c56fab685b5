/// SSAO pass: full-screen hemisphere sampling of depth and normals into the
/// occlusion target

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use crate::config::SsaoConfig;
use crate::error::{Error, Result};
use crate::frame::RenderContext;
use crate::graph::pass::{
    begin_pass, create_shader, global_layout, sampled_slots, GraphPass, PassContract, PassKind,
    PassShaders, TargetWrite, PASS_SET,
};
use crate::graph::targets::{GBufferTargets, TargetRole};
use crate::graphics_device::{
    bind_all, AttachmentDesc, Bindable, BindingGroup, BindingGroupLayoutDesc, BindingResource,
    BindingSlotDesc, BindingType, Buffer, BufferDesc, BufferUsage, ClearValue, CommandList,
    DepthStencilState, Extent2D, GraphicsDevice, Pipeline, PipelineDesc, PrimitiveTopology,
    PushConstantRange, RasterizationState, CullMode, RenderPass, RenderPassDesc, SamplerType,
    ShaderStage, ShaderStageFlags, Texture, TextureData, TextureDesc, TextureFormat,
    TextureUsage, VertexLayout,
};
use crate::ssao::{ssao_rng, SsaoKernel, SsaoNoise};
use crate::engine_debug;

/// Per-frame push constants of the SSAO pipeline
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable, PartialEq)]
pub struct SsaoPushConstants {
    pub radius: f32,
    pub bias: f32,
    /// Draw extent divided by the noise dimension, so the noise image tiles per pixel
    pub noise_scale: [f32; 2],
    pub resolution_scale: f32,
    pub _pad: [f32; 3],
}

impl SsaoPushConstants {
    pub fn new(config: &SsaoConfig, extent: Extent2D, noise_dimension: u32) -> Self {
        let dimension = noise_dimension.max(1) as f32;
        Self {
            radius: config.radius,
            bias: config.bias,
            noise_scale: [extent.width as f32 / dimension, extent.height as f32 / dimension],
            resolution_scale: config.resolution_scale,
            _pad: [0.0; 3],
        }
    }
}

/// Kernel and noise, generated once and uploaded at startup.
///
/// Neither depends on the draw extent; they survive every resize.
pub struct SsaoResources {
    kernel: SsaoKernel,
    kernel_buffer: Arc<dyn Buffer>,
    noise_texture: Arc<dyn Texture>,
}

impl SsaoResources {
    pub fn new(device: &dyn GraphicsDevice, config: &SsaoConfig) -> Result<Self> {
        let mut rng = ssao_rng(config.seed);
        let kernel = SsaoKernel::generate(&mut rng);
        let noise = SsaoNoise::generate(&mut rng, config.noise_dimension);

        let kernel_bytes = kernel.as_bytes();
        let kernel_buffer = device.create_buffer(BufferDesc {
            label: "ssao_kernel".to_string(),
            size: kernel_bytes.len() as u64,
            usage: BufferUsage::Uniform,
        })?;
        kernel_buffer.update(0, kernel_bytes)?;

        let noise_texture = device.create_texture(TextureDesc {
            label: "ssao_noise".to_string(),
            width: noise.dimension(),
            height: noise.dimension(),
            format: TextureFormat::R32G32B32A32_SFLOAT,
            usage: TextureUsage::Sampled,
            array_layers: 1,
            data: Some(TextureData::Single(noise.as_bytes().to_vec())),
        })?;

        engine_debug!(
            "umbra::SsaoPass",
            "SSAO kernel ({} samples) and {}x{} noise uploaded",
            kernel.samples().len(), noise.dimension(), noise.dimension()
        );
        Ok(Self { kernel, kernel_buffer, noise_texture })
    }

    pub fn kernel(&self) -> &SsaoKernel {
        &self.kernel
    }

    pub fn kernel_buffer(&self) -> &Arc<dyn Buffer> {
        &self.kernel_buffer
    }

    pub fn noise_texture(&self) -> &Arc<dyn Texture> {
        &self.noise_texture
    }
}

pub struct SsaoPass {
    render_pass: Arc<dyn RenderPass>,
    pipeline: Arc<dyn Pipeline>,
    contract: PassContract,
    config: SsaoConfig,
    resources: SsaoResources,
    binding_group: Option<Arc<dyn BindingGroup>>,
}

impl SsaoPass {
    pub fn new(device: &dyn GraphicsDevice, shaders: &PassShaders, config: &SsaoConfig) -> Result<Self> {
        let color_format = TargetRole::Occlusion.format();
        let render_pass = device.create_render_pass(&RenderPassDesc {
            color_attachments: vec![AttachmentDesc::cleared(color_format)],
            depth_attachment: None,
        })?;

        let mut inputs = sampled_slots(3);
        inputs.push(BindingSlotDesc::new(3, BindingType::UniformBuffer, ShaderStageFlags::FRAGMENT));

        let pipeline = device.create_pipeline(PipelineDesc {
            label: "ssao".to_string(),
            vertex_shader: create_shader(device, &shaders.fullscreen_vertex, ShaderStage::Vertex)?,
            fragment_shader: Some(create_shader(device, &shaders.ssao_fragment, ShaderStage::Fragment)?),
            vertex_layout: VertexLayout::default(),
            topology: PrimitiveTopology::TriangleList,
            push_constant_ranges: vec![PushConstantRange {
                stages: ShaderStageFlags::FRAGMENT,
                offset: 0,
                size: std::mem::size_of::<SsaoPushConstants>() as u32,
            }],
            binding_group_layouts: vec![global_layout(), BindingGroupLayoutDesc { entries: inputs }],
            rasterization: RasterizationState { cull_mode: CullMode::None, ..Default::default() },
            depth_stencil: DepthStencilState::disabled(),
            color_formats: vec![color_format],
            depth_format: None,
        })?;

        Ok(Self {
            render_pass,
            pipeline,
            contract: PassContract {
                inputs: vec![TargetRole::Depth, TargetRole::Normal],
                outputs: vec![TargetWrite::sampled_after(TargetRole::Occlusion)],
            },
            config: config.clone(),
            resources: SsaoResources::new(device, config)?,
            binding_group: None,
        })
    }

    pub fn resources(&self) -> &SsaoResources {
        &self.resources
    }

    pub fn binding_group(&self) -> Option<&Arc<dyn BindingGroup>> {
        self.binding_group.as_ref()
    }
}

impl GraphPass for SsaoPass {
    fn kind(&self) -> PassKind {
        PassKind::Ssao
    }

    fn contract(&self) -> &PassContract {
        &self.contract
    }

    fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    fn bind_targets(&mut self, device: &dyn GraphicsDevice, targets: &GBufferTargets) -> Result<()> {
        let resources = [
            BindingResource::SampledTexture(targets.texture(TargetRole::Depth).as_ref(), SamplerType::NearestClamp),
            BindingResource::SampledTexture(targets.texture(TargetRole::Normal).as_ref(), SamplerType::NearestClamp),
            BindingResource::SampledTexture(self.resources.noise_texture.as_ref(), SamplerType::NearestRepeat),
            BindingResource::UniformBuffer(self.resources.kernel_buffer.as_ref()),
        ];
        if let Some(group) = &self.binding_group {
            return device.update_binding_group(group, &resources);
        }
        self.binding_group = Some(device.create_binding_group(&self.pipeline, PASS_SET, &resources)?);
        Ok(())
    }

    fn record(&self, cmd: &mut dyn CommandList, ctx: &RenderContext<'_>) -> Result<()> {
        let Some(inputs) = &self.binding_group else {
            return Err(Error::InvalidState("SSAO pass recorded before its inputs were bound".to_string()));
        };
        let constants = SsaoPushConstants::new(&self.config, ctx.draw_extent, self.resources.noise_texture.info().width);

        begin_pass(
            cmd,
            &self.render_pass,
            ctx.targets().ssao_framebuffer(),
            &[ClearValue::Color([1.0, 1.0, 1.0, 1.0])],
            ctx.draw_extent,
        )?;
        bind_all(&Bindable::pipeline_state(&self.pipeline, &[ctx.global_group, inputs]), cmd)?;
        cmd.push_constants(ShaderStageFlags::FRAGMENT, 0, bytemuck::bytes_of(&constants))?;
        cmd.draw(3, 0)?;
        ctx.count_draw();
        cmd.end_render_pass()
    }
}
