/// CommandList - Vulkan implementation of the CommandList trait

use umbra_engine::umbra::Result;
use umbra_engine::umbra::render::{
    BindingGroup as RendererBindingGroup, Buffer as RendererBuffer, ClearValue,
    CommandList as RendererCommandList, Framebuffer as RendererFramebuffer, ImageBarrier,
    IndexType, Pipeline as RendererPipeline, Rect2D, RenderPass as RendererRenderPass,
    ShaderStageFlags, Viewport,
};
use umbra_engine::{engine_bail, engine_err};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_binding_group::BindingGroup;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    attachment_aspect, image_layout_to_vk, index_type_to_vk, layout_stage_access, stage_flags_to_vk,
};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_texture::Texture;

/// Vulkan command list implementation
///
/// Owns its command pool, so lists of different frame slots can be recorded
/// and reset independently.
pub struct CommandList {
    ctx: Arc<GpuContext>,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    is_recording: bool,
    in_render_pass: bool,
    /// Layout of the bound pipeline (for push constants)
    bound_pipeline_layout: Option<vk::PipelineLayout>,
}

impl CommandList {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = ctx
                .device
                .create_command_pool(&command_pool_create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create command pool: {:?}", e))?;

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = match ctx.device.allocate_command_buffers(&command_buffer_allocate_info) {
                Ok(buffers) => buffers,
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    engine_bail!("umbra::vulkan", "Failed to allocate command buffer: {:?}", e);
                }
            };

            Ok(Self {
                ctx,
                command_pool,
                command_buffer: command_buffers[0],
                is_recording: false,
                in_render_pass: false,
                bound_pipeline_layout: None,
            })
        }
    }

    /// # Safety
    ///
    /// `command_list` must have been created by a `VulkanGraphicsDevice`.
    pub(crate) unsafe fn from_dyn(command_list: &dyn RendererCommandList) -> &CommandList {
        &*(command_list as *const dyn RendererCommandList as *const CommandList)
    }

    pub(crate) fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    pub(crate) fn is_recording(&self) -> bool {
        self.is_recording
    }

    /// Command buffer for raw transfer commands recorded by the backend itself
    /// (present blit). Only valid while recording and outside a render pass.
    pub(crate) fn transfer_commands(&self) -> Result<vk::CommandBuffer> {
        self.ensure_outside_render_pass("record transfer commands")?;
        Ok(self.command_buffer)
    }

    fn ensure_recording(&self, operation: &str) -> Result<()> {
        if !self.is_recording {
            engine_bail!("umbra::vulkan", "Cannot {}: command list not recording", operation);
        }
        Ok(())
    }

    fn ensure_in_render_pass(&self, operation: &str) -> Result<()> {
        self.ensure_recording(operation)?;
        if !self.in_render_pass {
            engine_bail!("umbra::vulkan", "Cannot {}: not inside a render pass", operation);
        }
        Ok(())
    }

    fn ensure_outside_render_pass(&self, operation: &str) -> Result<()> {
        self.ensure_recording(operation)?;
        if self.in_render_pass {
            engine_bail!("umbra::vulkan", "Cannot {}: inside a render pass", operation);
        }
        Ok(())
    }
}

impl RendererCommandList for CommandList {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            engine_bail!("umbra::vulkan", "Command list already recording");
        }

        unsafe {
            self.ctx
                .device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to reset command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.ctx
                .device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to begin command buffer: {:?}", e))?;
        }

        self.is_recording = true;
        self.in_render_pass = false;
        self.bound_pipeline_layout = None;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.ensure_outside_render_pass("end command list")?;

        unsafe {
            self.ctx
                .device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to end command buffer: {:?}", e))?;
        }

        self.is_recording = false;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RendererRenderPass>,
        framebuffer: &Arc<dyn RendererFramebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.ensure_outside_render_pass("begin render pass")?;

        let vk_render_pass = unsafe { &*(render_pass.as_ref() as *const dyn RendererRenderPass as *const RenderPass) };
        let vk_framebuffer = unsafe { &*(framebuffer.as_ref() as *const dyn RendererFramebuffer as *const Framebuffer) };

        let vk_clear_values: Vec<vk::ClearValue> = clear_values
            .iter()
            .map(|cv| match cv {
                ClearValue::Color(color) => vk::ClearValue {
                    color: vk::ClearColorValue { float32: *color },
                },
                ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue { depth: *depth, stencil: *stencil },
                },
            })
            .collect();

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .framebuffer(vk_framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: framebuffer.width(),
                    height: framebuffer.height(),
                },
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.ctx.device.cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_info,
                vk::SubpassContents::INLINE,
            );
        }

        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.ensure_in_render_pass("end render pass")?;

        unsafe {
            self.ctx.device.cmd_end_render_pass(self.command_buffer);
        }
        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_recording("set viewport")?;

        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);

        unsafe {
            self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.ensure_recording("set scissor")?;

        let vk_scissor = vk::Rect2D::default()
            .offset(vk::Offset2D { x: scissor.x, y: scissor.y })
            .extent(vk::Extent2D { width: scissor.width, height: scissor.height });

        unsafe {
            self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn RendererPipeline>) -> Result<()> {
        self.ensure_recording("bind pipeline")?;

        let vk_pipeline = unsafe { Pipeline::from_arc(pipeline) };
        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline,
            );
        }

        self.bound_pipeline_layout = Some(vk_pipeline.pipeline_layout);
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        pipeline: &Arc<dyn RendererPipeline>,
        set_index: u32,
        binding_group: &Arc<dyn RendererBindingGroup>,
    ) -> Result<()> {
        self.ensure_recording("bind binding group")?;

        let vk_pipeline = unsafe { Pipeline::from_arc(pipeline) };
        let vk_group = unsafe { BindingGroup::from_arc(binding_group) };

        if set_index >= vk_pipeline.binding_group_layout_count() {
            engine_bail!(
                "umbra::vulkan",
                "Pipeline '{}' has no binding group layout at set {}",
                vk_pipeline.label(), set_index
            );
        }

        unsafe {
            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline_layout,
                set_index,
                &[vk_group.descriptor_set],
                &[],
            );
        }
        Ok(())
    }

    fn push_constants(&mut self, stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()> {
        self.ensure_recording("push constants")?;

        let layout = self
            .bound_pipeline_layout
            .ok_or_else(|| engine_err!("umbra::vulkan", "No pipeline bound for push constants"))?;

        unsafe {
            self.ctx.device.cmd_push_constants(
                self.command_buffer,
                layout,
                stage_flags_to_vk(stages),
                offset,
                data,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn RendererBuffer>, offset: u64) -> Result<()> {
        self.ensure_recording("bind vertex buffer")?;

        let vk_buffer = unsafe { Buffer::from_dyn(buffer.as_ref()) };
        unsafe {
            self.ctx
                .device
                .cmd_bind_vertex_buffers(self.command_buffer, 0, &[vk_buffer.buffer], &[offset]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn RendererBuffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.ensure_recording("bind index buffer")?;

        let vk_buffer = unsafe { Buffer::from_dyn(buffer.as_ref()) };
        unsafe {
            self.ctx.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk_buffer.buffer,
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.ensure_in_render_pass("draw")?;

        unsafe {
            self.ctx.device.cmd_draw(
                self.command_buffer,
                vertex_count,
                1, // instance_count
                first_vertex,
                0, // first_instance
            );
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.ensure_in_render_pass("draw indexed")?;

        unsafe {
            self.ctx.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                1, // instance_count
                first_index,
                vertex_offset,
                0, // first_instance
            );
        }
        Ok(())
    }

    fn pipeline_barrier(&mut self, barriers: &[ImageBarrier<'_>]) -> Result<()> {
        self.ensure_outside_render_pass("record pipeline barrier")?;
        if barriers.is_empty() {
            return Ok(());
        }

        // One vkCmdPipelineBarrier for the whole batch
        let mut src_stages = vk::PipelineStageFlags::empty();
        let mut dst_stages = vk::PipelineStageFlags::empty();
        let mut image_barriers = Vec::with_capacity(barriers.len());

        for barrier in barriers {
            let texture = unsafe { Texture::from_dyn(barrier.texture) };
            let (src_stage, src_access) = layout_stage_access(barrier.old_layout);
            let (dst_stage, dst_access) = layout_stage_access(barrier.new_layout);
            src_stages |= src_stage;
            dst_stages |= dst_stage;

            image_barriers.push(
                vk::ImageMemoryBarrier::default()
                    .old_layout(image_layout_to_vk(barrier.old_layout))
                    .new_layout(image_layout_to_vk(barrier.new_layout))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(texture.image)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: attachment_aspect(texture.info.format),
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: barrier.base_layer,
                        layer_count: barrier.layer_count,
                    })
                    .src_access_mask(src_access)
                    .dst_access_mask(dst_access),
            );
        }

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                self.command_buffer,
                src_stages,
                dst_stages,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &image_barriers,
            );
        }
        Ok(())
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            // Command buffer is freed with its pool
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
