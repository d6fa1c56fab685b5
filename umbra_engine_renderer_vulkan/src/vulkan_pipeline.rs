/// Pipeline - Vulkan implementation of the Pipeline trait

use umbra_engine::umbra::render::{BindingGroupLayoutDesc, Pipeline as RendererPipeline};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Graphics pipeline with the layout objects it owns
pub struct Pipeline {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) pipeline_layout: vk::PipelineLayout,
    /// One per set index; binding groups are allocated against these
    pub(crate) descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,
    /// Layout descriptions, used to validate binding group resources
    pub(crate) binding_group_layouts: Vec<BindingGroupLayoutDesc>,
    label: String,
}

impl Pipeline {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        pipeline: vk::Pipeline,
        pipeline_layout: vk::PipelineLayout,
        descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,
        binding_group_layouts: Vec<BindingGroupLayoutDesc>,
        label: String,
    ) -> Self {
        Self {
            ctx,
            pipeline,
            pipeline_layout,
            descriptor_set_layouts,
            binding_group_layouts,
            label,
        }
    }

    /// # Safety
    ///
    /// `pipeline` must have been created by a `VulkanGraphicsDevice`.
    pub(crate) unsafe fn from_arc(pipeline: &Arc<dyn RendererPipeline>) -> &Pipeline {
        &*(pipeline.as_ref() as *const dyn RendererPipeline as *const Pipeline)
    }
}

impl RendererPipeline for Pipeline {
    fn label(&self) -> &str {
        &self.label
    }

    fn binding_group_layout_count(&self) -> u32 {
        self.descriptor_set_layouts.len() as u32
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
            for layout in self.descriptor_set_layouts.drain(..) {
                self.ctx.device.destroy_descriptor_set_layout(layout, None);
            }
        }
    }
}
