/// BindingGroup - Vulkan implementation of the BindingGroup trait
///
/// Wraps a VkDescriptorSet allocated from the device's fixed-capacity pool.
/// The set is returned to the pool when the group is dropped.

use umbra_engine::umbra::render::{
    BindingGroup as RendererBindingGroup, BindingGroupLayoutDesc, BindingResource,
};
use umbra_engine::umbra::Result;
use umbra_engine::{engine_bail, engine_warn};
use ash::vk;
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::binding_type_to_vk;
use crate::vulkan_texture::Texture;

pub struct BindingGroup {
    ctx: Arc<GpuContext>,
    pub(crate) descriptor_set: vk::DescriptorSet,
    set_index: u32,
    /// Layout the set was allocated with, kept to validate updates
    pub(crate) layout: BindingGroupLayoutDesc,
}

impl BindingGroup {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        descriptor_set: vk::DescriptorSet,
        set_index: u32,
        layout: BindingGroupLayoutDesc,
    ) -> Self {
        Self { ctx, descriptor_set, set_index, layout }
    }

    /// # Safety
    ///
    /// `group` must have been created by a `VulkanGraphicsDevice`.
    pub(crate) unsafe fn from_arc(group: &Arc<dyn RendererBindingGroup>) -> &BindingGroup {
        &*(group.as_ref() as *const dyn RendererBindingGroup as *const BindingGroup)
    }
}

impl RendererBindingGroup for BindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

impl Drop for BindingGroup {
    fn drop(&mut self) {
        match self.ctx.lock_shared() {
            Ok(mut shared) => unsafe {
                if self
                    .ctx
                    .device
                    .free_descriptor_sets(shared.descriptor_pool, &[self.descriptor_set])
                    .is_ok()
                {
                    shared.binding_groups_allocated = shared.binding_groups_allocated.saturating_sub(1);
                }
            },
            Err(_) => {
                engine_warn!("umbra::vulkan", "Binding group set {} leaked: device lock poisoned", self.set_index);
            }
        }
    }
}

/// Check `resources` against `layout`: one resource per entry, in order, of the declared type
pub(crate) fn validate_resources(
    layout: &BindingGroupLayoutDesc,
    resources: &[BindingResource<'_>],
    set_index: u32,
) -> Result<()> {
    if resources.len() != layout.entries.len() {
        engine_bail!(
            "umbra::vulkan",
            "Binding group for set {} expects {} resources, got {}",
            set_index, layout.entries.len(), resources.len()
        );
    }
    for (entry, resource) in layout.entries.iter().zip(resources) {
        if entry.binding_type != resource.binding_type() {
            engine_bail!(
                "umbra::vulkan",
                "Set {} binding {}: layout declares {:?}, resource is {:?}",
                set_index, entry.binding, entry.binding_type, resource.binding_type()
            );
        }
    }
    Ok(())
}

enum DescriptorInfo {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

/// Point every binding of `descriptor_set` at `resources`.
///
/// Resources must already be validated against `layout`. Sampled images,
/// depth included, are read in SHADER_READ_ONLY_OPTIMAL.
pub(crate) fn write_descriptors(
    ctx: &GpuContext,
    descriptor_set: vk::DescriptorSet,
    layout: &BindingGroupLayoutDesc,
    resources: &[BindingResource<'_>],
) -> Result<()> {
    let mut infos = Vec::with_capacity(resources.len());
    for resource in resources {
        let info = match resource {
            BindingResource::UniformBuffer(buffer) | BindingResource::StorageBuffer(buffer) => {
                let vk_buffer = unsafe { Buffer::from_dyn(*buffer) };
                DescriptorInfo::Buffer(
                    vk::DescriptorBufferInfo::default()
                        .buffer(vk_buffer.buffer)
                        .offset(0)
                        .range(vk::WHOLE_SIZE),
                )
            }
            BindingResource::SampledTexture(texture, sampler_type) => {
                let vk_texture = unsafe { Texture::from_dyn(*texture) };
                let sampler = ctx.sampler(*sampler_type)?;
                DescriptorInfo::Image(
                    vk::DescriptorImageInfo::default()
                        .sampler(sampler)
                        .image_view(vk_texture.view)
                        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
                )
            }
        };
        infos.push(info);
    }

    let writes: Vec<vk::WriteDescriptorSet> = layout
        .entries
        .iter()
        .zip(&infos)
        .map(|(entry, info)| {
            let write = vk::WriteDescriptorSet::default()
                .dst_set(descriptor_set)
                .dst_binding(entry.binding)
                .dst_array_element(0)
                .descriptor_type(binding_type_to_vk(entry.binding_type));
            match info {
                DescriptorInfo::Buffer(buffer_info) => write.buffer_info(std::slice::from_ref(buffer_info)),
                DescriptorInfo::Image(image_info) => write.image_info(std::slice::from_ref(image_info)),
            }
        })
        .collect();

    unsafe {
        ctx.device.update_descriptor_sets(&writes, &[]);
    }
    Ok(())
}


#[cfg(test)]
#[path = "vulkan_binding_group_tests.rs"]
mod tests;
