/// BindingGroup trait and binding group descriptor
///
/// A BindingGroup is a set of GPU resource bindings (textures, buffers, samplers),
/// the backend-agnostic face of a descriptor set. Its layout is taken from the
/// pipeline it is created against; its storage comes from the device's
/// fixed-capacity pool. Groups can be re-pointed in place with
/// `GraphicsDevice::update_binding_group` once the GPU no longer reads them.

use crate::graphics_device::{Buffer, ShaderStageFlags, Texture};

/// Type of resource bound at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    /// Uniform buffer (read-only structured data)
    UniformBuffer,
    /// Combined image sampler (texture + sampler in one binding)
    CombinedImageSampler,
    /// Storage buffer
    StorageBuffer,
}

/// Description of a single binding slot within a BindingGroupLayout
#[derive(Debug, Clone, Copy)]
pub struct BindingSlotDesc {
    /// Binding number (corresponds to `layout(binding = N)` in GLSL)
    pub binding: u32,
    pub binding_type: BindingType,
    /// Number of descriptors at this binding (>1 for arrays)
    pub count: u32,
    pub stage_flags: ShaderStageFlags,
}

impl BindingSlotDesc {
    pub const fn new(binding: u32, binding_type: BindingType, stage_flags: ShaderStageFlags) -> Self {
        Self { binding, binding_type, count: 1, stage_flags }
    }
}

/// Description of a BindingGroup layout
#[derive(Debug, Clone, Default)]
pub struct BindingGroupLayoutDesc {
    pub entries: Vec<BindingSlotDesc>,
}

/// Sampler kinds resolved by the backend's sampler cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerType {
    LinearRepeat,
    LinearClamp,
    NearestRepeat,
    NearestClamp,
    /// Depth comparison sampler (LESS_OR_EQUAL) for shadow lookups
    Shadow,
}

/// A concrete resource to bind into a BindingGroup, in binding order
pub enum BindingResource<'a> {
    UniformBuffer(&'a dyn Buffer),
    /// Sampled texture (the backend resolves the actual GPU sampler from the type)
    SampledTexture(&'a dyn Texture, SamplerType),
    StorageBuffer(&'a dyn Buffer),
}

impl BindingResource<'_> {
    pub fn binding_type(&self) -> BindingType {
        match self {
            BindingResource::UniformBuffer(_) => BindingType::UniformBuffer,
            BindingResource::SampledTexture(..) => BindingType::CombinedImageSampler,
            BindingResource::StorageBuffer(_) => BindingType::StorageBuffer,
        }
    }
}

/// A set of GPU resource bindings.
pub trait BindingGroup: Send + Sync {
    /// Returns the set index this BindingGroup was created for
    fn set_index(&self) -> u32;
}
