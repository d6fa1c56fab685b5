/// Shader trait and shader descriptor

use bitflags::bitflags;

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

bitflags! {
    /// Shader stage visibility flags (bindings and push constant ranges)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 0x01;
        const FRAGMENT = 0x02;
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

impl From<ShaderStage> for ShaderStageFlags {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => ShaderStageFlags::FRAGMENT,
        }
    }
}

/// Descriptor for creating a shader module
///
/// `code` is an opaque SPIR-V blob; it is never inspected on the CPU.
#[derive(Debug, Clone)]
pub struct ShaderDesc<'a> {
    pub code: &'a [u8],
    pub stage: ShaderStage,
    pub entry_point: String,
}

/// Shader module trait
pub trait Shader: Send + Sync {
    fn stage(&self) -> ShaderStage;
}
