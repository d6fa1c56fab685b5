/// Pipeline trait and pipeline descriptor

use std::sync::Arc;
use crate::graphics_device::{
    BindingGroupLayoutDesc, Shader, ShaderStageFlags, TextureFormat,
};

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 16-bit indices (max 65535 vertices)
    U16,
    /// 32-bit indices
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Vertex attribute format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
}

impl BufferFormat {
    pub fn size_bytes(&self) -> u32 {
        match self {
            BufferFormat::R32_SFLOAT => 4,
            BufferFormat::R32G32_SFLOAT => 8,
            BufferFormat::R32G32B32_SFLOAT => 12,
            BufferFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInputRate {
    Vertex,
    Instance,
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    /// Binding index
    pub binding: u32,
    pub format: BufferFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Vertex binding description
#[derive(Debug, Clone, Copy)]
pub struct VertexBinding {
    pub binding: u32,
    /// Stride in bytes between consecutive elements
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// Vertex input layout. Empty for full-screen passes that generate vertices in the shader.
#[derive(Debug, Clone, Default)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

/// Push constant range descriptor
#[derive(Debug, Clone, Copy)]
pub struct PushConstantRange {
    pub stages: ShaderStageFlags,
    /// Offset in bytes
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
}

// ===== RASTERIZATION / DEPTH STATE =====

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Front face winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

/// Comparison operator for depth testing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    Always,
}

/// Constant + slope-scaled depth bias (shadow acne mitigation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBias {
    pub constant_factor: f32,
    pub slope_factor: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct RasterizationState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub depth_bias: Option<DepthBias>,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            depth_bias: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DepthStencilState {
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare_op: CompareOp,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare_op: CompareOp::Less,
        }
    }
}

impl DepthStencilState {
    /// No depth test, no depth write (full-screen passes)
    pub fn disabled() -> Self {
        Self {
            depth_test_enable: false,
            depth_write_enable: false,
            depth_compare_op: CompareOp::Always,
        }
    }
}

// ===== PIPELINE DESC =====

/// Descriptor for creating a graphics pipeline
///
/// The attachment formats must match the render pass the pipeline is used in.
/// A depth-only pipeline (shadow pass) has no fragment shader and no color formats.
#[derive(Clone)]
pub struct PipelineDesc {
    /// Debug name, also recorded by the mock backend
    pub label: String,
    pub vertex_shader: Arc<dyn Shader>,
    pub fragment_shader: Option<Arc<dyn Shader>>,
    pub vertex_layout: VertexLayout,
    pub topology: PrimitiveTopology,
    pub push_constant_ranges: Vec<PushConstantRange>,
    /// One layout per descriptor set, in set-index order
    pub binding_group_layouts: Vec<BindingGroupLayoutDesc>,
    pub rasterization: RasterizationState,
    pub depth_stencil: DepthStencilState,
    pub color_formats: Vec<TextureFormat>,
    pub depth_format: Option<TextureFormat>,
}

/// Graphics pipeline trait
pub trait Pipeline: Send + Sync {
    fn label(&self) -> &str;

    /// Number of binding group layouts (descriptor sets) declared at creation
    fn binding_group_layout_count(&self) -> u32;
}
