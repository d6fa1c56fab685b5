/// Draw items supplied by the scene layer, and their submission order

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use rdst::RadixSort;
use rustc_hash::FxHashMap;
use crate::graphics_device::{
    BindingGroup, Buffer, BufferFormat, IndexType, VertexAttribute, VertexBinding,
    VertexInputRate, VertexLayout,
};

/// Vertex format consumed by the shadow and main passes
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable, PartialEq)]
pub struct StandardVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    /// xyz tangent, w bitangent sign
    pub tangent: [f32; 4],
}

impl StandardVertex {
    pub const STRIDE: u32 = std::mem::size_of::<StandardVertex>() as u32;

    pub fn layout() -> VertexLayout {
        VertexLayout {
            bindings: vec![VertexBinding { binding: 0, stride: Self::STRIDE, input_rate: VertexInputRate::Vertex }],
            attributes: vec![
                VertexAttribute { location: 0, binding: 0, format: BufferFormat::R32G32B32_SFLOAT, offset: 0 },
                VertexAttribute { location: 1, binding: 0, format: BufferFormat::R32G32B32_SFLOAT, offset: 12 },
                VertexAttribute { location: 2, binding: 0, format: BufferFormat::R32G32_SFLOAT, offset: 24 },
                VertexAttribute { location: 3, binding: 0, format: BufferFormat::R32G32B32A32_SFLOAT, offset: 32 },
            ],
        }
    }
}

/// One indexed draw
///
/// Buffers and the material group are owned by the scene/asset layer; the
/// renderer only binds them.
#[derive(Clone)]
pub struct DrawItem {
    pub vertex_buffer: Arc<dyn Buffer>,
    pub index_buffer: Arc<dyn Buffer>,
    pub index_type: IndexType,
    pub index_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    /// Model-to-world transform, sent as a push constant
    pub transform: Mat4,
    /// Material binding group (set 1 of the main pipeline); `None` uses the default material
    pub material: Option<Arc<dyn BindingGroup>>,
    pub casts_shadow: bool,
}

/// Draw order grouping items that share a material, stable within a group.
///
/// Materials get dense ids in first-seen order; the key packs the id above
/// the item index so the radix sort keeps submission order inside a group.
pub fn material_order(draws: &[DrawItem]) -> Vec<usize> {
    let mut ids: FxHashMap<usize, u64> = FxHashMap::default();
    let mut keys: Vec<u64> = draws
        .iter()
        .enumerate()
        .map(|(index, draw)| {
            let material = draw
                .material
                .as_ref()
                .map(|group| Arc::as_ptr(group) as *const () as usize)
                .unwrap_or(0);
            let next = ids.len() as u64;
            let id = *ids.entry(material).or_insert(next);
            (id << 32) | index as u64
        })
        .collect();
    keys.radix_sort_unstable();
    keys.into_iter().map(|key| (key & 0xFFFF_FFFF) as usize).collect()
}

#[cfg(test)]
#[path = "draw_tests.rs"]
mod tests;
