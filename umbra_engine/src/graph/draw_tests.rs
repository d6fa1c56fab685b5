//! Unit tests for draw.rs

use crate::graph::draw::*;
use crate::graphics_device::mock_graphics_device::{MockBindingGroupHandle, MockBuffer};
use crate::graphics_device::{BindingGroup, Buffer, IndexType};
use glam::Mat4;
use std::sync::Arc;

fn draw(material: Option<Arc<dyn BindingGroup>>) -> DrawItem {
    let buffer: Arc<dyn Buffer> = Arc::new(MockBuffer::new(64, "mesh".to_string()));
    DrawItem {
        vertex_buffer: Arc::clone(&buffer),
        index_buffer: buffer,
        index_type: IndexType::U32,
        index_count: 36,
        first_index: 0,
        vertex_offset: 0,
        transform: Mat4::IDENTITY,
        material,
        casts_shadow: true,
    }
}

#[test]
fn test_standard_vertex_layout() {
    assert_eq!(StandardVertex::STRIDE, 48);
    let layout = StandardVertex::layout();
    assert_eq!(layout.attributes.len(), 4);
    assert_eq!(layout.attributes[3].offset, 32);
}

#[test]
fn test_material_order_groups_materials() {
    let a: Arc<dyn BindingGroup> = Arc::new(MockBindingGroupHandle(1));
    let b: Arc<dyn BindingGroup> = Arc::new(MockBindingGroupHandle(1));
    let draws = vec![
        draw(Some(Arc::clone(&a))),
        draw(Some(Arc::clone(&b))),
        draw(Some(Arc::clone(&a))),
        draw(None),
        draw(Some(Arc::clone(&b))),
    ];
    assert_eq!(material_order(&draws), vec![0, 2, 1, 4, 3]);
}

#[test]
fn test_material_order_empty() {
    assert!(material_order(&[]).is_empty());
}
