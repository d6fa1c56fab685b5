use crate::graphics_device::bindable::*;
use crate::graphics_device::mock_graphics_device::{MockBindingGroupHandle, MockBuffer, MockCommandList, MockPipeline};
use crate::graphics_device::{BindingGroup, Buffer, CommandList, IndexType, Pipeline};
use std::sync::Arc;

fn pipeline() -> Arc<dyn Pipeline> {
    Arc::new(MockPipeline { label: "lighting".to_string(), layouts: Vec::new(), push_constant_bytes: 0 })
}

fn group(set_index: u32) -> Arc<dyn BindingGroup> {
    Arc::new(MockBindingGroupHandle(set_index))
}

fn recording() -> MockCommandList {
    let mut cmd = MockCommandList::new();
    cmd.begin().unwrap();
    cmd
}

// ============================================================================
// BIND TESTS
// ============================================================================

#[test]
fn test_each_variant_records_its_bind() {
    let pipeline = pipeline();
    let vertices: Arc<dyn Buffer> = Arc::new(MockBuffer::new(64, "vertices".to_string()));
    let indices: Arc<dyn Buffer> = Arc::new(MockBuffer::new(32, "indices".to_string()));
    let state = [
        Bindable::Pipeline(Arc::clone(&pipeline)),
        Bindable::BindingGroup { pipeline: Arc::clone(&pipeline), set_index: 1, group: group(1) },
        Bindable::VertexBuffer { buffer: vertices, offset: 16 },
        Bindable::IndexBuffer { buffer: indices, offset: 8, index_type: IndexType::U16 },
    ];

    let mut cmd = recording();
    bind_all(&state, &mut cmd).unwrap();

    assert_eq!(
        &cmd.commands[1..],
        &[
            "bind_pipeline lighting",
            "bind_binding_group set=1",
            "bind_vertex_buffer 16",
            "bind_index_buffer 8 U16",
        ]
    );
}

#[test]
fn test_pipeline_state_numbers_sets_in_order() {
    let pipeline = pipeline();
    let global = group(0);
    let inputs = group(1);
    let state = Bindable::pipeline_state(&pipeline, &[&global, &inputs]);
    assert_eq!(state.len(), 3);

    let mut cmd = recording();
    bind_all(&state, &mut cmd).unwrap();
    assert_eq!(
        &cmd.commands[1..],
        &["bind_pipeline lighting", "bind_binding_group set=0", "bind_binding_group set=1"]
    );
}

#[test]
fn test_mesh_binds_both_buffers_from_start() {
    let vertices: Arc<dyn Buffer> = Arc::new(MockBuffer::new(64, "vertices".to_string()));
    let indices: Arc<dyn Buffer> = Arc::new(MockBuffer::new(32, "indices".to_string()));

    let mut cmd = recording();
    bind_all(&Bindable::mesh(&vertices, &indices, IndexType::U32), &mut cmd).unwrap();
    assert_eq!(&cmd.commands[1..], &["bind_vertex_buffer 0", "bind_index_buffer 0 U32"]);
}

#[test]
fn test_bind_outside_recording_fails() {
    let mut cmd = MockCommandList::new();
    assert!(Bindable::Pipeline(pipeline()).bind(&mut cmd).is_err());
}

#[test]
fn test_destroy_releases_reference() {
    let pipeline = pipeline();
    let bindable = Bindable::Pipeline(Arc::clone(&pipeline));
    assert_eq!(Arc::strong_count(&pipeline), 2);
    bindable.destroy();
    assert_eq!(Arc::strong_count(&pipeline), 1);
}
