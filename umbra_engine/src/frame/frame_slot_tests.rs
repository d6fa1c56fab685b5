//! Unit tests for frame_slot.rs

use crate::frame::frame_slot::*;
use crate::graph::global_layout;
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{
    DepthStencilState, GraphicsDevice, Pipeline, PipelineDesc, PrimitiveTopology,
    RasterizationState, ShaderDesc, ShaderStage, VertexLayout,
};
use crate::error::Error;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn global_pipeline(device: &MockGraphicsDevice) -> Arc<dyn Pipeline> {
    let vs = device
        .create_shader(ShaderDesc { code: &[], stage: ShaderStage::Vertex, entry_point: "main".to_string() })
        .unwrap();
    device
        .create_pipeline(PipelineDesc {
            label: "globals".to_string(),
            vertex_shader: vs,
            fragment_shader: None,
            vertex_layout: VertexLayout::default(),
            topology: PrimitiveTopology::TriangleList,
            push_constant_ranges: Vec::new(),
            binding_group_layouts: vec![global_layout()],
            rasterization: RasterizationState::default(),
            depth_stencil: DepthStencilState::default(),
            color_formats: Vec::new(),
            depth_format: None,
        })
        .unwrap()
}

fn make_slot(device: &MockGraphicsDevice) -> FrameSlot {
    let pipeline = global_pipeline(device);
    FrameSlot::new(device, 0, &pipeline).unwrap()
}

// ============================================================================
// Creation
// ============================================================================

#[test]
fn test_new_slot_is_idle_with_signaled_fence() {
    let device = MockGraphicsDevice::new();
    let mut slot = make_slot(&device);

    assert_eq!(slot.state(), SlotState::Idle);
    assert_eq!(slot.image_index(), None);
    assert!(slot.wait_for_gpu(TIMEOUT).is_ok());
    assert_eq!(slot.fence_waits(), 1);
}

#[test]
fn test_uniform_buffer_holds_global_uniform() {
    let device = MockGraphicsDevice::new();
    let slot = make_slot(&device);
    assert_eq!(slot.uniform_buffer().size(), crate::frame::GlobalUniform::SIZE);
    assert_eq!(slot.global_group().set_index(), 0);
}

// ============================================================================
// State machine
// ============================================================================

#[test]
fn test_full_cycle() {
    let device = MockGraphicsDevice::new();
    let mut slot = make_slot(&device);

    slot.wait_for_gpu(TIMEOUT).unwrap();
    slot.mark_acquired(2).unwrap();
    assert_eq!(slot.image_index(), Some(2));
    slot.advance(SlotState::Recording).unwrap();
    slot.command_list_mut().begin().unwrap();
    slot.command_list_mut().end().unwrap();
    slot.submit(&device).unwrap();
    assert_eq!(slot.state(), SlotState::Submitted);
    slot.advance(SlotState::Presented).unwrap();

    // Submission signaled the fence
    slot.wait_for_gpu(TIMEOUT).unwrap();
    assert_eq!(slot.state(), SlotState::Idle);
    assert_eq!(slot.fence_waits(), 2);
    assert_eq!(device.ledger().lock().unwrap().submissions, 1);
}

#[test]
fn test_out_of_order_transitions_rejected() {
    let device = MockGraphicsDevice::new();
    let mut slot = make_slot(&device);

    assert!(matches!(slot.advance(SlotState::Recording), Err(Error::InvalidState(_))));
    assert!(matches!(slot.submit(&device), Err(Error::InvalidState(_))));

    slot.mark_acquired(0).unwrap();
    assert!(matches!(slot.wait_for_gpu(TIMEOUT), Err(Error::InvalidState(_))));
    assert!(matches!(slot.mark_acquired(1), Err(Error::InvalidState(_))));
}

#[test]
fn test_second_wait_without_submit_times_out() {
    let device = MockGraphicsDevice::new();
    let mut slot = make_slot(&device);

    slot.wait_for_gpu(TIMEOUT).unwrap();
    let err = slot.wait_for_gpu(TIMEOUT).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(slot.fence_waits(), 1);
}

#[test]
fn test_retire_without_present_rearms_fence() {
    let device = MockGraphicsDevice::new();
    let mut slot = make_slot(&device);

    slot.wait_for_gpu(TIMEOUT).unwrap();
    slot.retire_without_present(&device).unwrap();
    assert_eq!(slot.state(), SlotState::Presented);
    assert!(slot.wait_for_gpu(TIMEOUT).is_ok());
}
