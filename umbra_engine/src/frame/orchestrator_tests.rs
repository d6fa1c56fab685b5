//! Unit tests for orchestrator.rs
//!
//! Every test drives the orchestrator over the mock device and inspects the
//! shared ledger: fence waits, acquires, submissions, presents and resource
//! lifetimes.

use crate::config::{RendererConfig, SsaoConfig};
use crate::error::Error;
use crate::frame::orchestrator::*;
use crate::frame::{CameraState, LightParams, SlotState};
use crate::graph::{TargetGroup, TargetRole};
use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, SharedLedger};
use crate::graph::PassShaders;
use crate::graphics_device::{AcquireOutcome, Extent2D, GraphicsDevice, PresentOutcome};
use glam::Vec3;
use std::sync::Arc;

fn config() -> RendererConfig {
    RendererConfig {
        ssao: SsaoConfig { seed: Some(42), ..Default::default() },
        ..Default::default()
    }
}

fn orchestrator() -> (FrameOrchestrator, SharedLedger) {
    let device = MockGraphicsDevice::new();
    let ledger = device.ledger();
    let swapchain = device.create_swapchain(1920, 1080);
    let orchestrator =
        FrameOrchestrator::new(Arc::new(device), Box::new(swapchain), PassShaders::default(), config()).unwrap();
    (orchestrator, ledger)
}

fn camera() -> CameraState {
    CameraState::look_at(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO, 60f32.to_radians(), 0.1, 100.0)
}

/// Render one frame; returns false if it was skipped
fn render(orchestrator: &mut FrameOrchestrator) -> bool {
    let rendered = orchestrator
        .begin_frame(&camera(), &LightParams::default(), &[])
        .unwrap()
        .is_some();
    if rendered {
        orchestrator.end_frame().unwrap();
    }
    rendered
}

fn frame_events(ledger: &SharedLedger) -> Vec<String> {
    ledger
        .lock()
        .unwrap()
        .events
        .iter()
        .filter_map(|event| {
            let kind = event.split(' ').next().unwrap_or("");
            matches!(kind, "fence_wait" | "acquire" | "submit" | "present" | "wait_idle" | "recreate_swapchain")
                .then(|| kind.to_string())
        })
        .collect()
}

fn extent_keys(orchestrator: &FrameOrchestrator) -> Vec<crate::graph::TargetKey> {
    TargetRole::ALL
        .iter()
        .filter(|role| role.group() == TargetGroup::Extent)
        .map(|&role| orchestrator.targets().key(role))
        .collect()
}

// ============================================================================
// Frame pacing
// ============================================================================

#[test]
fn test_slots_alternate_and_wait_once_per_use() {
    let (mut orchestrator, ledger) = orchestrator();

    let mut slots = Vec::new();
    for _ in 0..6 {
        slots.push(orchestrator.current_slot());
        assert!(render(&mut orchestrator));
    }

    assert_eq!(slots, vec![0, 1, 0, 1, 0, 1]);
    assert_eq!(orchestrator.frame_slot(0).unwrap().fence_waits(), 3);
    assert_eq!(orchestrator.frame_slot(1).unwrap().fence_waits(), 3);
    assert_eq!(orchestrator.frame_number(), 6);

    let events = frame_events(&ledger);
    let expected: Vec<&str> = ["fence_wait", "acquire", "submit", "present"].repeat(6);
    assert_eq!(events, expected);
}

#[test]
fn test_slot_states_after_frame() {
    let (mut orchestrator, _ledger) = orchestrator();

    orchestrator.begin_frame(&camera(), &LightParams::default(), &[]).unwrap();
    assert_eq!(orchestrator.frame_slot(0).unwrap().state(), SlotState::Recording);
    orchestrator.end_frame().unwrap();
    assert_eq!(orchestrator.frame_slot(0).unwrap().state(), SlotState::Presented);
    assert_eq!(orchestrator.frame_slot(1).unwrap().state(), SlotState::Idle);
}

#[test]
fn test_present_blits_light_target() {
    let (mut orchestrator, ledger) = orchestrator();
    render(&mut orchestrator);

    let ledger = ledger.lock().unwrap();
    assert_eq!(
        ledger.events_matching("present_blit"),
        vec!["present_blit light_color 1920x1080 -> 1920x1080"]
    );
    let recorded = ledger.last_recorded().unwrap();
    assert_eq!(recorded.first().map(String::as_str), Some("begin"));
    assert_eq!(recorded.last().map(String::as_str), Some("end"));
    assert!(recorded.contains(&"barrier swapchain[0] TransferDst->PresentSrc 1920x1080 layers=0+1".to_string()));
}

#[test]
fn test_begin_twice_rejected_before_gpu_work() {
    let (mut orchestrator, ledger) = orchestrator();
    orchestrator.begin_frame(&camera(), &LightParams::default(), &[]).unwrap();
    let waits = ledger.lock().unwrap().fence_waits;

    let second = orchestrator.begin_frame(&camera(), &LightParams::default(), &[]);
    assert!(matches!(second, Err(Error::InvalidState(_))));
    assert_eq!(ledger.lock().unwrap().fence_waits, waits);

    orchestrator.end_frame().unwrap();
}

#[test]
fn test_end_without_begin_rejected() {
    let (mut orchestrator, ledger) = orchestrator();
    assert!(matches!(orchestrator.end_frame(), Err(Error::InvalidState(_))));
    assert_eq!(ledger.lock().unwrap().submissions, 0);

    render(&mut orchestrator);
    assert!(matches!(orchestrator.end_frame(), Err(Error::InvalidState(_))));
}

#[test]
fn test_fence_timeout_is_fatal() {
    let (mut orchestrator, ledger) = orchestrator();
    ledger.lock().unwrap().fail_next_fence_wait = true;

    let err = orchestrator
        .begin_frame(&camera(), &LightParams::default(), &[])
        .err()
        .unwrap();
    assert!(err.is_fatal());
}

#[test]
fn test_present_failure_is_fatal() {
    let (mut orchestrator, ledger) = orchestrator();
    render(&mut orchestrator);
    ledger.lock().unwrap().fail_next_present = true;

    orchestrator.begin_frame(&camera(), &LightParams::default(), &[]).unwrap();
    let err = orchestrator.end_frame().err().unwrap();
    assert!(err.is_fatal());
    assert_eq!(ledger.lock().unwrap().events_matching("present_failed").len(), 1);
}

#[test]
fn test_submit_failure_is_fatal() {
    let (mut orchestrator, ledger) = orchestrator();
    ledger.lock().unwrap().fail_next_submit = true;

    orchestrator.begin_frame(&camera(), &LightParams::default(), &[]).unwrap();
    let err = orchestrator.end_frame().err().unwrap();
    assert!(err.is_fatal());
    assert_eq!(orchestrator.stats().frames_rendered, 0);
}

// ============================================================================
// Resize protocol
// ============================================================================

#[test]
fn test_resize_to_half_extent() {
    let (mut orchestrator, ledger) = orchestrator();
    render(&mut orchestrator);

    orchestrator.resize(960, 540);
    assert!(render(&mut orchestrator));

    assert_eq!(orchestrator.surface_extent(), Extent2D::new(960, 540));
    assert_eq!(orchestrator.draw_extent(), Extent2D::new(960, 540));
    assert_eq!(orchestrator.shadow_resolution(), 2048);
    let shadow = orchestrator.targets().texture(TargetRole::ShadowDepth).info().clone();
    assert_eq!((shadow.width, shadow.height), (2048, 2048));

    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.events_matching("present_blit light_color 960x540 -> 960x540").len(), 1);
    assert_eq!(ledger.events_matching("recreate_swapchain 960x540").len(), 1);
}

#[test]
fn test_resize_sequence_leaves_no_stale_targets() {
    let (mut orchestrator, _ledger) = orchestrator();
    let initial = extent_keys(&orchestrator);

    // Requests between frames coalesce into one rebuild
    orchestrator.resize(800, 600);
    orchestrator.resize(1024, 768);
    render(&mut orchestrator);
    let middle = extent_keys(&orchestrator);
    orchestrator.resize(1280, 720);
    orchestrator.resize(640, 480);
    render(&mut orchestrator);
    render(&mut orchestrator);

    assert_eq!(orchestrator.stats().resize_count, 2);
    assert_eq!(orchestrator.draw_extent(), Extent2D::new(640, 480));
    assert_eq!(orchestrator.surface_extent(), Extent2D::new(640, 480));
    for role in TargetRole::ALL.iter().filter(|r| r.group() == TargetGroup::Extent) {
        assert_eq!(orchestrator.targets().texture(*role).info().extent(), Extent2D::new(640, 480));
    }
    for key in initial.into_iter().chain(middle) {
        assert!(orchestrator.targets().resolve(key).is_none());
    }
}

#[test]
fn test_repeated_resize_rebuilds_each_time() {
    let (mut orchestrator, ledger) = orchestrator();

    orchestrator.resize(1920, 1080);
    render(&mut orchestrator);
    orchestrator.resize(1920, 1080);
    render(&mut orchestrator);

    assert_eq!(orchestrator.stats().resize_count, 2);
    assert_eq!(orchestrator.targets().generation(TargetGroup::Extent), 2);
    assert_eq!(ledger.lock().unwrap().events_matching("recreate_swapchain 1920x1080").len(), 2);
}

#[test]
fn test_resize_drains_device_first() {
    let (mut orchestrator, ledger) = orchestrator();
    orchestrator.resize(800, 600);
    render(&mut orchestrator);

    assert_eq!(
        frame_events(&ledger),
        vec!["fence_wait", "wait_idle", "recreate_swapchain", "acquire", "submit", "present"]
    );
}

#[test]
fn test_shadow_resize_rebuilds_only_shadow_group() {
    let (mut orchestrator, ledger) = orchestrator();
    render(&mut orchestrator);
    let keys = extent_keys(&orchestrator);
    let shadow_key = orchestrator.targets().key(TargetRole::ShadowDepth);

    orchestrator.resize_shadow_map(4096).unwrap();
    render(&mut orchestrator);

    assert_eq!(extent_keys(&orchestrator), keys);
    assert!(orchestrator.targets().resolve(shadow_key).is_none());
    assert_eq!(orchestrator.shadow_resolution(), 4096);
    assert_eq!(orchestrator.draw_extent(), Extent2D::new(1920, 1080));
    assert_eq!(orchestrator.stats().shadow_rebuild_count, 1);
    assert_eq!(orchestrator.stats().resize_count, 0);

    let ledger = ledger.lock().unwrap();
    assert!(ledger.events_matching("recreate_swapchain").is_empty());
    assert!(ledger.events_matching("destroy_texture gbuffer").is_empty());
    assert_eq!(ledger.events_matching("destroy_texture shadow_depth 2048x2048").len(), 1);
}

#[test]
fn test_invalid_shadow_resolution_rejected() {
    let (mut orchestrator, _ledger) = orchestrator();
    assert!(orchestrator.resize_shadow_map(0).is_err());
    render(&mut orchestrator);
    assert_eq!(orchestrator.stats().shadow_rebuild_count, 0);
}

#[test]
fn test_resize_keeps_binding_group_count() {
    let (mut orchestrator, _ledger) = orchestrator();
    render(&mut orchestrator);
    let allocated = orchestrator.device().stats().binding_groups_allocated;

    orchestrator.resize(1280, 720);
    orchestrator.resize_shadow_map(1024).unwrap();
    render(&mut orchestrator);

    assert_eq!(orchestrator.device().stats().binding_groups_allocated, allocated);
}

// ============================================================================
// Minimized window
// ============================================================================

#[test]
fn test_minimized_window_skips_frames() {
    let (mut orchestrator, ledger) = orchestrator();
    render(&mut orchestrator);
    let waits = ledger.lock().unwrap().fence_waits;

    orchestrator.resize(0, 0);
    assert!(!render(&mut orchestrator));
    assert!(!render(&mut orchestrator));
    assert_eq!(ledger.lock().unwrap().fence_waits, waits);
    assert_eq!(orchestrator.stats().skipped_frames, 2);

    orchestrator.resize(1280, 720);
    assert!(render(&mut orchestrator));
    assert_eq!(orchestrator.surface_extent(), Extent2D::new(1280, 720));
}

// ============================================================================
// Surface changes
// ============================================================================

#[test]
fn test_out_of_date_acquire_rebuilds_and_reacquires() {
    let (mut orchestrator, ledger) = orchestrator();
    ledger.lock().unwrap().acquire_script.push_back(AcquireOutcome::OutOfDate);

    assert!(render(&mut orchestrator));

    assert_eq!(
        frame_events(&ledger),
        vec!["fence_wait", "acquire", "wait_idle", "recreate_swapchain", "acquire", "submit", "present"]
    );
    assert_eq!(orchestrator.stats().resize_count, 1);
    assert_eq!(orchestrator.frame_slot(0).unwrap().fence_waits(), 1);
}

#[test]
fn test_persistent_out_of_date_skips_frame() {
    let (mut orchestrator, ledger) = orchestrator();
    {
        let mut ledger = ledger.lock().unwrap();
        ledger.acquire_script.push_back(AcquireOutcome::OutOfDate);
        ledger.acquire_script.push_back(AcquireOutcome::OutOfDate);
    }

    assert!(!render(&mut orchestrator));
    assert_eq!(orchestrator.current_slot(), 0);
    assert_eq!(orchestrator.stats().skipped_frames, 1);

    // The slot fence was re-signaled, so the next frame proceeds
    assert!(render(&mut orchestrator));
    assert_eq!(orchestrator.frame_slot(0).unwrap().fence_waits(), 2);
}

#[test]
fn test_suboptimal_acquire_resizes_next_frame() {
    let (mut orchestrator, ledger) = orchestrator();
    ledger
        .lock()
        .unwrap()
        .acquire_script
        .push_back(AcquireOutcome::Acquired { image_index: 0, suboptimal: true });

    assert!(render(&mut orchestrator));
    assert_eq!(orchestrator.stats().resize_count, 0);
    assert_eq!(orchestrator.stats().suboptimal_count, 1);

    assert!(render(&mut orchestrator));
    assert_eq!(orchestrator.stats().resize_count, 1);
}

#[test]
fn test_out_of_date_present_resizes_next_frame() {
    let (mut orchestrator, ledger) = orchestrator();
    ledger.lock().unwrap().present_script.push_back(PresentOutcome::OutOfDate);

    assert!(render(&mut orchestrator));
    assert!(render(&mut orchestrator));

    assert_eq!(orchestrator.stats().resize_count, 1);
    assert_eq!(ledger.lock().unwrap().events_matching("recreate_swapchain").len(), 1);
}

// ============================================================================
// Construction and teardown
// ============================================================================

#[test]
fn test_zero_draw_extent_is_fatal() {
    let device = MockGraphicsDevice::new();
    let swapchain = device.create_swapchain(0, 0);
    let config = RendererConfig { draw_extent: Extent2D::new(0, 0), ..config() };
    let result = FrameOrchestrator::new(Arc::new(device), Box::new(swapchain), PassShaders::default(), config);
    assert!(result.err().unwrap().is_fatal());
}

#[test]
fn test_config_extent_recreates_mismatched_swapchain() {
    let device = MockGraphicsDevice::new();
    let ledger = device.ledger();
    let swapchain = device.create_swapchain(640, 480);
    let config = RendererConfig { draw_extent: Extent2D::new(800, 600), ..config() };
    let mut orchestrator =
        FrameOrchestrator::new(Arc::new(device), Box::new(swapchain), PassShaders::default(), config).unwrap();

    assert_eq!(orchestrator.draw_extent(), Extent2D::new(800, 600));
    assert_eq!(orchestrator.surface_extent(), Extent2D::new(800, 600));
    assert!(render(&mut orchestrator));
    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.events_matching("recreate_swapchain").len(), 1);
    assert_eq!(ledger.events_matching("present_blit light_color 800x600 -> 800x600").len(), 1);
}

#[test]
fn test_matching_swapchain_is_kept() {
    let (_orchestrator, ledger) = orchestrator();
    assert!(ledger.lock().unwrap().events_matching("recreate_swapchain").is_empty());
}

#[test]
fn test_invalid_config_is_fatal() {
    let device = MockGraphicsDevice::new();
    let swapchain = device.create_swapchain(640, 480);
    let config = RendererConfig { shadow_resolution: 0, ..config() };
    let result = FrameOrchestrator::new(Arc::new(device), Box::new(swapchain), PassShaders::default(), config);
    assert!(result.err().unwrap().is_fatal());
}

#[test]
fn test_drop_drains_device_and_releases_targets() {
    let (mut orchestrator, ledger) = orchestrator();
    render(&mut orchestrator);
    orchestrator.wait().unwrap();
    let idle_calls = ledger.lock().unwrap().wait_idle_calls;

    drop(orchestrator);

    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.wait_idle_calls, idle_calls + 1);
    assert_eq!(ledger.textures_alive, 0);
    assert_eq!(ledger.binding_groups_alive, 0);
}

#[test]
fn test_stats_and_cascades_follow_frames() {
    let (mut orchestrator, _ledger) = orchestrator();
    render(&mut orchestrator);
    render(&mut orchestrator);

    let stats = orchestrator.stats();
    assert_eq!(stats.frames_rendered, 2);
    // No scene draws: the SSAO and light triangles
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.total_draw_calls, 4);
    assert_ne!(orchestrator.cascades().view_projections[0], glam::Mat4::IDENTITY);
}
