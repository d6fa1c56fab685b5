//! Integration tests for the frame loop over the mock graphics device
//!
//! These tests only use the public API: a scene with materials is rendered
//! across window resizes, shadow-map changes and a lost surface.
//!
//! Run with: cargo test --features test-utils --test frame_loop

use std::sync::Arc;
use umbra_engine::glam::{Mat4, Vec3};
use umbra_engine::testing::{MockGraphicsDevice, SharedLedger};
use umbra_engine::umbra::graph::{DrawItem, MaterialBindings, MaterialFactors, PassShaders};
use umbra_engine::umbra::render::{
    AcquireOutcome, BindingGroup, Buffer, BufferDesc, BufferUsage, Extent2D, GraphicsDevice, IndexType,
    Texture, TextureData, TextureDesc, TextureFormat, TextureUsage,
};
use umbra_engine::umbra::{CameraState, FrameOrchestrator, LightParams, PointLight, RendererConfig, SsaoConfig};

struct Scene {
    orchestrator: FrameOrchestrator,
    ledger: SharedLedger,
    draws: Vec<DrawItem>,
    _materials: Vec<Material>,
}

/// A material group and the resources it samples
struct Material {
    group: Arc<dyn BindingGroup>,
    _albedo: Arc<dyn Texture>,
    _factors: Arc<dyn Buffer>,
}

fn material(device: &dyn GraphicsDevice, orchestrator: &FrameOrchestrator, name: &str) -> Material {
    let texture = device
        .create_texture(TextureDesc {
            label: format!("{}_albedo", name),
            width: 2,
            height: 2,
            format: TextureFormat::R8G8B8A8_SRGB,
            usage: TextureUsage::Sampled,
            array_layers: 1,
            data: Some(TextureData::Single(vec![200; 16])),
        })
        .unwrap();
    let factors = device
        .create_buffer(BufferDesc {
            label: format!("{}_factors", name),
            size: MaterialFactors::SIZE,
            usage: BufferUsage::Uniform,
        })
        .unwrap();
    let defaults = orchestrator.defaults();
    let group = orchestrator
        .material_layout()
        .create_group(
            device,
            &MaterialBindings {
                albedo: texture.as_ref(),
                normal: defaults.flat_normal_texture().as_ref(),
                metallic_roughness: defaults.white_texture().as_ref(),
                factors: factors.as_ref(),
            },
        )
        .unwrap();
    Material { group, _albedo: texture, _factors: factors }
}

fn mesh(device: &dyn GraphicsDevice, material: Option<Arc<dyn BindingGroup>>, x: f32) -> DrawItem {
    let vertex_buffer = device
        .create_buffer(BufferDesc { label: "cube_vertices".to_string(), size: 24 * 48, usage: BufferUsage::Vertex })
        .unwrap();
    let index_buffer = device
        .create_buffer(BufferDesc { label: "cube_indices".to_string(), size: 36 * 4, usage: BufferUsage::Index })
        .unwrap();
    DrawItem {
        vertex_buffer,
        index_buffer,
        index_type: IndexType::U32,
        index_count: 36,
        first_index: 0,
        vertex_offset: 0,
        transform: Mat4::from_translation(Vec3::new(x, 0.0, 0.0)),
        material,
        casts_shadow: true,
    }
}

fn scene() -> Scene {
    let device = MockGraphicsDevice::new();
    let ledger = device.ledger();
    let swapchain = device.create_swapchain(1280, 720);
    let config = RendererConfig {
        draw_extent: Extent2D::new(1280, 720),
        ssao: SsaoConfig { seed: Some(3), ..Default::default() },
        ..Default::default()
    };
    let orchestrator =
        FrameOrchestrator::new(Arc::new(device), Box::new(swapchain), PassShaders::default(), config).unwrap();

    let device = Arc::clone(orchestrator.device());
    let brick = material(device.as_ref(), &orchestrator, "brick");
    let marble = material(device.as_ref(), &orchestrator, "marble");
    let draws = vec![
        mesh(device.as_ref(), Some(Arc::clone(&brick.group)), -2.0),
        mesh(device.as_ref(), Some(Arc::clone(&marble.group)), 0.0),
        mesh(device.as_ref(), Some(Arc::clone(&brick.group)), 2.0),
        mesh(device.as_ref(), None, 4.0),
    ];
    Scene { orchestrator, ledger, draws, _materials: vec![brick, marble] }
}

fn lights() -> LightParams {
    LightParams {
        direction: Vec3::new(-0.3, -1.0, -0.2).normalize(),
        point_lights: vec![PointLight {
            position: Vec3::new(0.0, 2.0, 0.0),
            radius: 5.0,
            color: Vec3::new(1.0, 0.8, 0.6),
            intensity: 3.0,
        }],
        ..Default::default()
    }
}

fn render(scene: &mut Scene, yaw: f32) -> bool {
    let eye = Vec3::new(yaw.cos() * 12.0, 6.0, yaw.sin() * 12.0);
    let camera = CameraState::look_at(eye, Vec3::ZERO, 55f32.to_radians(), 0.1, 200.0);
    let rendered = scene
        .orchestrator
        .begin_frame(&camera, &lights(), &scene.draws)
        .unwrap()
        .is_some();
    if rendered {
        scene.orchestrator.end_frame().unwrap();
    }
    rendered
}

// ============================================================================
// FRAME LOOP TESTS
// ============================================================================

#[test]
fn test_integration_scene_renders_every_pass() {
    let mut scene = scene();
    assert!(render(&mut scene, 0.0));

    let stats = scene.orchestrator.stats();
    // 4 casters x 3 cascades, 4 main draws, SSAO and light triangles
    assert_eq!(stats.draw_calls, 12 + 4 + 2);

    let ledger = scene.ledger.lock().unwrap();
    let commands = ledger.last_recorded().unwrap();
    let passes: Vec<&str> = commands
        .iter()
        .filter(|c| c.starts_with("bind_pipeline"))
        .map(|c| c.as_str())
        .collect();
    assert_eq!(passes.last(), Some(&"bind_pipeline light"));
    assert_eq!(passes.iter().filter(|p| **p == "bind_pipeline shadow").count(), 3);
    assert_eq!(ledger.events_matching("present_blit light_color 1280x720").len(), 1);
}

#[test]
fn test_integration_interactive_session() {
    let mut scene = scene();

    for frame in 0..4 {
        assert!(render(&mut scene, frame as f32 * 0.1));
    }

    // Drag the window edge: several resizes between two frames
    scene.orchestrator.resize(1300, 740);
    scene.orchestrator.resize(1600, 900);
    assert!(render(&mut scene, 0.5));
    assert_eq!(scene.orchestrator.draw_extent(), Extent2D::new(1600, 900));

    // Quality setting change
    scene.orchestrator.resize_shadow_map(1024).unwrap();
    assert!(render(&mut scene, 0.6));
    assert_eq!(scene.orchestrator.shadow_resolution(), 1024);

    // Minimize, then restore
    scene.orchestrator.resize(0, 0);
    assert!(!render(&mut scene, 0.7));
    scene.orchestrator.resize(1600, 900);
    assert!(render(&mut scene, 0.8));

    // Compositor invalidates the surface
    scene.ledger.lock().unwrap().acquire_script.push_back(AcquireOutcome::OutOfDate);
    assert!(render(&mut scene, 0.9));

    let stats = scene.orchestrator.stats();
    assert_eq!(stats.frames_rendered, 8);
    assert_eq!(stats.skipped_frames, 1);
    assert_eq!(stats.resize_count, 3);
    assert_eq!(stats.shadow_rebuild_count, 1);
    assert_eq!(scene.orchestrator.frame_slot(0).unwrap().fence_waits(), 4);
    assert_eq!(scene.orchestrator.frame_slot(1).unwrap().fence_waits(), 4);

    // Every G-buffer image is alive once: scene textures, defaults, SSAO noise,
    // and seven targets
    let ledger = scene.ledger.lock().unwrap();
    assert_eq!(ledger.textures_alive, 2 + 2 + 1 + 7);
}

#[test]
fn test_integration_teardown_releases_gpu_objects() {
    let scene = scene();
    let ledger = Arc::clone(&scene.ledger);
    drop(scene);

    let ledger = ledger.lock().unwrap();
    assert_eq!(ledger.textures_alive, 0);
    assert_eq!(ledger.binding_groups_alive, 0);
    assert!(ledger.wait_idle_calls >= 1);
}
