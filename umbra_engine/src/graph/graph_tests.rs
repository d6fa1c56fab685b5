//! Unit tests for graph.rs
//!
//! The graph is recorded into a standalone MockCommandList and the command
//! stream is checked for pass order, barrier chains and binding changes.

use crate::config::{RendererConfig, SsaoConfig};
use crate::error::Error;
use crate::frame::{DefaultResources, GlobalUniform, RenderContext};
use crate::graph::graph::*;
use crate::graph::{material_order, DrawItem, GBufferTargets, PassShaders, TargetRole};
use crate::graphics_device::mock_graphics_device::{
    MockBindingGroup, MockBindingGroupHandle, MockBuffer, MockCommandList, MockGraphicsDevice,
};
use crate::graphics_device::{
    BindingGroup, BindingResource, BufferDesc, BufferUsage, CommandList, Extent2D,
    GraphicsDevice, ImageLayout, IndexType,
};
use crate::shadow::CascadeSet;
use glam::Mat4;
use std::sync::Arc;

struct Fixture {
    device: MockGraphicsDevice,
    graph: GBufferGraph,
    targets: GBufferTargets,
    defaults: DefaultResources,
    global_group: Arc<dyn BindingGroup>,
    cascades: CascadeSet,
}

fn fixture() -> Fixture {
    let device = MockGraphicsDevice::new();
    let config = RendererConfig {
        ssao: SsaoConfig { seed: Some(7), ..Default::default() },
        ..Default::default()
    };
    let mut graph = GBufferGraph::new(&device, &PassShaders::default(), &config).unwrap();
    let targets = GBufferTargets::new(&device, &graph.render_passes(), Extent2D::new(1920, 1080), 2048).unwrap();
    graph.bind_targets(&device, &targets).unwrap();
    let defaults = DefaultResources::new(&device, &graph.material_layout()).unwrap();
    let uniform = device
        .create_buffer(BufferDesc { label: "globals".to_string(), size: GlobalUniform::SIZE, usage: BufferUsage::Uniform })
        .unwrap();
    let global_group = device
        .create_binding_group(graph.main_pipeline(), 0, &[BindingResource::UniformBuffer(uniform.as_ref())])
        .unwrap();
    Fixture { device, graph, targets, defaults, global_group, cascades: CascadeSet::default() }
}

fn draw(material: Option<Arc<dyn BindingGroup>>, casts_shadow: bool) -> DrawItem {
    DrawItem {
        vertex_buffer: Arc::new(MockBuffer::new(144, "vb".to_string())),
        index_buffer: Arc::new(MockBuffer::new(12, "ib".to_string())),
        index_type: IndexType::U32,
        index_count: 3,
        first_index: 0,
        vertex_offset: 0,
        transform: Mat4::IDENTITY,
        material,
        casts_shadow,
    }
}

/// Record the whole graph once; returns the command stream and the draw count
fn record(f: &mut Fixture, draws: &[DrawItem]) -> (Vec<String>, u32) {
    let order = material_order(draws);
    let mut cmd = MockCommandList::new();
    cmd.begin().unwrap();
    let mut ctx = RenderContext::new(
        0,
        0,
        [0.0, 0.0, 0.0, 1.0],
        &f.global_group,
        &f.defaults,
        &f.cascades,
        draws,
        &order,
        &mut f.targets,
    );
    f.graph.record(&mut cmd, &mut ctx).unwrap();
    let draw_calls = ctx.draw_calls();
    cmd.end().unwrap();
    (cmd.commands, draw_calls)
}

fn barriers(commands: &[String]) -> Vec<&str> {
    commands.iter().filter(|c| c.starts_with("barrier")).map(|c| c.as_str()).collect()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_pipelines_created_in_pass_order() {
    let f = fixture();
    let ledger = f.device.ledger();
    let ledger = ledger.lock().unwrap();
    assert_eq!(
        ledger.events_matching("create_pipeline"),
        vec!["create_pipeline shadow", "create_pipeline main", "create_pipeline ssao", "create_pipeline light"]
    );
}

#[test]
fn test_validate_pass_order() {
    let f = fixture();
    assert!(validate_pass_order(&f.graph.passes()).is_ok());

    let reversed = validate_pass_order(&[&f.graph.main, &f.graph.shadow]);
    assert!(matches!(reversed, Err(Error::InitializationFailed(_))));

    // SSAO samples depth and normal, which only the main pass writes
    let missing_producer = validate_pass_order(&[&f.graph.shadow, &f.graph.ssao]);
    assert!(matches!(missing_producer, Err(Error::InitializationFailed(_))));
}

// ============================================================================
// Recording
// ============================================================================

#[test]
fn test_passes_recorded_in_dependency_order() {
    let mut f = fixture();
    let (commands, _) = record(&mut f, &[]);

    let passes: Vec<&str> = commands
        .iter()
        .filter(|c| c.starts_with("bind_pipeline"))
        .map(|c| c.as_str())
        .collect();
    assert_eq!(
        passes,
        vec![
            "bind_pipeline shadow",
            "bind_pipeline shadow",
            "bind_pipeline shadow",
            "bind_pipeline main",
            "bind_pipeline ssao",
            "bind_pipeline light",
        ]
    );
    let render_passes: Vec<&str> = commands
        .iter()
        .filter(|c| c.starts_with("begin_render_pass"))
        .map(|c| c.as_str())
        .collect();
    assert_eq!(render_passes[..3], ["begin_render_pass 2048x2048"; 3]);
    assert_eq!(render_passes[3..], ["begin_render_pass 1920x1080"; 3]);
}

#[test]
fn test_first_frame_barriers_start_from_undefined() {
    let mut f = fixture();
    let (commands, _) = record(&mut f, &[]);
    let barriers = barriers(&commands);

    assert_eq!(barriers.len(), 14);
    assert_eq!(barriers[0], "barrier shadow_depth Undefined->DepthStencilAttachment 2048x2048 layers=0+3");
    assert_eq!(barriers[1], "barrier shadow_depth DepthStencilAttachment->ShaderReadOnly 2048x2048 layers=0+3");
    assert_eq!(barriers[2], "barrier gbuffer_normal Undefined->ColorAttachment 1920x1080 layers=0+1");
    assert_eq!(barriers[5], "barrier gbuffer_depth Undefined->DepthStencilAttachment 1920x1080 layers=0+1");
    assert_eq!(barriers[10], "barrier ssao_occlusion Undefined->ColorAttachment 1920x1080 layers=0+1");
    assert_eq!(barriers[13], "barrier light_color ColorAttachment->TransferSrc 1920x1080 layers=0+1");

    assert_eq!(f.targets.layout(TargetRole::LightColor), ImageLayout::TransferSrc);
    for role in [TargetRole::ShadowDepth, TargetRole::Normal, TargetRole::Depth, TargetRole::Occlusion] {
        assert_eq!(f.targets.layout(role), ImageLayout::ShaderReadOnly);
    }
}

#[test]
fn test_second_frame_barriers_name_tracked_layouts() {
    let mut f = fixture();
    record(&mut f, &[]);
    let (commands, _) = record(&mut f, &[]);
    let barriers = barriers(&commands);

    assert_eq!(barriers.len(), 14);
    assert_eq!(barriers[0], "barrier shadow_depth ShaderReadOnly->DepthStencilAttachment 2048x2048 layers=0+3");
    assert_eq!(barriers[2], "barrier gbuffer_normal ShaderReadOnly->ColorAttachment 1920x1080 layers=0+1");
    assert_eq!(barriers[12], "barrier light_color TransferSrc->ColorAttachment 1920x1080 layers=0+1");
    assert!(barriers.iter().all(|b| !b.contains("Undefined")));
}

#[test]
fn test_material_changes_bind_once_per_group() {
    let mut f = fixture();
    let stone: Arc<dyn BindingGroup> = Arc::new(MockBindingGroupHandle(1));
    let grass: Arc<dyn BindingGroup> = Arc::new(MockBindingGroupHandle(1));
    let draws = vec![
        draw(Some(Arc::clone(&stone)), true),
        draw(Some(Arc::clone(&grass)), false),
        draw(Some(Arc::clone(&stone)), true),
        draw(None, true),
    ];

    let (commands, draw_calls) = record(&mut f, &draws);

    // main: stone, grass, default; ssao and light: one pass group each
    let material_binds = commands.iter().filter(|c| *c == "bind_binding_group set=1").count();
    assert_eq!(material_binds, 5);
    // 3 casters x 3 cascades, 4 main draws, 2 full-screen triangles
    assert_eq!(draw_calls, 9 + 4 + 2);
    assert_eq!(commands.iter().filter(|c| *c == "draw_indexed 3").count(), 13);
    assert_eq!(commands.iter().filter(|c| *c == "push_constants 0+80").count(), 9);
    assert_eq!(commands.iter().filter(|c| *c == "push_constants 0+64").count(), 4);
    assert_eq!(commands.iter().filter(|c| *c == "push_constants 0+32").count(), 1);
}

// ============================================================================
// Rebinding
// ============================================================================

#[test]
fn test_bind_targets_updates_groups_in_place() {
    let mut f = fixture();
    let passes = f.graph.render_passes();
    let groups_before = f.device.stats().binding_groups_allocated;

    f.targets.rebuild_extent(&f.device, &passes, Extent2D::new(960, 540)).unwrap();
    f.graph.bind_targets(&f.device, &f.targets).unwrap();

    assert_eq!(f.device.stats().binding_groups_allocated, groups_before);
    assert_eq!(f.device.ledger().lock().unwrap().binding_group_updates, 2);

    let group = f.graph.light().binding_group().unwrap();
    // SAFETY: the group was created by the mock device
    let group = unsafe { &*(group.as_ref() as *const dyn BindingGroup as *const MockBindingGroup) };
    let bound = group.bound();
    assert_eq!(bound[0], "gbuffer_normal 960x540 NearestClamp");
    assert_eq!(bound[5], "shadow_depth 2048x2048 Shadow");
}

#[test]
fn test_ssao_resources_survive_rebuilds() {
    let mut f = fixture();
    let passes = f.graph.render_passes();
    let kernel = Arc::clone(f.graph.ssao().resources().kernel_buffer());
    let noise = Arc::clone(f.graph.ssao().resources().noise_texture());

    f.targets.rebuild_extent(&f.device, &passes, Extent2D::new(640, 480)).unwrap();
    f.graph.bind_targets(&f.device, &f.targets).unwrap();

    assert!(Arc::ptr_eq(&kernel, f.graph.ssao().resources().kernel_buffer()));
    assert!(Arc::ptr_eq(&noise, f.graph.ssao().resources().noise_texture()));
    assert_eq!(noise.info().width, 4);
    assert_eq!(kernel.size(), 64 * 16);
}
