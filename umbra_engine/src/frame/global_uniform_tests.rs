//! Unit tests for global_uniform.rs

use crate::frame::global_uniform::*;
use crate::graphics_device::Extent2D;
use crate::shadow::CascadeSet;
use glam::{Mat4, Vec3, Vec4};

fn camera() -> CameraState {
    CameraState::look_at(Vec3::new(0.0, 2.0, 10.0), Vec3::ZERO, 60f32.to_radians(), 0.1, 200.0)
}

#[test]
fn test_uniform_layout_is_std140_sized() {
    assert_eq!(GlobalUniform::SIZE % 16, 0);
    assert_eq!(GlobalUniform::SIZE as usize, std::mem::size_of::<GlobalUniform>());
}

#[test]
fn test_build_fills_camera_and_extent() {
    let uniform = GlobalUniform::build(&camera(), &LightParams::default(), &CascadeSet::default(), Extent2D::new(800, 400));
    assert_eq!(uniform.view, camera().view);
    assert_eq!(uniform.camera_position, Vec4::new(0.0, 2.0, 10.0, 1.0));
    assert_eq!(uniform.draw_extent, Vec4::new(800.0, 400.0, 1.0 / 800.0, 1.0 / 400.0));
    assert!((uniform.inverse_view * uniform.view).abs_diff_eq(Mat4::IDENTITY, 1e-4));
}

#[test]
fn test_projection_flips_y_for_vulkan() {
    let projection = camera().projection(1.0);
    assert!(projection.y_axis.y < 0.0);
}

#[test]
fn test_point_lights_clamped() {
    let mut lights = LightParams::default();
    lights.point_lights = (0..20)
        .map(|i| PointLight { position: Vec3::splat(i as f32), radius: 2.0, color: Vec3::ONE, intensity: 3.0 })
        .collect();
    let uniform = GlobalUniform::build(&camera(), &lights, &CascadeSet::default(), Extent2D::new(64, 64));
    assert_eq!(uniform.point_light_count.x, MAX_POINT_LIGHTS as u32);
    assert_eq!(uniform.point_lights[15].position_radius, Vec4::new(15.0, 15.0, 15.0, 2.0));
}

#[test]
fn test_fog_and_ambient_packed() {
    let lights = LightParams {
        fog_color: Vec3::new(0.1, 0.2, 0.3),
        fog_density: 0.02,
        ambient_color: Vec3::new(1.0, 0.9, 0.8),
        ambient_intensity: 0.2,
        ..Default::default()
    };
    let uniform = GlobalUniform::build(&camera(), &lights, &CascadeSet::default(), Extent2D::new(64, 64));
    assert_eq!(uniform.fog, Vec4::new(0.1, 0.2, 0.3, 0.02));
    assert_eq!(uniform.ambient, Vec4::new(1.0, 0.9, 0.8, 0.2));
}

#[test]
fn test_cascades_copied() {
    let cascades = CascadeSet {
        view_projections: [Mat4::from_scale(Vec3::splat(2.0)); 3],
        splits: [10.0, 30.0, 50.0],
    };
    let uniform = GlobalUniform::build(&camera(), &LightParams::default(), &cascades, Extent2D::new(64, 64));
    assert_eq!(uniform.cascade_splits, Vec4::new(10.0, 30.0, 50.0, 0.0));
    assert_eq!(uniform.cascade_view_projections[2], Mat4::from_scale(Vec3::splat(2.0)));
}
