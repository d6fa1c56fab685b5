//! Unit tests for cascade.rs

use crate::config::CascadeConfig;
use crate::shadow::cascade::*;
use glam::{Mat4, Vec3};

const EPSILON: f32 = 1e-3;

fn camera_view() -> Mat4 {
    Mat4::look_at_rh(Vec3::new(0.0, 5.0, 20.0), Vec3::new(0.0, 0.0, 0.0), Vec3::Y)
}

fn assert_corners_inside(set: &CascadeSet, config: &CascadeConfig, view: Mat4, fov: f32, aspect: f32) {
    for (i, &split) in config.splits.iter().enumerate() {
        let corners = frustum_corners(view, fov, aspect, config.near_epsilon, split);
        for corner in corners {
            let ndc = set.view_projections[i].project_point3(corner);
            assert!(ndc.x >= -1.0 - EPSILON && ndc.x <= 1.0 + EPSILON, "cascade {} x {}", i, ndc.x);
            assert!(ndc.y >= -1.0 - EPSILON && ndc.y <= 1.0 + EPSILON, "cascade {} y {}", i, ndc.y);
            assert!(ndc.z >= -EPSILON && ndc.z <= 1.0 + EPSILON, "cascade {} z {}", i, ndc.z);
        }
    }
}

// ============================================================================
// FRUSTUM CORNERS
// ============================================================================

#[test]
fn test_frustum_corners_lie_at_near_and_far() {
    let view = Mat4::IDENTITY;
    let corners = frustum_corners(view, 60f32.to_radians(), 1.0, 1.0, 10.0);
    let near = corners.iter().filter(|c| (c.z + 1.0).abs() < EPSILON).count();
    let far = corners.iter().filter(|c| (c.z + 10.0).abs() < 1e-2).count();
    assert_eq!(near, 4);
    assert_eq!(far, 4);
}

// ============================================================================
// BOUNDS
// ============================================================================

#[test]
fn test_corners_inside_cascade_bounds() {
    let config = CascadeConfig::default();
    let projector = CascadeProjector::new(config.clone());
    let fov = 60f32.to_radians();
    let aspect = 16.0 / 9.0;

    for light in [
        Vec3::new(-0.3, -1.0, -0.2),
        Vec3::new(1.0, -0.1, 0.0),
        Vec3::new(0.2, -0.5, 0.9),
    ] {
        let set = projector.compute(camera_view(), fov, aspect, light);
        assert_corners_inside(&set, &config, camera_view(), fov, aspect);
    }
}

#[test]
fn test_bounds_are_tight_in_x_and_y() {
    let config = CascadeConfig::default();
    let projector = CascadeProjector::new(config.clone());
    let fov = 45f32.to_radians();
    let set = projector.compute(camera_view(), fov, 1.5, Vec3::new(-0.4, -1.0, 0.3));

    let corners = frustum_corners(camera_view(), fov, 1.5, config.near_epsilon, config.splits[1]);
    let ndc: Vec<Vec3> = corners.iter().map(|c| set.view_projections[1].project_point3(*c)).collect();
    let min_x = ndc.iter().map(|p| p.x).fold(f32::MAX, f32::min);
    let max_x = ndc.iter().map(|p| p.x).fold(f32::MIN, f32::max);
    let min_y = ndc.iter().map(|p| p.y).fold(f32::MAX, f32::min);
    let max_y = ndc.iter().map(|p| p.y).fold(f32::MIN, f32::max);
    assert!((min_x + 1.0).abs() < EPSILON && (max_x - 1.0).abs() < EPSILON);
    assert!((min_y + 1.0).abs() < EPSILON && (max_y - 1.0).abs() < EPSILON);
}

#[test]
fn test_light_parallel_to_up_is_finite() {
    let config = CascadeConfig::default();
    let projector = CascadeProjector::new(config.clone());
    let fov = 60f32.to_radians();
    let set = projector.compute(camera_view(), fov, 1.0, Vec3::NEG_Y);
    for matrix in &set.view_projections {
        assert!(matrix.is_finite());
    }
    assert_corners_inside(&set, &config, camera_view(), fov, 1.0);
}

#[test]
fn test_zero_light_direction_falls_back() {
    let projector = CascadeProjector::new(CascadeConfig::default());
    let set = projector.compute(camera_view(), 1.0, 1.0, Vec3::ZERO);
    assert!(set.view_projections.iter().all(|m| m.is_finite()));
}

// ============================================================================
// PER-FRAME RECOMPUTATION
// ============================================================================

#[test]
fn test_splits_reported() {
    let config = CascadeConfig { splits: [5.0, 20.0, 80.0], ..Default::default() };
    let set = CascadeProjector::new(config).compute(camera_view(), 1.0, 1.0, Vec3::new(0.0, -1.0, -1.0));
    assert_eq!(set.splits, [5.0, 20.0, 80.0]);
}

#[test]
fn test_matrices_follow_light_direction() {
    let projector = CascadeProjector::new(CascadeConfig::default());
    let a = projector.compute(camera_view(), 1.0, 1.0, Vec3::new(0.0, -1.0, -1.0));
    let b = projector.compute(camera_view(), 1.0, 1.0, Vec3::new(1.0, -1.0, 0.0));
    assert_ne!(a.view_projections[0], b.view_projections[0]);
}

#[test]
fn test_far_cascades_cover_more_area() {
    let projector = CascadeProjector::new(CascadeConfig::default());
    let set = projector.compute(camera_view(), 1.0, 1.0, Vec3::new(0.0, -1.0, -0.5));
    // Orthographic x scale is 2 / width: wider slices give smaller scales.
    let scale = |m: &Mat4| m.x_axis.truncate().length();
    assert!(scale(&set.view_projections[0]) > scale(&set.view_projections[2]));
}
