/// Cascade projector: fits one light-space orthographic projection per view-frustum slice

use glam::{Mat4, Vec3, Vec4};
use crate::config::CascadeConfig;

/// Number of shadow cascades (layers of the shadow depth array)
pub const CASCADE_COUNT: usize = 3;

/// Per-frame cascade matrices, recomputed from camera and light every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeSet {
    /// Light projection * light view, one per cascade
    pub view_projections: [Mat4; CASCADE_COUNT],
    /// Far edge of each cascade in view-space units
    pub splits: [f32; CASCADE_COUNT],
}

impl Default for CascadeSet {
    fn default() -> Self {
        Self {
            view_projections: [Mat4::IDENTITY; CASCADE_COUNT],
            splits: [0.0; CASCADE_COUNT],
        }
    }
}

/// Computes [`CascadeSet`]s for a fixed cascade configuration
#[derive(Debug, Clone)]
pub struct CascadeProjector {
    config: CascadeConfig,
}

impl CascadeProjector {
    pub fn new(config: CascadeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Fit every cascade to its slice of the camera frustum.
    ///
    /// Each slice spans `near_epsilon..split`, so cascades are nested and the
    /// shader picks the first one whose split exceeds the fragment's depth.
    ///
    /// # Arguments
    ///
    /// * `camera_view` - World-to-view matrix of the camera
    /// * `fov_y` - Vertical field of view in radians
    /// * `aspect` - Draw extent width / height
    /// * `light_direction` - Direction the directional light travels in
    pub fn compute(&self, camera_view: Mat4, fov_y: f32, aspect: f32, light_direction: Vec3) -> CascadeSet {
        let light_direction = light_direction.try_normalize().unwrap_or(Vec3::NEG_Y);
        let mut set = CascadeSet { splits: self.config.splits, ..Default::default() };
        for (i, &split) in self.config.splits.iter().enumerate() {
            let corners = frustum_corners(camera_view, fov_y, aspect, self.config.near_epsilon, split);
            set.view_projections[i] = fit_cascade(&corners, light_direction, self.config.z_multiplier);
        }
        set
    }
}

/// World-space corners of the view frustum between `near` and `far`
///
/// Built from the unit-cube clip-space corners (depth in [0, 1]) transformed
/// by the inverse of (slice projection * camera view).
pub fn frustum_corners(camera_view: Mat4, fov_y: f32, aspect: f32, near: f32, far: f32) -> [Vec3; 8] {
    let projection = Mat4::perspective_rh(fov_y, aspect.max(0.0001), near, far);
    let inverse = (projection * camera_view).inverse();
    let mut corners = [Vec3::ZERO; 8];
    let mut idx = 0;
    for &x in &[-1.0, 1.0] {
        for &y in &[-1.0, 1.0] {
            for &z in &[0.0, 1.0] {
                let world = inverse * Vec4::new(x, y, z, 1.0);
                corners[idx] = world.truncate() / world.w;
                idx += 1;
            }
        }
    }
    corners
}

/// Orthographic light projection * light view enclosing `corners`
fn fit_cascade(corners: &[Vec3; 8], light_direction: Vec3, z_multiplier: f32) -> Mat4 {
    let center = corners.iter().copied().sum::<Vec3>() / corners.len() as f32;

    // look_at degenerates when the light is parallel to the up vector
    let up = if light_direction.dot(Vec3::Y).abs() > 0.99 { Vec3::X } else { Vec3::Y };
    let light_view = Mat4::look_at_rh(center - light_direction, center, up);

    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for corner in corners {
        let light_space = light_view.transform_point3(*corner);
        min = min.min(light_space);
        max = max.max(light_space);
    }

    // Stretch the depth range outward so casters between the light and the slice are kept.
    let min_z = if min.z < 0.0 { min.z * z_multiplier } else { min.z / z_multiplier };
    let max_z = if max.z < 0.0 { max.z / z_multiplier } else { max.z * z_multiplier };

    // Right-handed view space looks down -Z: near/far are negated depths.
    let projection = Mat4::orthographic_rh(min.x, max.x, min.y, max.y, -max_z, -min_z);
    projection * light_view
}

#[cfg(test)]
#[path = "cascade_tests.rs"]
mod tests;
