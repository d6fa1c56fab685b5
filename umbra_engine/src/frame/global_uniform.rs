/// Per-frame global uniform block and the scene inputs it is built from

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, UVec4, Vec3, Vec4};
use crate::graphics_device::Extent2D;
use crate::shadow::{CascadeSet, CASCADE_COUNT};

/// Point lights beyond this count are ignored
pub const MAX_POINT_LIGHTS: usize = 16;

/// Camera state supplied by the scene layer each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    /// World-to-view matrix
    pub view: Mat4,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraState {
    pub fn look_at(position: Vec3, target: Vec3, fov_y: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            view: Mat4::look_at_rh(position, target, Vec3::Y),
            fov_y,
            near,
            far,
        }
    }

    /// Vulkan-style projection (depth in [0, 1], clip-space Y pointing down)
    pub fn projection(&self, aspect: f32) -> Mat4 {
        let mut projection = Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far);
        projection.y_axis.y *= -1.0;
        projection
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub radius: f32,
    pub color: Vec3,
    pub intensity: f32,
}

/// Light parameters supplied by the scene layer each frame
#[derive(Debug, Clone, PartialEq)]
pub struct LightParams {
    /// Direction the directional light travels in (world space)
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub ambient_color: Vec3,
    pub ambient_intensity: f32,
    pub fog_color: Vec3,
    /// Exponential fog density; 0 disables fog
    pub fog_density: f32,
    pub point_lights: Vec<PointLight>,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.3, -1.0, -0.2),
            color: Vec3::ONE,
            intensity: 1.0,
            ambient_color: Vec3::ONE,
            ambient_intensity: 0.05,
            fog_color: Vec3::splat(0.5),
            fog_density: 0.0,
            point_lights: Vec::new(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PointLightData {
    /// xyz position, w radius
    pub position_radius: Vec4,
    /// rgb color, a intensity
    pub color_intensity: Vec4,
}

/// Global uniform block (set 0, binding 0), std140-compatible
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GlobalUniform {
    pub projection: Mat4,
    pub view: Mat4,
    pub inverse_projection: Mat4,
    pub inverse_view: Mat4,
    pub view_projection: Mat4,
    pub cascade_view_projections: [Mat4; CASCADE_COUNT],
    /// xyz split distances
    pub cascade_splits: Vec4,
    /// xyz camera position
    pub camera_position: Vec4,
    /// rgb ambient color, a intensity
    pub ambient: Vec4,
    /// rgb fog color, a density
    pub fog: Vec4,
    /// xyz light direction
    pub light_direction: Vec4,
    /// rgb light color, a intensity
    pub light_color: Vec4,
    /// width, height, 1/width, 1/height
    pub draw_extent: Vec4,
    /// x point light count
    pub point_light_count: UVec4,
    pub point_lights: [PointLightData; MAX_POINT_LIGHTS],
}

impl GlobalUniform {
    pub const SIZE: u64 = std::mem::size_of::<GlobalUniform>() as u64;

    pub fn build(camera: &CameraState, lights: &LightParams, cascades: &CascadeSet, extent: Extent2D) -> Self {
        let projection = camera.projection(extent.aspect_ratio());
        let mut uniform = Self::zeroed();

        uniform.projection = projection;
        uniform.view = camera.view;
        uniform.inverse_projection = projection.inverse();
        uniform.inverse_view = camera.view.inverse();
        uniform.view_projection = projection * camera.view;
        uniform.cascade_view_projections = cascades.view_projections;
        uniform.cascade_splits = Vec4::new(cascades.splits[0], cascades.splits[1], cascades.splits[2], 0.0);
        uniform.camera_position = camera.position.extend(1.0);
        uniform.ambient = lights.ambient_color.extend(lights.ambient_intensity);
        uniform.fog = lights.fog_color.extend(lights.fog_density);
        uniform.light_direction = lights.direction.normalize_or_zero().extend(0.0);
        uniform.light_color = lights.color.extend(lights.intensity);
        uniform.draw_extent = Vec4::new(
            extent.width as f32,
            extent.height as f32,
            1.0 / extent.width.max(1) as f32,
            1.0 / extent.height.max(1) as f32,
        );

        let count = lights.point_lights.len().min(MAX_POINT_LIGHTS);
        uniform.point_light_count = UVec4::new(count as u32, 0, 0, 0);
        for (slot, light) in uniform.point_lights.iter_mut().zip(&lights.point_lights) {
            *slot = PointLightData {
                position_radius: light.position.extend(light.radius),
                color_intensity: light.color.extend(light.intensity),
            };
        }
        uniform
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
#[path = "global_uniform_tests.rs"]
mod tests;
