/// Renderer configuration

use std::time::Duration;
use crate::error::{Error, Result};
use crate::graphics_device::Extent2D;
use crate::shadow::CASCADE_COUNT;
use crate::ssao::SSAO_KERNEL_SIZE;

/// Cascaded shadow map configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeConfig {
    /// Far edge of each cascade in view-space units, strictly increasing
    pub splits: [f32; CASCADE_COUNT],
    /// Near edge shared by every cascade
    pub near_epsilon: f32,
    /// Light-space depth range stretch, so casters outside the slice still land in the map
    pub z_multiplier: f32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            splits: [10.0, 30.0, 50.0],
            near_epsilon: 0.01,
            z_multiplier: 10.0,
        }
    }
}

/// Screen-space ambient occlusion configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SsaoConfig {
    /// Hemisphere sample count; the shader's kernel array has a fixed size
    pub kernel_size: usize,
    /// Side of the square rotation-noise image
    pub noise_dimension: u32,
    /// Sampling radius in view-space units
    pub radius: f32,
    /// Depth bias against self-occlusion
    pub bias: f32,
    /// Occlusion buffer scale relative to the draw extent, pushed to the shader
    pub resolution_scale: f32,
    /// Fixed seed for kernel and noise generation; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for SsaoConfig {
    fn default() -> Self {
        Self {
            kernel_size: SSAO_KERNEL_SIZE,
            noise_dimension: 4,
            radius: 0.5,
            bias: 0.025,
            resolution_scale: 1.0,
            seed: None,
        }
    }
}

/// Renderer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Initial draw extent (normally the window's inner size). Must be non-zero.
    pub draw_extent: Extent2D,
    /// Side of each shadow cascade layer in texels
    pub shadow_resolution: u32,
    pub cascades: CascadeConfig,
    pub ssao: SsaoConfig,
    /// Maximum wait for a frame slot's fence before the device is declared lost
    pub fence_timeout: Duration,
    /// Maximum wait for a presentable image
    pub acquire_timeout: Duration,
    /// Albedo and final color clear value
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            draw_extent: Extent2D::new(1920, 1080),
            shadow_resolution: 2048,
            cascades: CascadeConfig::default(),
            ssao: SsaoConfig::default(),
            fence_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(5),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Largest shadow map side accepted
pub const MAX_SHADOW_RESOLUTION: u32 = 16384;

impl RendererConfig {
    /// Check every value the renderer relies on
    pub fn validate(&self) -> Result<()> {
        if self.draw_extent.is_zero() {
            return Err(Error::InvalidResource(format!(
                "Initial draw extent must be non-zero, got {}x{}",
                self.draw_extent.width, self.draw_extent.height
            )));
        }
        validate_shadow_resolution(self.shadow_resolution)?;

        let cascades = &self.cascades;
        if !(cascades.near_epsilon > 0.0) {
            return Err(Error::InvalidResource(format!(
                "Cascade near epsilon must be > 0, got {}",
                cascades.near_epsilon
            )));
        }
        let mut previous = cascades.near_epsilon;
        for (i, &split) in cascades.splits.iter().enumerate() {
            if !(split > previous) || !split.is_finite() {
                return Err(Error::InvalidResource(format!(
                    "Cascade split {} ({}) must be finite and greater than {}",
                    i, split, previous
                )));
            }
            previous = split;
        }
        if !(cascades.z_multiplier >= 1.0) {
            return Err(Error::InvalidResource(format!(
                "Cascade z multiplier must be >= 1, got {}",
                cascades.z_multiplier
            )));
        }

        let ssao = &self.ssao;
        if ssao.kernel_size != SSAO_KERNEL_SIZE {
            return Err(Error::InvalidResource(format!(
                "SSAO kernel size must be {}, got {}",
                SSAO_KERNEL_SIZE, ssao.kernel_size
            )));
        }
        if ssao.noise_dimension == 0 {
            return Err(Error::InvalidResource("SSAO noise dimension must be > 0".to_string()));
        }
        if !(ssao.radius > 0.0) || !(ssao.resolution_scale > 0.0 && ssao.resolution_scale <= 1.0) {
            return Err(Error::InvalidResource(format!(
                "SSAO radius must be > 0 and resolution scale in (0, 1], got {} / {}",
                ssao.radius, ssao.resolution_scale
            )));
        }

        if self.fence_timeout.is_zero() || self.acquire_timeout.is_zero() {
            return Err(Error::InvalidResource("Fence and acquire timeouts must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Shadow resolutions must be non-zero and at most [`MAX_SHADOW_RESOLUTION`]
pub fn validate_shadow_resolution(resolution: u32) -> Result<()> {
    if resolution == 0 || resolution > MAX_SHADOW_RESOLUTION {
        return Err(Error::InvalidResource(format!(
            "Shadow resolution must be in 1..={}, got {}",
            MAX_SHADOW_RESOLUTION, resolution
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
