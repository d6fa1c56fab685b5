/// SSAO hemisphere kernel and rotation noise

use glam::{Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of hemisphere samples (fixed by the SSAO shader's uniform array)
pub const SSAO_KERNEL_SIZE: usize = 64;

/// Random source for kernel and noise generation
///
/// A seed makes the output reproducible; without one the generator is seeded
/// from the OS.
pub fn ssao_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Length scale of sample `index`: `lerp(0.1, 1.0, (index / N)^2)`
///
/// Samples close to the origin weigh more in the occlusion estimate.
pub fn sample_scale(index: usize) -> f32 {
    let t = index as f32 / SSAO_KERNEL_SIZE as f32;
    0.1 + (1.0 - 0.1) * t * t
}

/// Tangent-space hemisphere samples (z >= 0), stored as vec4 for std140
#[derive(Debug, Clone)]
pub struct SsaoKernel {
    samples: [Vec4; SSAO_KERNEL_SIZE],
}

impl SsaoKernel {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut samples = [Vec4::ZERO; SSAO_KERNEL_SIZE];
        for (i, sample) in samples.iter_mut().enumerate() {
            let direction = Vec3::new(
                rng.random::<f32>() * 2.0 - 1.0,
                rng.random::<f32>() * 2.0 - 1.0,
                rng.random::<f32>(),
            )
            .normalize_or_zero();
            let length = rng.random::<f32>() * sample_scale(i);
            *sample = (direction * length).extend(0.0);
        }
        Self { samples }
    }

    pub fn samples(&self) -> &[Vec4; SSAO_KERNEL_SIZE] {
        &self.samples
    }

    /// Uniform buffer contents
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.samples)
    }
}

/// Square image of random rotation vectors around the surface normal (z = 0),
/// tiled over the screen to decorrelate neighboring pixels.
#[derive(Debug, Clone)]
pub struct SsaoNoise {
    dimension: u32,
    texels: Vec<Vec4>,
}

impl SsaoNoise {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, dimension: u32) -> Self {
        let texels = (0..dimension * dimension)
            .map(|_| Vec4::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0), 0.0, 0.0))
            .collect();
        Self { dimension, texels }
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// RGBA32F texel data
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

#[cfg(test)]
#[path = "kernel_tests.rs"]
mod tests;
