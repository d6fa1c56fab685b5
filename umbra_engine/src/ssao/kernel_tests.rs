//! Unit tests for kernel.rs

use crate::ssao::kernel::*;

// ============================================================================
// KERNEL
// ============================================================================

#[test]
fn test_kernel_has_64_samples() {
    let kernel = SsaoKernel::generate(&mut ssao_rng(Some(7)));
    assert_eq!(kernel.samples().len(), 64);
    assert_eq!(kernel.as_bytes().len(), 64 * 16);
}

#[test]
fn test_kernel_samples_in_unit_hemisphere() {
    let kernel = SsaoKernel::generate(&mut ssao_rng(Some(1)));
    for (i, sample) in kernel.samples().iter().enumerate() {
        let length = sample.truncate().length();
        assert!((0.0..=1.0).contains(&length), "sample {} length {}", i, length);
        assert!(length <= sample_scale(i) + 1e-5);
        assert!(sample.z >= 0.0);
        assert_eq!(sample.w, 0.0);
    }
}

#[test]
fn test_kernel_biased_toward_origin() {
    let kernel = SsaoKernel::generate(&mut ssao_rng(Some(42)));
    let mean = |range: std::ops::Range<usize>| {
        let len = range.len() as f32;
        range.map(|i| kernel.samples()[i].truncate().length()).sum::<f32>() / len
    };
    assert!(mean(0..16) < mean(48..64));
}

#[test]
fn test_sample_scale_curve() {
    assert!((sample_scale(0) - 0.1).abs() < 1e-6);
    assert!((sample_scale(32) - (0.1 + 0.9 * 0.25)).abs() < 1e-6);
    for i in 1..SSAO_KERNEL_SIZE {
        assert!(sample_scale(i) > sample_scale(i - 1));
    }
    assert!(sample_scale(SSAO_KERNEL_SIZE - 1) < 1.0);
}

#[test]
fn test_seeded_generation_is_reproducible() {
    let a = SsaoKernel::generate(&mut ssao_rng(Some(99)));
    let b = SsaoKernel::generate(&mut ssao_rng(Some(99)));
    assert_eq!(a.samples(), b.samples());
}

// ============================================================================
// NOISE
// ============================================================================

#[test]
fn test_noise_dimension_and_range() {
    let noise = SsaoNoise::generate(&mut ssao_rng(Some(3)), 4);
    assert_eq!(noise.dimension(), 4);
    assert_eq!(noise.texels().len(), 16);
    assert_eq!(noise.as_bytes().len(), 16 * 16);
    for texel in noise.texels() {
        assert!((-1.0..1.0).contains(&texel.x));
        assert!((-1.0..1.0).contains(&texel.y));
        assert_eq!(texel.z, 0.0);
    }
}
