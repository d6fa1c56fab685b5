//! Unit tests for texture.rs

use crate::graphics_device::{Extent2D, TextureDesc, TextureFormat, TextureInfo, TextureUsage};

// ============================================================================
// FORMAT TESTS
// ============================================================================

#[test]
fn test_depth_formats() {
    assert!(TextureFormat::D32_FLOAT.is_depth());
    assert!(TextureFormat::D24_UNORM_S8_UINT.is_depth());
    assert!(!TextureFormat::R8_UNORM.is_depth());
    assert!(!TextureFormat::R16G16B16A16_SFLOAT.is_depth());
}

#[test]
fn test_bytes_per_pixel() {
    assert_eq!(TextureFormat::R8_UNORM.bytes_per_pixel(), 1);
    assert_eq!(TextureFormat::R8G8_UNORM.bytes_per_pixel(), 2);
    assert_eq!(TextureFormat::R8G8B8A8_UNORM.bytes_per_pixel(), 4);
    assert_eq!(TextureFormat::R16G16B16A16_SFLOAT.bytes_per_pixel(), 8);
    assert_eq!(TextureFormat::R32G32B32A32_SFLOAT.bytes_per_pixel(), 16);
}

// ============================================================================
// EXTENT TESTS
// ============================================================================

#[test]
fn test_extent_zero() {
    assert!(Extent2D::new(0, 540).is_zero());
    assert!(Extent2D::new(960, 0).is_zero());
    assert!(!Extent2D::new(960, 540).is_zero());
}

#[test]
fn test_extent_aspect_ratio() {
    let extent = Extent2D::new(1920, 1080);
    assert!((extent.aspect_ratio() - 16.0 / 9.0).abs() < 1e-6);
    assert_eq!(Extent2D::new(10, 0).aspect_ratio(), 1.0);
}

// ============================================================================
// INFO TESTS
// ============================================================================

#[test]
fn test_info_from_desc() {
    let desc = TextureDesc {
        label: "shadow_depth".to_string(),
        width: 2048,
        height: 2048,
        format: TextureFormat::D32_FLOAT,
        usage: TextureUsage::SampledDepthStencil,
        array_layers: 3,
        data: None,
    };
    let info = TextureInfo::from(&desc);
    assert_eq!(info.label, "shadow_depth");
    assert_eq!(info.extent(), Extent2D::new(2048, 2048));
    assert!(info.is_array());
}
