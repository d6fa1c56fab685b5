//! Unit tests for swapchain parameter selection
//!
//! Surface capabilities are plain structs, so these run without a window.

use crate::vulkan_swapchain::*;
use ash::vk;
use umbra_engine::umbra::render::TextureFormat;

fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR {
        format,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }
}

fn capabilities(current: (u32, u32), min_count: u32, max_count: u32) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count: min_count,
        max_image_count: max_count,
        current_extent: vk::Extent2D { width: current.0, height: current.1 },
        min_image_extent: vk::Extent2D { width: 1, height: 1 },
        max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
        ..Default::default()
    }
}

// ============================================================================
// SURFACE FORMAT TESTS
// ============================================================================

#[test]
fn test_prefers_srgb_surface_format() {
    let formats = [
        surface_format(vk::Format::B8G8R8A8_UNORM),
        surface_format(vk::Format::B8G8R8A8_SRGB),
    ];
    let (chosen, format) = choose_surface_format(&formats).unwrap();
    assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
    assert_eq!(format, TextureFormat::B8G8R8A8_SRGB);
}

#[test]
fn test_falls_back_to_first_known_format() {
    let formats = [
        surface_format(vk::Format::A2B10G10R10_UNORM_PACK32),
        surface_format(vk::Format::R8G8B8A8_UNORM),
    ];
    let (chosen, format) = choose_surface_format(&formats).unwrap();
    assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
    assert_eq!(format, TextureFormat::R8G8B8A8_UNORM);
}

#[test]
fn test_no_known_surface_format() {
    let formats = [surface_format(vk::Format::A2B10G10R10_UNORM_PACK32)];
    assert!(choose_surface_format(&formats).is_none());
    assert!(choose_surface_format(&[]).is_none());
}

// ============================================================================
// EXTENT AND IMAGE COUNT TESTS
// ============================================================================

#[test]
fn test_surface_extent_wins_when_fixed() {
    let caps = capabilities((800, 600), 2, 3);
    let extent = choose_extent(&caps, 1920, 1080);
    assert_eq!((extent.width, extent.height), (800, 600));
}

#[test]
fn test_requested_extent_clamped_when_free() {
    let caps = capabilities((u32::MAX, u32::MAX), 2, 3);
    let extent = choose_extent(&caps, 1280, 720);
    assert_eq!((extent.width, extent.height), (1280, 720));

    let extent = choose_extent(&caps, 10_000, 0);
    assert_eq!((extent.width, extent.height), (4096, 1));
}

#[test]
fn test_image_count_one_above_minimum() {
    assert_eq!(choose_image_count(&capabilities((1, 1), 2, 8)), 3);
    assert_eq!(choose_image_count(&capabilities((1, 1), 3, 3)), 3);
    // No maximum
    assert_eq!(choose_image_count(&capabilities((1, 1), 2, 0)), 3);
}
