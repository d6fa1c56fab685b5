//! Unit tests for Vulkan format conversion functions
//!
//! Pure conversions only; nothing here needs a GPU.

use crate::vulkan_format::*;
use ash::vk;
use umbra_engine::umbra::render::{
    BindingType, BufferFormat, ImageLayout, IndexType, ShaderStageFlags, TextureFormat, TextureUsage,
};

// ============================================================================
// TEXTURE FORMAT TESTS
// ============================================================================

#[test]
fn test_texture_format_to_vk_color_formats() {
    assert_eq!(texture_format_to_vk(TextureFormat::R8_UNORM), vk::Format::R8_UNORM);
    assert_eq!(texture_format_to_vk(TextureFormat::R8G8B8A8_SRGB), vk::Format::R8G8B8A8_SRGB);
    assert_eq!(texture_format_to_vk(TextureFormat::B8G8R8A8_UNORM), vk::Format::B8G8R8A8_UNORM);
    assert_eq!(
        texture_format_to_vk(TextureFormat::R16G16B16A16_SFLOAT),
        vk::Format::R16G16B16A16_SFLOAT
    );
}

#[test]
fn test_texture_format_to_vk_depth_formats() {
    assert_eq!(texture_format_to_vk(TextureFormat::D32_FLOAT), vk::Format::D32_SFLOAT);
    assert_eq!(
        texture_format_to_vk(TextureFormat::D24_UNORM_S8_UINT),
        vk::Format::D24_UNORM_S8_UINT
    );
}

#[test]
fn test_surface_format_round_trip() {
    for format in [TextureFormat::B8G8R8A8_SRGB, TextureFormat::R8G8B8A8_UNORM] {
        assert_eq!(vk_to_texture_format(texture_format_to_vk(format)), Some(format));
    }
    assert_eq!(vk_to_texture_format(vk::Format::A2B10G10R10_UNORM_PACK32), None);
}

#[test]
fn test_buffer_format_to_vk() {
    assert_eq!(buffer_format_to_vk(BufferFormat::R32G32_SFLOAT), vk::Format::R32G32_SFLOAT);
    assert_eq!(buffer_format_to_vk(BufferFormat::R32G32B32_SFLOAT), vk::Format::R32G32B32_SFLOAT);
    assert_eq!(index_type_to_vk(IndexType::U16), vk::IndexType::UINT16);
    assert_eq!(index_type_to_vk(IndexType::U32), vk::IndexType::UINT32);
}

// ============================================================================
// USAGE AND ASPECT TESTS
// ============================================================================

#[test]
fn test_render_targets_can_be_blit_sources() {
    assert!(texture_usage_to_vk(TextureUsage::RenderTarget).contains(vk::ImageUsageFlags::TRANSFER_SRC));
    assert!(texture_usage_to_vk(TextureUsage::SampledAndRenderTarget)
        .contains(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::COLOR_ATTACHMENT));
}

#[test]
fn test_sampled_depth_is_attachment_and_sampled() {
    let usage = texture_usage_to_vk(TextureUsage::SampledDepthStencil);
    assert!(usage.contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));
    assert!(usage.contains(vk::ImageUsageFlags::SAMPLED));
    assert!(!texture_usage_to_vk(TextureUsage::DepthStencil).contains(vk::ImageUsageFlags::SAMPLED));
}

#[test]
fn test_depth_stencil_aspects() {
    assert_eq!(
        attachment_aspect(TextureFormat::D24_UNORM_S8_UINT),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
    assert_eq!(sampled_aspect(TextureFormat::D24_UNORM_S8_UINT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(attachment_aspect(TextureFormat::D32_FLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(attachment_aspect(TextureFormat::R8_UNORM), vk::ImageAspectFlags::COLOR);
    assert_eq!(sampled_aspect(TextureFormat::R16G16B16A16_SFLOAT), vk::ImageAspectFlags::COLOR);
}

// ============================================================================
// LAYOUT AND BARRIER TESTS
// ============================================================================

#[test]
fn test_image_layout_to_vk() {
    assert_eq!(image_layout_to_vk(ImageLayout::Undefined), vk::ImageLayout::UNDEFINED);
    assert_eq!(
        image_layout_to_vk(ImageLayout::DepthStencilAttachment),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    );
    assert_eq!(image_layout_to_vk(ImageLayout::PresentSrc), vk::ImageLayout::PRESENT_SRC_KHR);
}

#[test]
fn test_undefined_layout_waits_for_nothing() {
    let (stage, access) = layout_stage_access(ImageLayout::Undefined);
    assert_eq!(stage, vk::PipelineStageFlags::TOP_OF_PIPE);
    assert!(access.is_empty());
}

#[test]
fn test_attachment_layouts_cover_writes() {
    let (stage, access) = layout_stage_access(ImageLayout::ColorAttachment);
    assert_eq!(stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
    assert!(access.contains(vk::AccessFlags::COLOR_ATTACHMENT_WRITE));

    let (stage, access) = layout_stage_access(ImageLayout::DepthStencilAttachment);
    assert!(stage.contains(vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS));
    assert!(stage.contains(vk::PipelineStageFlags::LATE_FRAGMENT_TESTS));
    assert!(access.contains(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE));
}

#[test]
fn test_sampling_layout_blocks_fragment_reads() {
    let (stage, access) = layout_stage_access(ImageLayout::ShaderReadOnly);
    assert_eq!(stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
    assert_eq!(access, vk::AccessFlags::SHADER_READ);
}

// ============================================================================
// BINDING TESTS
// ============================================================================

#[test]
fn test_stage_flags_to_vk() {
    assert_eq!(stage_flags_to_vk(ShaderStageFlags::VERTEX), vk::ShaderStageFlags::VERTEX);
    assert_eq!(
        stage_flags_to_vk(ShaderStageFlags::VERTEX_FRAGMENT),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    assert!(stage_flags_to_vk(ShaderStageFlags::empty()).is_empty());
}

#[test]
fn test_binding_type_to_vk() {
    assert_eq!(binding_type_to_vk(BindingType::UniformBuffer), vk::DescriptorType::UNIFORM_BUFFER);
    assert_eq!(
        binding_type_to_vk(BindingType::CombinedImageSampler),
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER
    );
    assert_eq!(binding_type_to_vk(BindingType::StorageBuffer), vk::DescriptorType::STORAGE_BUFFER);
}
