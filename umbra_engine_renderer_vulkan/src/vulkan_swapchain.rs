/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// The renderer never draws into swapchain images: the light pass output is
/// blitted into the acquired image, so images need TRANSFER_DST usage and no
/// views.

use umbra_engine::umbra::{Error, Result};
use umbra_engine::umbra::render::{
    AcquireOutcome, CommandList as RendererCommandList, PresentOutcome,
    Semaphore as RendererSemaphore, Swapchain as RendererSwapchain, Texture as RendererTexture,
    TextureFormat,
};
use umbra_engine::{engine_bail, engine_debug, engine_error, engine_fatal, engine_info};
use ash::vk;
use std::sync::Arc;
use std::time::Duration;

use crate::vulkan_command_list::CommandList as VulkanCommandList;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::vk_to_texture_format;
use crate::vulkan_sync::Semaphore as VulkanSemaphore;
use crate::vulkan_texture::Texture as VulkanTexture;

pub struct Swapchain {
    ctx: Arc<GpuContext>,

    surface: vk::SurfaceKHR,

    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    swapchain_images: Vec<vk::Image>,
    surface_format: vk::SurfaceFormatKHR,
    format: TextureFormat,
    swapchain_extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain on `surface`, taking ownership of the surface
    pub(crate) fn new(ctx: Arc<GpuContext>, surface: vk::SurfaceKHR, width: u32, height: u32) -> Result<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);

        // From here on, Drop releases the surface on failure
        let mut swapchain = Self {
            ctx,
            surface,
            swapchain_loader,
            swapchain: vk::SwapchainKHR::null(),
            swapchain_images: Vec::new(),
            surface_format: vk::SurfaceFormatKHR::default(),
            format: TextureFormat::B8G8R8A8_SRGB,
            swapchain_extent: vk::Extent2D { width: 0, height: 0 },
        };

        let surface_formats = unsafe {
            swapchain
                .ctx
                .surface_loader
                .get_physical_device_surface_formats(swapchain.ctx.physical_device, surface)
                .map_err(|e| init_error(format!("Failed to query surface formats: {:?}", e)))?
        };
        let (surface_format, format) = choose_surface_format(&surface_formats).ok_or_else(|| {
            init_error(format!("No supported surface format among {} offered", surface_formats.len()))
        })?;
        swapchain.surface_format = surface_format;
        swapchain.format = format;

        swapchain.build(width, height)?;

        engine_info!(
            "umbra::vulkan",
            "Swapchain created: {}x{} {:?}, {} images",
            swapchain.swapchain_extent.width,
            swapchain.swapchain_extent.height,
            swapchain.format,
            swapchain.swapchain_images.len()
        );
        Ok(swapchain)
    }

    /// (Re)create the VkSwapchainKHR for the requested size, retiring the current one
    fn build(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            let capabilities = self
                .ctx
                .surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
                .map_err(|e| match e {
                    vk::Result::ERROR_SURFACE_LOST_KHR => {
                        engine_fatal!("umbra::vulkan", "Surface lost while querying capabilities")
                    }
                    e => init_error(format!("Failed to get surface capabilities: {:?}", e)),
                })?;

            let extent = choose_extent(&capabilities, width, height);
            if extent.width == 0 || extent.height == 0 {
                engine_bail!(
                    "umbra::vulkan",
                    "Cannot create a {}x{} swapchain (window minimized?)",
                    extent.width, extent.height
                );
            }

            let old_swapchain = self.swapchain;
            let queue_families = [self.ctx.graphics_queue_family, self.ctx.present_queue_family];
            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(choose_image_count(&capabilities))
                .image_format(self.surface_format.format)
                .image_color_space(self.surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(vk::PresentModeKHR::FIFO)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let create_info = if queue_families[0] != queue_families[1] {
                create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&queue_families)
            } else {
                create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            };

            let swapchain = self
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| init_error(format!("Failed to create swapchain: {:?}", e)))?;

            if old_swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;
            self.swapchain_extent = extent;

            self.swapchain_images = self
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| init_error(format!("Failed to get swapchain images: {:?}", e)))?;
        }
        Ok(())
    }
}

impl RendererSwapchain for Swapchain {
    fn acquire_next_image(&mut self, signal: &dyn RendererSemaphore, timeout: Duration) -> Result<AcquireOutcome> {
        let semaphore = unsafe { VulkanSemaphore::from_dyn(signal) };
        let nanos = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);

        let acquired = unsafe {
            self.swapchain_loader
                .acquire_next_image(self.swapchain, nanos, semaphore.semaphore, vk::Fence::null())
        };

        match acquired {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired { image_index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!("umbra::vulkan", "Swapchain out of date during acquire");
                Ok(AcquireOutcome::OutOfDate)
            }
            Err(vk::Result::TIMEOUT) | Err(vk::Result::NOT_READY) => Err(engine_fatal!(
                "umbra::vulkan",
                "No swapchain image available within {:?}",
                timeout
            )),
            Err(e) => Err(engine_fatal!("umbra::vulkan", "Swapchain acquire failed: {:?}", e)),
        }
    }

    fn record_present_blit(
        &self,
        command_list: &mut dyn RendererCommandList,
        source: &dyn RendererTexture,
        image_index: u32,
    ) -> Result<()> {
        let Some(&dst_image) = self.swapchain_images.get(image_index as usize) else {
            engine_bail!(
                "umbra::vulkan",
                "record_present_blit: image_index {} out of range (count: {})",
                image_index, self.swapchain_images.len()
            );
        };

        let vk_cmd = unsafe { VulkanCommandList::from_dyn(command_list) };
        let vk_texture = unsafe { VulkanTexture::from_dyn(source) };
        let cb = vk_cmd.transfer_commands()?;

        let color_range = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };
        let color_layers = vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        };

        // Previous contents are discarded; the acquire semaphore is waited at TRANSFER
        let to_transfer_dst = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(dst_image)
            .subresource_range(color_range)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);

        let region = vk::ImageBlit {
            src_subresource: color_layers,
            src_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: vk_texture.info.width as i32,
                    y: vk_texture.info.height as i32,
                    z: 1,
                },
            ],
            dst_subresource: color_layers,
            dst_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: self.swapchain_extent.width as i32,
                    y: self.swapchain_extent.height as i32,
                    z: 1,
                },
            ],
        };

        let to_present = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(dst_image)
            .subresource_range(color_range)
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::empty());

        unsafe {
            let device = &self.ctx.device;
            device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer_dst],
            );

            device.cmd_blit_image(
                cb,
                vk_texture.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst_image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
                vk::Filter::LINEAR,
            );

            device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_present],
            );
        }
        Ok(())
    }

    fn present(&mut self, image_index: u32, wait: &dyn RendererSemaphore) -> Result<PresentOutcome> {
        let semaphore = unsafe { VulkanSemaphore::from_dyn(wait) };

        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [semaphore.semaphore];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let presented = {
            let _queue = self.ctx.lock_shared()?;
            unsafe { self.swapchain_loader.queue_present(self.ctx.present_queue, &present_info) }
        };

        match presented {
            Ok(false) => Ok(PresentOutcome::Optimal),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(engine_fatal!("umbra::vulkan", "Present failed: {:?}", e)),
        }
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.build(width, height)?;
        engine_debug!(
            "umbra::vulkan",
            "Swapchain recreated: {}x{}, {} images",
            self.swapchain_extent.width,
            self.swapchain_extent.height,
            self.swapchain_images.len()
        );
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.swapchain_images.len()
    }

    fn width(&self) -> u32 {
        self.swapchain_extent.width
    }

    fn height(&self) -> u32 {
        self.swapchain_extent.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();

            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.ctx.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

fn init_error(message: String) -> Error {
    engine_error!("umbra::vulkan", "{}", message);
    Error::InitializationFailed(message)
}

// ===== SURFACE PARAMETER SELECTION =====

/// Prefer an sRGB 8-bit format; otherwise the first format the engine can name
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<(vk::SurfaceFormatKHR, TextureFormat)> {
    let supported = || {
        formats
            .iter()
            .filter_map(|f| vk_to_texture_format(f.format).map(|format| (*f, format)))
    };

    supported()
        .find(|(f, _)| {
            matches!(f.format, vk::Format::B8G8R8A8_SRGB | vk::Format::R8G8B8A8_SRGB)
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| supported().next())
}

/// The surface dictates the extent unless it reports the special value u32::MAX
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

/// One image more than the minimum, capped when the surface has a maximum (0 = none)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        image_count.min(capabilities.max_image_count)
    } else {
        image_count
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
