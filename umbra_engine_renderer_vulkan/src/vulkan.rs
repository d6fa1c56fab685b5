/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Owns instance, device and queue creation. Every resource it hands out
/// holds an `Arc<GpuContext>`; the context tears the device down once the
/// last of them is dropped.

use umbra_engine::umbra::{Error, Result};
use umbra_engine::umbra::render::{
    BindingGroup as RendererBindingGroup, BindingResource, Buffer as RendererBuffer, BufferDesc,
    CommandList as RendererCommandList, DeviceStats, Fence as RendererFence,
    Framebuffer as RendererFramebuffer, FramebufferDesc, GraphicsDevice,
    Pipeline as RendererPipeline, PipelineDesc, RenderPass as RendererRenderPass, RenderPassDesc,
    RenderTarget as RendererRenderTarget, Semaphore as RendererSemaphore,
    Shader as RendererShader, ShaderDesc, ShaderStage, Submission, Texture as RendererTexture,
    TextureData, TextureDesc, TextureInfo, TextureUsage,
};
use umbra_engine::{engine_bail, engine_debug, engine_err, engine_error, engine_fatal, engine_info, engine_warn};
use ash::vk;
use gpu_allocator::vulkan::{AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CString;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::vulkan_binding_group::{validate_resources, write_descriptors, BindingGroup};
use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::CommandList;
use crate::vulkan_config::VulkanConfig;
use crate::vulkan_context::{GpuContext, GpuContextDesc};
use crate::vulkan_format::{
    attachment_aspect, binding_type_to_vk, buffer_format_to_vk, buffer_usage_to_vk, compare_op_to_vk,
    cull_mode_to_vk, front_face_to_vk, image_layout_to_vk, load_op_to_vk, sampled_aspect,
    shader_stage_to_vk, stage_flags_to_vk, store_op_to_vk, texture_format_to_vk,
    texture_usage_to_vk, topology_to_vk, vertex_input_rate_to_vk,
};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_render_target::RenderTarget;
use crate::vulkan_shader::Shader;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_sync::{Fence, Semaphore};
use crate::vulkan_texture::Texture;

/// Maximum number of live binding groups (descriptor sets)
pub const DESCRIPTOR_POOL_CAPACITY: u32 = 1024;

/// SPIR-V magic number, first word of every module
const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Vulkan graphics device
/// Destroys what `VulkanGraphicsDevice::new` created so far if it bails out
/// before the `GpuContext` takes ownership.
struct InitGuard {
    instance: Option<ash::Instance>,
    debug: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    surface: Option<(ash::khr::surface::Instance, vk::SurfaceKHR)>,
    device: Option<ash::Device>,
    descriptor_pool: vk::DescriptorPool,
}

impl InitGuard {
    fn new(instance: ash::Instance) -> Self {
        Self {
            instance: Some(instance),
            debug: None,
            surface: None,
            device: None,
            descriptor_pool: vk::DescriptorPool::null(),
        }
    }

    fn disarm(&mut self) {
        self.instance = None;
        self.debug = None;
        self.surface = None;
        self.device = None;
        self.descriptor_pool = vk::DescriptorPool::null();
    }
}

impl Drop for InitGuard {
    fn drop(&mut self) {
        unsafe {
            if let Some(device) = self.device.take() {
                if self.descriptor_pool != vk::DescriptorPool::null() {
                    device.destroy_descriptor_pool(self.descriptor_pool, None);
                }
                device.destroy_device(None);
            }
            if let Some((loader, surface)) = self.surface.take() {
                loader.destroy_surface(surface, None);
            }
            if let Some((loader, messenger)) = self.debug.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            if let Some(instance) = self.instance.take() {
                instance.destroy_instance(None);
            }
        }
    }
}

pub struct VulkanGraphicsDevice {
    ctx: Arc<GpuContext>,
    submissions: AtomicU64,
}

/// Log and build an initialization error
fn init_failed(message: String) -> Error {
    engine_error!("umbra::vulkan", "{}", message);
    Error::InitializationFailed(message)
}

fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
    let pool_sizes = [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: DESCRIPTOR_POOL_CAPACITY * 2,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: DESCRIPTOR_POOL_CAPACITY,
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::STORAGE_BUFFER,
            descriptor_count: DESCRIPTOR_POOL_CAPACITY,
        },
    ];
    // Binding groups are freed individually when dropped
    let info = vk::DescriptorPoolCreateInfo::default()
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
        .pool_sizes(&pool_sizes)
        .max_sets(DESCRIPTOR_POOL_CAPACITY);

    unsafe {
        device
            .create_descriptor_pool(&info, None)
            .map_err(|e| init_failed(format!("Failed to create descriptor pool: {:?}", e)))
    }
}

type DebugMessenger = (Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>);

#[cfg(feature = "vulkan-validation")]
unsafe fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
    severity: crate::vulkan_config::DebugSeverity,
) -> Result<DebugMessenger> {
    use crate::vulkan_config::DebugSeverity;

    let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

    crate::debug::init_debug_config(severity);

    let severity_flags = match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    };

    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(severity_flags)
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

    let messenger = debug_utils
        .create_debug_utils_messenger(&debug_info, None)
        .map_err(|e| init_failed(format!("Failed to create debug messenger: {:?}", e)))?;

    Ok((Some(debug_utils), Some(messenger)))
}

impl VulkanGraphicsDevice {
    /// Create a new Vulkan device
    ///
    /// # Arguments
    ///
    /// * `window` - Window used to pick extensions and a present-capable queue family
    /// * `config` - Backend configuration
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: VulkanConfig) -> Result<Self> {
        let enable_validation = config.enable_validation && cfg!(feature = "vulkan-validation");
        if config.enable_validation && !enable_validation {
            engine_warn!(
                "umbra::vulkan",
                "Validation requested but the crate was built without the vulkan-validation feature"
            );
        }

        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| init_failed(format!("Failed to load Vulkan library: {:?}", e)))?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|e| init_failed(format!("Invalid application name: {}", e)))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Umbra")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window
                .display_handle()
                .map_err(|e| init_failed(format!("Failed to get display handle: {}", e)))?;
            let window_handle = window
                .window_handle()
                .map_err(|e| init_failed(format!("Failed to get window handle: {}", e)))?;

            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| init_failed(format!("Failed to get required extensions: {}", e)))?
                .to_vec();

            let mut layer_names = Vec::new();
            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(c"VK_LAYER_KHRONOS_validation".as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_failed(format!("Failed to create Vulkan instance: {:?}", e)))?;
            let mut guard = InitGuard::new(instance.clone());

            #[cfg(feature = "vulkan-validation")]
            let (debug_utils_loader, debug_messenger) = if enable_validation {
                create_debug_messenger(&entry, &instance, config.debug_severity)?
            } else {
                (None, None)
            };
            #[cfg(not(feature = "vulkan-validation"))]
            let (debug_utils_loader, debug_messenger): DebugMessenger = (None, None);
            if let (Some(loader), Some(messenger)) = (&debug_utils_loader, debug_messenger) {
                guard.debug = Some((loader.clone(), messenger));
            }

            // Temporary surface, only used to find a present-capable queue family
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_failed(format!("Failed to create surface: {:?}", e)))?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            guard.surface = Some((surface_loader.clone(), surface));

            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| init_failed(format!("Failed to enumerate physical devices: {:?}", e)))?;

            // First GPU exposing both a graphics family and a present family
            let selected = physical_devices.into_iter().find_map(|physical_device| {
                let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
                let graphics = queue_families
                    .iter()
                    .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))? as u32;
                let present = (0..queue_families.len() as u32).find(|&i| {
                    surface_loader
                        .get_physical_device_surface_support(physical_device, i, surface)
                        .unwrap_or(false)
                })?;
                Some((physical_device, graphics, present))
            });

            surface_loader.destroy_surface(surface, None);
            guard.surface = None;

            let (physical_device, graphics_family_index, present_family_index) =
                selected.ok_or_else(|| init_failed("No Vulkan GPU with graphics and present queues found".to_string()))?;

            let properties = instance.get_physical_device_properties(physical_device);
            if let Ok(name) = properties.device_name_as_c_str() {
                engine_info!("umbra::vulkan", "Using GPU: {}", name.to_string_lossy());
            }

            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![vk::DeviceQueueCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .queue_priorities(&queue_priorities)];
            if present_family_index != graphics_family_index {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(present_family_index)
                        .queue_priorities(&queue_priorities),
                );
            }

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let device_features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| init_failed(format!("Failed to create logical device: {:?}", e)))?;
            guard.device = Some(device.clone());

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| init_failed(format!("Failed to create GPU allocator: {:?}", e)))?;

            let descriptor_pool = create_descriptor_pool(&device)?;
            guard.descriptor_pool = descriptor_pool;

            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let upload_command_pool = device
                .create_command_pool(&upload_pool_create_info, None)
                .map_err(|e| init_failed(format!("Failed to create upload command pool: {:?}", e)))?;
            guard.disarm();

            let ctx = Arc::new(GpuContext::new(GpuContextDesc {
                entry,
                instance,
                physical_device,
                device,
                graphics_queue_family: graphics_family_index,
                present_queue_family: present_family_index,
                allocator,
                descriptor_pool,
                upload_command_pool,
                debug_utils_loader,
                debug_messenger,
            }));

            engine_debug!(
                "umbra::vulkan",
                "Device ready (graphics family {}, present family {}, validation {})",
                graphics_family_index, present_family_index, enable_validation
            );

            Ok(Self { ctx, submissions: AtomicU64::new(0) })
        }
    }

    /// Create a swapchain presenting to `window`
    pub fn create_swapchain<W: HasDisplayHandle + HasWindowHandle>(
        &self,
        window: &W,
        width: u32,
        height: u32,
    ) -> Result<Swapchain> {
        let display_handle = window
            .display_handle()
            .map_err(|e| init_failed(format!("Failed to get display handle: {}", e)))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| init_failed(format!("Failed to get window handle: {}", e)))?;

        unsafe {
            let surface = ash_window::create_surface(
                &self.ctx.entry,
                &self.ctx.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| init_failed(format!("Failed to create surface: {:?}", e)))?;

            let supported = self
                .ctx
                .surface_loader
                .get_physical_device_surface_support(self.ctx.physical_device, self.ctx.present_queue_family, surface)
                .unwrap_or(false);
            if !supported {
                self.ctx.surface_loader.destroy_surface(surface, None);
                return Err(init_failed("Window surface cannot be presented from the selected queue family".to_string()));
            }

            Swapchain::new(Arc::clone(&self.ctx), surface, width, height)
        }
    }

    /// Create a buffer backed by a mapped CpuToGpu allocation
    fn allocate_buffer(&self, label: &str, size: u64, usage: vk::BufferUsageFlags) -> Result<Buffer> {
        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = self
                .ctx
                .device
                .create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create buffer '{}' of {} bytes: {:?}", label, size, e))?;

            let requirements = self.ctx.device.get_buffer_memory_requirements(buffer);

            let allocated = self.ctx.lock_shared().and_then(|mut shared| {
                shared
                    .allocator
                    .allocate(&AllocationCreateDesc {
                        name: label,
                        requirements,
                        location: MemoryLocation::CpuToGpu,
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_e| {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        engine_error!("umbra::vulkan", "Out of GPU memory for buffer '{}' ({:.2} MB)", label, size_mb);
                        Error::OutOfMemory
                    })
            });
            let allocation = match allocated {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            // Owned from here on: Drop frees the allocation on any later error
            let wrapped = Buffer::new(Arc::clone(&self.ctx), buffer, allocation, label.to_string(), size);
            wrapped.bind_memory()?;
            Ok(wrapped)
        }
    }

    /// Copy `(layer, offset)` regions of `staging` into the texture, then move
    /// every layer to SHADER_READ_ONLY_OPTIMAL. Without staging only the
    /// transition is recorded.
    fn upload_texture(
        &self,
        texture: &Texture,
        staging: Option<(&Buffer, Vec<(u32, u64)>)>,
    ) -> Result<()> {
        let info = &texture.info;
        let image = texture.image;
        let range = vk::ImageSubresourceRange {
            aspect_mask: sampled_aspect(info.format),
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: info.array_layers,
        };
        let extent = vk::Extent3D { width: info.width, height: info.height, depth: 1 };
        let device = &self.ctx.device;

        self.ctx.submit_one_time(&info.label, |command_buffer| unsafe {
            let (final_src_stage, final_src_access, current_layout) = match &staging {
                Some((buffer, regions)) => {
                    let to_transfer = vk::ImageMemoryBarrier::default()
                        .old_layout(vk::ImageLayout::UNDEFINED)
                        .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                        .image(image)
                        .subresource_range(range)
                        .src_access_mask(vk::AccessFlags::empty())
                        .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);
                    device.cmd_pipeline_barrier(
                        command_buffer,
                        vk::PipelineStageFlags::TOP_OF_PIPE,
                        vk::PipelineStageFlags::TRANSFER,
                        vk::DependencyFlags::empty(),
                        &[],
                        &[],
                        &[to_transfer],
                    );

                    let copies: Vec<vk::BufferImageCopy> = regions
                        .iter()
                        .map(|&(layer, offset)| {
                            vk::BufferImageCopy::default()
                                .buffer_offset(offset)
                                .buffer_row_length(0)
                                .buffer_image_height(0)
                                .image_subresource(vk::ImageSubresourceLayers {
                                    aspect_mask: range.aspect_mask,
                                    mip_level: 0,
                                    base_array_layer: layer,
                                    layer_count: 1,
                                })
                                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                                .image_extent(extent)
                        })
                        .collect();
                    device.cmd_copy_buffer_to_image(
                        command_buffer,
                        buffer.buffer,
                        image,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        &copies,
                    );
                    (
                        vk::PipelineStageFlags::TRANSFER,
                        vk::AccessFlags::TRANSFER_WRITE,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    )
                }
                None => (
                    vk::PipelineStageFlags::TOP_OF_PIPE,
                    vk::AccessFlags::empty(),
                    vk::ImageLayout::UNDEFINED,
                ),
            };

            let to_shader_read = vk::ImageMemoryBarrier::default()
                .old_layout(current_layout)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(range)
                .src_access_mask(final_src_access)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);
            device.cmd_pipeline_barrier(
                command_buffer,
                final_src_stage,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_shader_read],
            );
        })
    }
}

/// Collect `(layer, bytes)` upload items and check each against the texture size
fn texture_upload_items<'a>(desc: &'a TextureDesc) -> Result<Vec<(u32, &'a [u8])>> {
    let items: Vec<(u32, &[u8])> = match &desc.data {
        Some(TextureData::Single(data)) => vec![(0, data.as_slice())],
        Some(TextureData::Layers(layers)) => layers.iter().map(|ld| (ld.layer, ld.data.as_slice())).collect(),
        None => Vec::new(),
    };

    let expected = desc.width as u64 * desc.height as u64 * desc.format.bytes_per_pixel() as u64;
    for (layer, data) in &items {
        if *layer >= desc.array_layers {
            return Err(Error::InvalidResource(format!(
                "Texture '{}': layer index {} exceeds array_layers {}",
                desc.label, layer, desc.array_layers
            )));
        }
        if data.len() as u64 != expected {
            return Err(Error::InvalidResource(format!(
                "Texture '{}' layer {}: {} bytes of data, expected {}",
                desc.label, layer, data.len(), expected
            )));
        }
    }
    Ok(items)
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn RendererTexture>> {
        if desc.width == 0 || desc.height == 0 || desc.array_layers == 0 {
            return Err(Error::InvalidResource(format!(
                "Texture '{}' has zero extent {}x{}x{}",
                desc.label, desc.width, desc.height, desc.array_layers
            )));
        }

        let upload_items = texture_upload_items(&desc)?;
        if !upload_items.is_empty() && !matches!(desc.usage, TextureUsage::Sampled | TextureUsage::SampledAndRenderTarget) {
            return Err(Error::InvalidResource(format!(
                "Texture '{}': initial data requires a sampled color usage, got {:?}",
                desc.label, desc.usage
            )));
        }

        let format = texture_format_to_vk(desc.format);
        let aspect_mask = sampled_aspect(desc.format);
        let mut usage_flags = texture_usage_to_vk(desc.usage);
        if !upload_items.is_empty() {
            usage_flags |= vk::ImageUsageFlags::TRANSFER_DST;
        }
        let view_type = if desc.array_layers > 1 {
            vk::ImageViewType::TYPE_2D_ARRAY
        } else {
            vk::ImageViewType::TYPE_2D
        };

        let info = TextureInfo::from(&desc);

        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
                .mip_levels(1)
                .array_layers(desc.array_layers)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage_flags)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = self
                .ctx
                .device
                .create_image(&image_create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create image for '{}': {:?}", desc.label, e))?;

            let requirements = self.ctx.device.get_image_memory_requirements(image);

            let allocated = self.ctx.lock_shared().and_then(|mut shared| {
                shared
                    .allocator
                    .allocate(&AllocationCreateDesc {
                        name: &desc.label,
                        requirements,
                        location: MemoryLocation::GpuOnly,
                        linear: false,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_e| {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        engine_error!(
                            "umbra::vulkan",
                            "Out of GPU memory for texture '{}' ({}x{}, layers: {}, {:.2} MB)",
                            desc.label, desc.width, desc.height, desc.array_layers, size_mb
                        );
                        Error::OutOfMemory
                    })
            });
            let allocation = match allocated {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            if let Err(e) = self.ctx.device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                if let Ok(mut shared) = self.ctx.lock_shared() {
                    shared.allocator.free(allocation).ok();
                }
                self.ctx.device.destroy_image(image, None);
                engine_bail!("umbra::vulkan", "Failed to bind memory for '{}': {:?}", desc.label, e);
            }

            // Owned from here on; a null view is valid to destroy
            let mut texture = Texture::new(Arc::clone(&self.ctx), image, vk::ImageView::null(), allocation, info);

            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(view_type)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: desc.array_layers,
                });

            texture.view = self
                .ctx
                .device
                .create_image_view(&view_create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create image view for '{}': {:?}", desc.label, e))?;

            if !upload_items.is_empty() {
                let total: u64 = upload_items.iter().map(|(_, data)| data.len() as u64).sum();
                let staging = self.allocate_buffer(
                    &format!("{} (staging)", desc.label),
                    total,
                    vk::BufferUsageFlags::TRANSFER_SRC,
                )?;

                let mut regions = Vec::with_capacity(upload_items.len());
                let mut offset = 0u64;
                for (layer, data) in &upload_items {
                    staging.update(offset, data)?;
                    regions.push((*layer, offset));
                    offset += data.len() as u64;
                }

                self.upload_texture(&texture, Some((&staging, regions)))?;
                engine_debug!(
                    "umbra::vulkan",
                    "Uploaded texture '{}' ({} layer(s), {} bytes)",
                    desc.label, upload_items.len(), total
                );
            } else if desc.usage == TextureUsage::Sampled {
                // Binding groups read sampled textures in SHADER_READ_ONLY_OPTIMAL
                self.upload_texture(&texture, None)?;
            }

            Ok(Arc::new(texture))
        }
    }

    fn create_render_target_view(
        &self,
        texture: &dyn RendererTexture,
        layer: u32,
    ) -> Result<Arc<dyn RendererRenderTarget>> {
        let info = texture.info();
        if layer >= info.array_layers {
            return Err(Error::InvalidResource(format!(
                "Layer {} out of range for '{}' ({} layers)",
                layer, info.label, info.array_layers
            )));
        }
        if info.usage == TextureUsage::Sampled {
            return Err(Error::InvalidResource(format!(
                "Texture '{}' was not created as an attachment",
                info.label
            )));
        }

        let vk_texture = unsafe { Texture::from_dyn(texture) };

        let view_create_info = vk::ImageViewCreateInfo::default()
            .image(vk_texture.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(texture_format_to_vk(info.format))
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: attachment_aspect(info.format),
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: layer,
                layer_count: 1,
            });

        let image_view = unsafe {
            self.ctx
                .device
                .create_image_view(&view_create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create view of '{}' layer {}: {:?}", info.label, layer, e))?
        };

        Ok(Arc::new(RenderTarget::new(
            Arc::clone(&self.ctx),
            image_view,
            info.width,
            info.height,
            info.format,
            layer,
        )))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RendererRenderPass>> {
        let attachments: Vec<vk::AttachmentDescription> = desc
            .color_attachments
            .iter()
            .chain(desc.depth_attachment.iter())
            .map(|attachment| {
                vk::AttachmentDescription::default()
                    .format(texture_format_to_vk(attachment.format))
                    .samples(vk::SampleCountFlags::TYPE_1)
                    .load_op(load_op_to_vk(attachment.load_op))
                    .store_op(store_op_to_vk(attachment.store_op))
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(image_layout_to_vk(attachment.initial_layout))
                    .final_layout(image_layout_to_vk(attachment.final_layout))
            })
            .collect();

        let color_refs: Vec<vk::AttachmentReference> = (0..desc.color_attachments.len() as u32)
            .map(|i| {
                vk::AttachmentReference::default()
                    .attachment(i)
                    .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            })
            .collect();

        let depth_ref = vk::AttachmentReference::default()
            .attachment(desc.color_attachments.len() as u32)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let has_depth = desc.depth_attachment.is_some();

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if has_depth {
            subpass = subpass.depth_stencil_attachment(&depth_ref);
        }

        let (stage_mask, access_mask) = if has_depth {
            (
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
        } else {
            (vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT, vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        };

        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stage_mask)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(stage_mask)
            .dst_access_mask(access_mask);

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        let render_pass = unsafe {
            self.ctx
                .device
                .create_render_pass(&render_pass_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create render pass: {:?}", e))?
        };

        Ok(Arc::new(RenderPass::new(
            Arc::clone(&self.ctx),
            render_pass,
            desc.color_attachments.len() as u32,
            has_depth,
        )))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc<'_>) -> Result<Arc<dyn RendererFramebuffer>> {
        if desc.render_pass.color_attachment_count() as usize != desc.color_attachments.len()
            || desc.render_pass.has_depth_attachment() != desc.depth_attachment.is_some()
        {
            return Err(Error::InvalidResource(
                "Framebuffer attachments do not match render pass".to_string(),
            ));
        }

        let targets: Vec<Arc<dyn RendererRenderTarget>> = desc
            .color_attachments
            .iter()
            .chain(desc.depth_attachment.iter())
            .cloned()
            .collect();

        let mut views = Vec::with_capacity(targets.len());
        for target in &targets {
            if target.width() != desc.width || target.height() != desc.height {
                return Err(Error::InvalidResource(format!(
                    "Attachment {}x{} does not match framebuffer {}x{}",
                    target.width(), target.height(), desc.width, desc.height
                )));
            }
            views.push(unsafe { RenderTarget::from_dyn(target.as_ref()) }.image_view);
        }

        // SAFETY: render passes handed to this device were created by it
        let vk_render_pass =
            unsafe { &*(desc.render_pass.as_ref() as *const dyn RendererRenderPass as *const RenderPass) };

        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .attachments(&views)
            .width(desc.width)
            .height(desc.height)
            .layers(1);

        let framebuffer = unsafe {
            self.ctx
                .device
                .create_framebuffer(&framebuffer_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create framebuffer: {:?}", e))?
        };

        Ok(Arc::new(Framebuffer::new(
            Arc::clone(&self.ctx),
            framebuffer,
            desc.width,
            desc.height,
            targets,
        )))
    }

    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn RendererBuffer>> {
        if desc.size == 0 {
            return Err(Error::InvalidResource(format!("Buffer '{}' has zero size", desc.label)));
        }
        let buffer = self.allocate_buffer(
            &desc.label,
            desc.size,
            buffer_usage_to_vk(desc.usage) | vk::BufferUsageFlags::TRANSFER_DST,
        )?;
        Ok(Arc::new(buffer))
    }

    fn create_shader(&self, desc: ShaderDesc<'_>) -> Result<Arc<dyn RendererShader>> {
        if desc.code.is_empty() || desc.code.len() % 4 != 0 {
            engine_bail!(
                "umbra::vulkan",
                "Shader code is not a whole number of SPIR-V words (size: {} bytes)",
                desc.code.len()
            );
        }

        // Read words explicitly: the byte slice carries no u32 alignment guarantee
        let words: Vec<u32> = desc
            .code
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        if words[0] != SPIRV_MAGIC {
            engine_bail!("umbra::vulkan", "Shader code is not SPIR-V (magic {:#010x})", words[0]);
        }

        let entry_point = CString::new(desc.entry_point.as_str())
            .map_err(|e| engine_err!("umbra::vulkan", "Invalid shader entry point '{}': {}", desc.entry_point, e))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&words);
        let module = unsafe {
            self.ctx
                .device
                .create_shader_module(&create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create shader module: {:?}", e))?
        };

        Ok(Arc::new(Shader::new(Arc::clone(&self.ctx), module, desc.stage, entry_point)))
    }

    fn create_pipeline(&self, desc: PipelineDesc) -> Result<Arc<dyn RendererPipeline>> {
        if !desc.color_formats.is_empty() && desc.fragment_shader.is_none() {
            return Err(Error::InvalidResource(format!(
                "Pipeline '{}' writes color but has no fragment shader",
                desc.label
            )));
        }

        // SAFETY: shaders handed to this device were created by it
        let vertex_shader = unsafe { &*(desc.vertex_shader.as_ref() as *const dyn RendererShader as *const Shader) };
        let fragment_shader = desc
            .fragment_shader
            .as_ref()
            .map(|shader| unsafe { &*(shader.as_ref() as *const dyn RendererShader as *const Shader) });

        if vertex_shader.stage != ShaderStage::Vertex
            || fragment_shader.is_some_and(|shader| shader.stage != ShaderStage::Fragment)
        {
            engine_bail!("umbra::vulkan", "Pipeline '{}': shader stages do not match their slots", desc.label);
        }

        let mut shader_stages = vec![vk::PipelineShaderStageCreateInfo::default()
            .stage(shader_stage_to_vk(vertex_shader.stage))
            .module(vertex_shader.module)
            .name(&vertex_shader.entry_point)];
        if let Some(fragment) = fragment_shader {
            shader_stages.push(
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stage_to_vk(fragment.stage))
                    .module(fragment.module)
                    .name(&fragment.entry_point),
            );
        }

        // Layout objects belong to the wrapper right away so every error path releases them
        let mut pipeline = Pipeline::new(
            Arc::clone(&self.ctx),
            vk::Pipeline::null(),
            vk::PipelineLayout::null(),
            Vec::with_capacity(desc.binding_group_layouts.len()),
            desc.binding_group_layouts.clone(),
            desc.label.clone(),
        );

        let device = &self.ctx.device;

        unsafe {
            for bg_layout_desc in &desc.binding_group_layouts {
                let bindings: Vec<vk::DescriptorSetLayoutBinding> = bg_layout_desc
                    .entries
                    .iter()
                    .map(|entry| {
                        vk::DescriptorSetLayoutBinding::default()
                            .binding(entry.binding)
                            .descriptor_type(binding_type_to_vk(entry.binding_type))
                            .descriptor_count(entry.count)
                            .stage_flags(stage_flags_to_vk(entry.stage_flags))
                    })
                    .collect();

                let layout_create = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
                let ds_layout = device
                    .create_descriptor_set_layout(&layout_create, None)
                    .map_err(|e| engine_err!("umbra::vulkan", "Failed to create descriptor set layout for '{}': {:?}", desc.label, e))?;
                pipeline.descriptor_set_layouts.push(ds_layout);
            }

            let push_constant_ranges: Vec<vk::PushConstantRange> = desc
                .push_constant_ranges
                .iter()
                .map(|range| vk::PushConstantRange {
                    stage_flags: stage_flags_to_vk(range.stages),
                    offset: range.offset,
                    size: range.size,
                })
                .collect();

            let layout_create_info = vk::PipelineLayoutCreateInfo::default()
                .set_layouts(&pipeline.descriptor_set_layouts)
                .push_constant_ranges(&push_constant_ranges);

            pipeline.pipeline_layout = device
                .create_pipeline_layout(&layout_create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create pipeline layout for '{}': {:?}", desc.label, e))?;

            // Pipelines only need a compatible pass: same attachment formats and sample counts
            let mut attachments: Vec<vk::AttachmentDescription> = desc
                .color_formats
                .iter()
                .map(|format| {
                    vk::AttachmentDescription::default()
                        .format(texture_format_to_vk(*format))
                        .samples(vk::SampleCountFlags::TYPE_1)
                        .load_op(vk::AttachmentLoadOp::DONT_CARE)
                        .store_op(vk::AttachmentStoreOp::STORE)
                        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                        .initial_layout(vk::ImageLayout::UNDEFINED)
                        .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                })
                .collect();
            let color_refs: Vec<vk::AttachmentReference> = (0..desc.color_formats.len() as u32)
                .map(|i| {
                    vk::AttachmentReference::default()
                        .attachment(i)
                        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                })
                .collect();
            let depth_ref = vk::AttachmentReference::default()
                .attachment(desc.color_formats.len() as u32)
                .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

            let mut subpass = vk::SubpassDescription::default()
                .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                .color_attachments(&color_refs);
            if let Some(depth_format) = desc.depth_format {
                attachments.push(
                    vk::AttachmentDescription::default()
                        .format(texture_format_to_vk(depth_format))
                        .samples(vk::SampleCountFlags::TYPE_1)
                        .load_op(vk::AttachmentLoadOp::DONT_CARE)
                        .store_op(vk::AttachmentStoreOp::STORE)
                        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                        .initial_layout(vk::ImageLayout::UNDEFINED)
                        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
                );
                subpass = subpass.depth_stencil_attachment(&depth_ref);
            }

            let render_pass_info = vk::RenderPassCreateInfo::default()
                .attachments(&attachments)
                .subpasses(std::slice::from_ref(&subpass));

            let temp_render_pass = device
                .create_render_pass(&render_pass_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create temporary render pass for '{}': {:?}", desc.label, e))?;

            let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc
                .vertex_layout
                .bindings
                .iter()
                .map(|binding| vk::VertexInputBindingDescription {
                    binding: binding.binding,
                    stride: binding.stride,
                    input_rate: vertex_input_rate_to_vk(binding.input_rate),
                })
                .collect();

            let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc
                .vertex_layout
                .attributes
                .iter()
                .map(|attribute| vk::VertexInputAttributeDescription {
                    location: attribute.location,
                    binding: attribute.binding,
                    format: buffer_format_to_vk(attribute.format),
                    offset: attribute.offset,
                })
                .collect();

            let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
                .vertex_binding_descriptions(&vertex_bindings)
                .vertex_attribute_descriptions(&vertex_attributes);

            let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(topology_to_vk(desc.topology))
                .primitive_restart_enable(false);

            // Viewport and scissor are dynamic
            let viewport_state = vk::PipelineViewportStateCreateInfo::default()
                .viewport_count(1)
                .scissor_count(1);

            let mut rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
                .depth_clamp_enable(false)
                .rasterizer_discard_enable(false)
                .polygon_mode(vk::PolygonMode::FILL)
                .line_width(1.0)
                .cull_mode(cull_mode_to_vk(desc.rasterization.cull_mode))
                .front_face(front_face_to_vk(desc.rasterization.front_face));
            if let Some(bias) = desc.rasterization.depth_bias {
                rasterization_state = rasterization_state
                    .depth_bias_enable(true)
                    .depth_bias_constant_factor(bias.constant_factor)
                    .depth_bias_slope_factor(bias.slope_factor)
                    .depth_bias_clamp(0.0);
            }

            let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(desc.depth_stencil.depth_test_enable)
                .depth_write_enable(desc.depth_stencil.depth_write_enable)
                .depth_compare_op(compare_op_to_vk(desc.depth_stencil.depth_compare_op))
                .depth_bounds_test_enable(false)
                .stencil_test_enable(false);

            let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
                .sample_shading_enable(false)
                .rasterization_samples(vk::SampleCountFlags::TYPE_1);

            let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = desc
                .color_formats
                .iter()
                .map(|_| {
                    vk::PipelineColorBlendAttachmentState::default()
                        .color_write_mask(vk::ColorComponentFlags::RGBA)
                        .blend_enable(false)
                })
                .collect();

            let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
                .logic_op_enable(false)
                .attachments(&blend_attachments);

            let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
            let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

            let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&shader_stages)
                .vertex_input_state(&vertex_input_state)
                .input_assembly_state(&input_assembly_state)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization_state)
                .depth_stencil_state(&depth_stencil_state)
                .multisample_state(&multisample_state)
                .color_blend_state(&color_blend_state)
                .dynamic_state(&dynamic_state)
                .layout(pipeline.pipeline_layout)
                .render_pass(temp_render_pass)
                .subpass(0);

            let created = device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None);

            device.destroy_render_pass(temp_render_pass, None);

            let pipelines = created
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create graphics pipeline '{}': {:?}", desc.label, e.1))?;
            pipeline.pipeline = pipelines[0];
        }

        engine_debug!("umbra::vulkan", "Created pipeline '{}'", desc.label);
        Ok(Arc::new(pipeline))
    }

    fn create_binding_group(
        &self,
        pipeline: &Arc<dyn RendererPipeline>,
        set_index: u32,
        resources: &[BindingResource<'_>],
    ) -> Result<Arc<dyn RendererBindingGroup>> {
        let vk_pipeline = unsafe { Pipeline::from_arc(pipeline) };

        let (layout, ds_layout) = match (
            vk_pipeline.binding_group_layouts.get(set_index as usize),
            vk_pipeline.descriptor_set_layouts.get(set_index as usize),
        ) {
            (Some(layout), Some(ds_layout)) => (layout, *ds_layout),
            _ => {
                return Err(Error::InvalidResource(format!(
                    "Pipeline '{}' has no binding group layout at set {}",
                    vk_pipeline.label(), set_index
                )))
            }
        };
        validate_resources(layout, resources, set_index)?;

        let descriptor_set = {
            let mut shared = self.ctx.lock_shared()?;
            if shared.binding_groups_allocated >= DESCRIPTOR_POOL_CAPACITY {
                engine_error!(
                    "umbra::vulkan",
                    "Descriptor pool exhausted ({} binding groups live)",
                    shared.binding_groups_allocated
                );
                return Err(Error::OutOfMemory);
            }

            let set_layouts = [ds_layout];
            let alloc_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(shared.descriptor_pool)
                .set_layouts(&set_layouts);

            let sets = unsafe { self.ctx.device.allocate_descriptor_sets(&alloc_info) }.map_err(|e| match e {
                vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL => {
                    engine_error!("umbra::vulkan", "Descriptor pool exhausted: {:?}", e);
                    Error::OutOfMemory
                }
                other => engine_err!("umbra::vulkan", "Failed to allocate descriptor set: {:?}", other),
            })?;
            shared.binding_groups_allocated += 1;
            sets[0]
        };

        // Owned from here on: Drop returns the set to the pool if the write fails
        let group = BindingGroup::new(Arc::clone(&self.ctx), descriptor_set, set_index, layout.clone());
        write_descriptors(&self.ctx, descriptor_set, &group.layout, resources)?;

        Ok(Arc::new(group))
    }

    fn update_binding_group(
        &self,
        binding_group: &Arc<dyn RendererBindingGroup>,
        resources: &[BindingResource<'_>],
    ) -> Result<()> {
        let group = unsafe { BindingGroup::from_arc(binding_group) };
        validate_resources(&group.layout, resources, group.set_index())?;
        write_descriptors(&self.ctx, group.descriptor_set, &group.layout, resources)
    }

    fn create_command_list(&self) -> Result<Box<dyn RendererCommandList>> {
        Ok(Box::new(CommandList::new(Arc::clone(&self.ctx))?))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn RendererFence>> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let fence = unsafe {
            self.ctx
                .device
                .create_fence(&vk::FenceCreateInfo::default().flags(flags), None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create fence: {:?}", e))?
        };
        Ok(Box::new(Fence::new(Arc::clone(&self.ctx), fence)))
    }

    fn create_semaphore(&self) -> Result<Box<dyn RendererSemaphore>> {
        let semaphore = unsafe {
            self.ctx
                .device
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create semaphore: {:?}", e))?
        };
        Ok(Box::new(Semaphore::new(Arc::clone(&self.ctx), semaphore)))
    }

    fn submit(&self, submission: &Submission<'_>) -> Result<()> {
        let command_list = unsafe { CommandList::from_dyn(submission.command_list) };
        if command_list.is_recording() {
            engine_bail!("umbra::vulkan", "Cannot submit a command list that is still recording");
        }

        let command_buffers = [command_list.command_buffer()];
        let wait_semaphores: Vec<vk::Semaphore> = submission
            .wait_semaphore
            .iter()
            .map(|semaphore| unsafe { Semaphore::from_dyn(*semaphore) }.semaphore)
            .collect();
        // The acquired image is first written by the present blit (transfer)
        let wait_stages: Vec<vk::PipelineStageFlags> = wait_semaphores
            .iter()
            .map(|_| vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::TRANSFER)
            .collect();
        let signal_semaphores: Vec<vk::Semaphore> = submission
            .signal_semaphore
            .iter()
            .map(|semaphore| unsafe { Semaphore::from_dyn(*semaphore) }.semaphore)
            .collect();
        let fence = submission
            .fence
            .map(|fence| unsafe { Fence::from_dyn(fence) }.fence)
            .unwrap_or_else(vk::Fence::null);

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        {
            let _queue = self.ctx.lock_shared()?;
            unsafe {
                self.ctx
                    .device
                    .queue_submit(self.ctx.graphics_queue, &[submit_info], fence)
                    .map_err(|e| engine_fatal!("umbra::vulkan", "Queue submit failed: {:?}", e))?;
            }
        }

        self.submissions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        let _queue = self.ctx.lock_shared()?;
        unsafe {
            self.ctx.device.device_wait_idle().map_err(|e| match e {
                vk::Result::ERROR_DEVICE_LOST => engine_fatal!("umbra::vulkan", "Device lost while waiting for idle"),
                other => engine_err!("umbra::vulkan", "Failed to wait for device idle: {:?}", other),
            })
        }
    }

    fn stats(&self) -> DeviceStats {
        let binding_groups_allocated = self
            .ctx
            .lock_shared()
            .map(|shared| shared.binding_groups_allocated)
            .unwrap_or(0);
        DeviceStats {
            binding_groups_allocated,
            binding_group_capacity: DESCRIPTOR_POOL_CAPACITY,
            submissions: self.submissions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[path = "vulkan_tests.rs"]
mod tests;
