/// GpuContext - state shared by the device and every Vulkan object it creates
///
/// Every wrapper (texture, buffer, pipeline, swapchain, ...) holds an
/// `Arc<GpuContext>`, so the logical device and the instance outlive the last
/// object created from them. The memory allocator, the descriptor pool and the
/// graphics queue sit behind one coarse lock (`shared`): asset-loading threads
/// may create textures and material binding groups while the render thread
/// records and submits a frame.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use umbra_engine::umbra::render::SamplerType;
use umbra_engine::umbra::Result;
use umbra_engine::{engine_err, engine_fatal};

use crate::vulkan_sampler::SamplerCache;

/// Upload submissions must complete within this delay
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Process-wide allocation state guarded by the coarse device lock
pub(crate) struct GpuShared {
    pub(crate) allocator: Allocator,
    /// Fixed-capacity pool, created with FREE_DESCRIPTOR_SET
    pub(crate) descriptor_pool: vk::DescriptorPool,
    pub(crate) binding_groups_allocated: u32,
}

pub(crate) struct GpuContext {
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,

    pub(crate) graphics_queue: vk::Queue,
    pub(crate) graphics_queue_family: u32,
    pub(crate) present_queue: vk::Queue,
    pub(crate) present_queue_family: u32,

    /// Allocator + descriptor pool. Also held around every queue operation,
    /// since the graphics queue is shared with upload threads.
    /// Wrapped in ManuallyDrop so the allocator is released BEFORE the device.
    shared: ManuallyDrop<Mutex<GpuShared>>,

    /// Pool for one-shot upload command buffers (TRANSIENT + RESET_COMMAND_BUFFER)
    upload_command_pool: Mutex<vk::CommandPool>,

    pub(crate) samplers: Mutex<SamplerCache>,

    pub(crate) surface_loader: ash::khr::surface::Instance,

    debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

/// Everything `GpuContext::new` takes ownership of
pub(crate) struct GpuContextDesc {
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: ash::Device,
    pub(crate) graphics_queue_family: u32,
    pub(crate) present_queue_family: u32,
    pub(crate) allocator: Allocator,
    pub(crate) descriptor_pool: vk::DescriptorPool,
    pub(crate) upload_command_pool: vk::CommandPool,
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    pub(crate) fn new(desc: GpuContextDesc) -> Self {
        // SAFETY: both families were requested at device creation with one queue each
        let (graphics_queue, present_queue) = unsafe {
            (
                desc.device.get_device_queue(desc.graphics_queue_family, 0),
                desc.device.get_device_queue(desc.present_queue_family, 0),
            )
        };
        let surface_loader = ash::khr::surface::Instance::new(&desc.entry, &desc.instance);

        Self {
            entry: desc.entry,
            instance: desc.instance,
            physical_device: desc.physical_device,
            device: desc.device,
            graphics_queue,
            graphics_queue_family: desc.graphics_queue_family,
            present_queue,
            present_queue_family: desc.present_queue_family,
            shared: ManuallyDrop::new(Mutex::new(GpuShared {
                allocator: desc.allocator,
                descriptor_pool: desc.descriptor_pool,
                binding_groups_allocated: 0,
            })),
            upload_command_pool: Mutex::new(desc.upload_command_pool),
            samplers: Mutex::new(SamplerCache::new()),
            surface_loader,
            debug_utils_loader: desc.debug_utils_loader,
            debug_messenger: desc.debug_messenger,
        }
    }

    /// Take the coarse device lock
    pub(crate) fn lock_shared(&self) -> Result<MutexGuard<'_, GpuShared>> {
        self.shared
            .lock()
            .map_err(|_| engine_err!("umbra::vulkan", "GPU allocation lock poisoned"))
    }

    /// Resolve a cached sampler, creating it on first use
    pub(crate) fn sampler(&self, sampler_type: SamplerType) -> Result<vk::Sampler> {
        let mut samplers = self
            .samplers
            .lock()
            .map_err(|_| engine_err!("umbra::vulkan", "Sampler cache lock poisoned"))?;
        samplers.get(&self.device, sampler_type)
    }

    /// Record commands into a one-shot command buffer, submit them on the
    /// graphics queue and block until they complete.
    ///
    /// Used for texture uploads and initial layout transitions.
    pub(crate) fn submit_one_time<F>(&self, label: &str, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        let pool = self
            .upload_command_pool
            .lock()
            .map_err(|_| engine_err!("umbra::vulkan", "Upload command pool lock poisoned"))?;

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = self
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to allocate upload command buffer for '{}': {:?}", label, e))?[0];

            let result = self.record_and_wait(command_buffer, label, record);

            self.device.free_command_buffers(*pool, &[command_buffer]);
            result
        }
    }

    unsafe fn record_and_wait<F>(&self, command_buffer: vk::CommandBuffer, label: &str, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        self.device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| engine_err!("umbra::vulkan", "Failed to begin upload command buffer for '{}': {:?}", label, e))?;

        record(command_buffer);

        self.device
            .end_command_buffer(command_buffer)
            .map_err(|e| engine_err!("umbra::vulkan", "Failed to end upload command buffer for '{}': {:?}", label, e))?;

        let fence = self
            .device
            .create_fence(&vk::FenceCreateInfo::default(), None)
            .map_err(|e| engine_err!("umbra::vulkan", "Failed to create upload fence for '{}': {:?}", label, e))?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

        let submitted = self.lock_shared().and_then(|_queue| {
            self.device
                .queue_submit(self.graphics_queue, &[submit_info], fence)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to submit upload for '{}': {:?}", label, e))
        });

        let waited = submitted.and_then(|_| {
            self.device
                .wait_for_fences(&[fence], true, UPLOAD_TIMEOUT.as_nanos() as u64)
                .map_err(|e| engine_fatal!("umbra::vulkan", "Upload for '{}' did not complete: {:?}", label, e))
        });

        self.device.destroy_fence(fence, None);
        waited
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            // Every object holding this context is gone; drain before teardown
            self.device.device_wait_idle().ok();

            if let Ok(mut samplers) = self.samplers.lock() {
                samplers.shutdown(&self.device);
            }

            if let Ok(pool) = self.upload_command_pool.get_mut() {
                self.device.destroy_command_pool(*pool, None);
            }

            // Free descriptor pool, then drop the allocator BEFORE destroying the device
            if let Ok(shared) = self.shared.get_mut() {
                self.device.destroy_descriptor_pool(shared.descriptor_pool, None);
            }
            ManuallyDrop::drop(&mut self.shared);

            #[cfg(feature = "vulkan-validation")]
            crate::debug::cleanup_debug_config();

            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils_loader, &self.debug_messenger) {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }

            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
