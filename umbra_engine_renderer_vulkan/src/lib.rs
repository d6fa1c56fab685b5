/*!
# Umbra Engine - Vulkan Backend

Vulkan implementation of the `umbra_engine` graphics device traits, built on
Ash for the API bindings and gpu-allocator for memory management.

The device is created from any window exposing raw display and window
handles; swapchains are created from the device for the same window.

```no_run
use umbra_engine_renderer_vulkan::umbra::{VulkanConfig, VulkanGraphicsDevice};
# fn example<W: raw_window_handle::HasDisplayHandle + raw_window_handle::HasWindowHandle>(window: &W) -> umbra_engine::umbra::Result<()> {
let device = VulkanGraphicsDevice::new(window, VulkanConfig::default())?;
let _swapchain = device.create_swapchain(window, 1280, 720)?;
# Ok(())
# }
```
*/

mod vulkan;
mod vulkan_binding_group;
mod vulkan_buffer;
mod vulkan_command_list;
mod vulkan_config;
mod vulkan_context;
mod vulkan_format;
mod vulkan_frame_buffer;
mod vulkan_pipeline;
mod vulkan_render_pass;
mod vulkan_render_target;
mod vulkan_sampler;
mod vulkan_shader;
mod vulkan_swapchain;
mod vulkan_sync;
mod vulkan_texture;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub mod umbra {
    pub use crate::vulkan::{VulkanGraphicsDevice, DESCRIPTOR_POOL_CAPACITY};
    pub use crate::vulkan_config::{DebugSeverity, VulkanConfig};
    pub use crate::vulkan_swapchain::Swapchain as VulkanSwapchain;

    #[cfg(feature = "vulkan-validation")]
    pub use crate::debug::{get_validation_stats, print_validation_stats_report, ValidationStats};
}
