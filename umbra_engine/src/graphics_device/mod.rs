/// Graphics device module - backend-agnostic GPU resource traits

pub mod bindable;
pub mod binding_group;
pub mod buffer;
pub mod command_list;
pub mod device;
pub mod framebuffer;
pub mod pipeline;
pub mod render_pass;
pub mod render_target;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock_graphics_device;

pub use bindable::*;
pub use binding_group::*;
pub use buffer::*;
pub use command_list::*;
pub use device::*;
pub use framebuffer::*;
pub use pipeline::*;
pub use render_pass::*;
pub use render_target::*;
pub use shader::*;
pub use swapchain::*;
pub use sync::*;
pub use texture::*;
