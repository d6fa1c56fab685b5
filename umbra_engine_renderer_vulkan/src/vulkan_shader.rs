/// Shader - Vulkan implementation of the Shader trait

use umbra_engine::umbra::render::{Shader as RendererShader, ShaderStage};
use ash::vk;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

pub struct Shader {
    ctx: Arc<GpuContext>,
    pub(crate) module: vk::ShaderModule,
    pub(crate) stage: ShaderStage,
    pub(crate) entry_point: CString,
}

impl Shader {
    pub(crate) fn new(ctx: Arc<GpuContext>, module: vk::ShaderModule, stage: ShaderStage, entry_point: CString) -> Self {
        Self { ctx, module, stage, entry_point }
    }
}

impl RendererShader for Shader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_shader_module(self.module, None);
        }
    }
}
