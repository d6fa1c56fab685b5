/// SamplerCache - VkSampler objects created on first use, one per SamplerType
///
/// The renderer only ever needs the five sampler kinds it names, so the cache
/// never evicts. Samplers are destroyed by `GpuContext` teardown.

use ash::vk;
use rustc_hash::FxHashMap;
use umbra_engine::engine_err;
use umbra_engine::umbra::render::SamplerType;
use umbra_engine::umbra::Result;

pub(crate) struct SamplerCache {
    cache: FxHashMap<SamplerType, vk::Sampler>,
}

impl SamplerCache {
    pub(crate) fn new() -> Self {
        Self { cache: FxHashMap::default() }
    }

    /// Get or create the VkSampler for `sampler_type`
    pub(crate) fn get(&mut self, device: &ash::Device, sampler_type: SamplerType) -> Result<vk::Sampler> {
        if let Some(&sampler) = self.cache.get(&sampler_type) {
            return Ok(sampler);
        }

        let create_info = sampler_create_info(sampler_type);
        let sampler = unsafe {
            device
                .create_sampler(&create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create {:?} sampler: {:?}", sampler_type, e))?
        };
        self.cache.insert(sampler_type, sampler);
        Ok(sampler)
    }

    /// Destroy every cached sampler. Called while the device is still alive.
    pub(crate) fn shutdown(&mut self, device: &ash::Device) {
        for (_, sampler) in self.cache.drain() {
            unsafe { device.destroy_sampler(sampler, None) };
        }
    }
}

/// Filtering, addressing and comparison state for each sampler kind
pub(crate) fn sampler_create_info(sampler_type: SamplerType) -> vk::SamplerCreateInfo<'static> {
    let (filter, mipmap, address, anisotropy, border, compare) = match sampler_type {
        SamplerType::LinearRepeat => (
            vk::Filter::LINEAR,
            vk::SamplerMipmapMode::LINEAR,
            vk::SamplerAddressMode::REPEAT,
            Some(16.0),
            vk::BorderColor::FLOAT_OPAQUE_BLACK,
            None,
        ),
        SamplerType::LinearClamp => (
            vk::Filter::LINEAR,
            vk::SamplerMipmapMode::LINEAR,
            vk::SamplerAddressMode::CLAMP_TO_EDGE,
            Some(16.0),
            vk::BorderColor::FLOAT_OPAQUE_BLACK,
            None,
        ),
        SamplerType::NearestRepeat => (
            vk::Filter::NEAREST,
            vk::SamplerMipmapMode::NEAREST,
            vk::SamplerAddressMode::REPEAT,
            None,
            vk::BorderColor::FLOAT_OPAQUE_BLACK,
            None,
        ),
        // G-buffer reads: one texel per pixel, nothing outside the image
        SamplerType::NearestClamp => (
            vk::Filter::NEAREST,
            vk::SamplerMipmapMode::NEAREST,
            vk::SamplerAddressMode::CLAMP_TO_EDGE,
            None,
            vk::BorderColor::FLOAT_OPAQUE_BLACK,
            None,
        ),
        // Outside the cascade = fully lit
        SamplerType::Shadow => (
            vk::Filter::LINEAR,
            vk::SamplerMipmapMode::NEAREST,
            vk::SamplerAddressMode::CLAMP_TO_BORDER,
            None,
            vk::BorderColor::FLOAT_OPAQUE_WHITE,
            Some(vk::CompareOp::LESS_OR_EQUAL),
        ),
    };

    let create_info = vk::SamplerCreateInfo::default()
        .mag_filter(filter)
        .min_filter(filter)
        .mipmap_mode(mipmap)
        .address_mode_u(address)
        .address_mode_v(address)
        .address_mode_w(address)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(vk::LOD_CLAMP_NONE)
        .border_color(border)
        .unnormalized_coordinates(false);

    let create_info = match compare {
        Some(op) => create_info.compare_enable(true).compare_op(op),
        None => create_info.compare_enable(false).compare_op(vk::CompareOp::ALWAYS),
    };

    match anisotropy {
        Some(max) => create_info.anisotropy_enable(true).max_anisotropy(max),
        None => create_info.anisotropy_enable(false).max_anisotropy(1.0),
    }
}

#[cfg(test)]
#[path = "vulkan_sampler_tests.rs"]
mod tests;
