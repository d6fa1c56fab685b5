/// G-buffer targets: the images every pass renders into or samples from
///
/// Targets live in a generational arena. The extent-dependent group (normal,
/// albedo, metallic-roughness, depth, occlusion, final color) and the shadow
/// group (cascade depth array) are rebuilt independently; a rebuild inserts
/// fresh entries and removes the old ones, so a [`TargetKey`] taken before a
/// rebuild no longer resolves afterwards.

use std::sync::Arc;
use slotmap::{new_key_type, SlotMap};
use crate::error::Result;
use crate::graphics_device::{
    Extent2D, Framebuffer, FramebufferDesc, GraphicsDevice, ImageLayout, RenderPass,
    RenderTarget, Texture, TextureDesc, TextureFormat, TextureUsage,
};
use crate::shadow::CASCADE_COUNT;
use crate::engine_debug;

new_key_type! {
    /// Generational handle to a target
    pub struct TargetKey;
}

/// What a target is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetRole {
    ShadowDepth,
    Normal,
    Albedo,
    MetallicRoughness,
    Depth,
    Occlusion,
    LightColor,
}

/// Targets that are rebuilt together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetGroup {
    /// Sized by the shadow resolution
    Shadow,
    /// Sized by the draw extent
    Extent,
}

impl TargetRole {
    pub const ALL: [TargetRole; 7] = [
        TargetRole::ShadowDepth,
        TargetRole::Normal,
        TargetRole::Albedo,
        TargetRole::MetallicRoughness,
        TargetRole::Depth,
        TargetRole::Occlusion,
        TargetRole::LightColor,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn group(self) -> TargetGroup {
        match self {
            TargetRole::ShadowDepth => TargetGroup::Shadow,
            _ => TargetGroup::Extent,
        }
    }

    pub fn format(self) -> TextureFormat {
        match self {
            TargetRole::ShadowDepth | TargetRole::Depth => TextureFormat::D32_FLOAT,
            TargetRole::Normal | TargetRole::LightColor => TextureFormat::R16G16B16A16_SFLOAT,
            TargetRole::Albedo => TextureFormat::R8G8B8A8_UNORM,
            TargetRole::MetallicRoughness => TextureFormat::R8G8_UNORM,
            TargetRole::Occlusion => TextureFormat::R8_UNORM,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TargetRole::ShadowDepth => "shadow_depth",
            TargetRole::Normal => "gbuffer_normal",
            TargetRole::Albedo => "gbuffer_albedo",
            TargetRole::MetallicRoughness => "gbuffer_metallic_roughness",
            TargetRole::Depth => "gbuffer_depth",
            TargetRole::Occlusion => "ssao_occlusion",
            TargetRole::LightColor => "light_color",
        }
    }

    fn usage(self) -> TextureUsage {
        if self.format().is_depth() {
            TextureUsage::SampledDepthStencil
        } else {
            TextureUsage::SampledAndRenderTarget
        }
    }

    fn array_layers(self) -> u32 {
        match self {
            TargetRole::ShadowDepth => CASCADE_COUNT as u32,
            _ => 1,
        }
    }
}

/// One target image with its per-layer attachment views and tracked layout
pub struct GpuTarget {
    pub texture: Arc<dyn Texture>,
    /// One attachment view per array layer
    pub views: Vec<Arc<dyn RenderTarget>>,
    /// Layout the image will be in once previously recorded commands execute
    pub layout: ImageLayout,
    pub generation: u64,
}

/// Render passes the framebuffers are built against (owned by the passes)
#[derive(Clone)]
pub struct RenderPassSet {
    pub shadow: Arc<dyn RenderPass>,
    pub main: Arc<dyn RenderPass>,
    pub ssao: Arc<dyn RenderPass>,
    pub light: Arc<dyn RenderPass>,
}

struct ExtentFramebuffers {
    main: Arc<dyn Framebuffer>,
    ssao: Arc<dyn Framebuffer>,
    light: Arc<dyn Framebuffer>,
}

/// Every image the G-buffer graph touches, plus the framebuffers binding them
pub struct GBufferTargets {
    arena: SlotMap<TargetKey, GpuTarget>,
    roles: [TargetKey; TargetRole::ALL.len()],
    shadow_framebuffers: Vec<Arc<dyn Framebuffer>>,
    extent_framebuffers: ExtentFramebuffers,
    draw_extent: Extent2D,
    shadow_resolution: u32,
    extent_generation: u64,
    shadow_generation: u64,
}

impl GBufferTargets {
    pub fn new(
        device: &dyn GraphicsDevice,
        passes: &RenderPassSet,
        draw_extent: Extent2D,
        shadow_resolution: u32,
    ) -> Result<Self> {
        let shadow = build_target(device, TargetRole::ShadowDepth, shadow_extent(shadow_resolution), 0)?;
        let shadow_framebuffers = build_shadow_framebuffers(device, passes, &shadow)?;
        let extent_targets = build_extent_targets(device, draw_extent, 0)?;
        let extent_framebuffers = build_extent_framebuffers(device, passes, &extent_targets, draw_extent)?;

        let mut arena = SlotMap::with_key();
        let mut roles = [TargetKey::default(); TargetRole::ALL.len()];
        roles[TargetRole::ShadowDepth.index()] = arena.insert(shadow);
        for (role, target) in extent_targets {
            roles[role.index()] = arena.insert(target);
        }

        Ok(Self {
            arena,
            roles,
            shadow_framebuffers,
            extent_framebuffers,
            draw_extent,
            shadow_resolution,
            extent_generation: 0,
            shadow_generation: 0,
        })
    }

    /// Recreate every extent-dependent target and framebuffer.
    ///
    /// All new objects are created before any old one is released; on error
    /// the previous generation stays in place. The caller guarantees the GPU
    /// is idle.
    pub fn rebuild_extent(
        &mut self,
        device: &dyn GraphicsDevice,
        passes: &RenderPassSet,
        draw_extent: Extent2D,
    ) -> Result<()> {
        let generation = self.extent_generation + 1;
        let targets = build_extent_targets(device, draw_extent, generation)?;
        let framebuffers = build_extent_framebuffers(device, passes, &targets, draw_extent)?;

        self.extent_framebuffers = framebuffers;
        for (role, target) in targets {
            let old = std::mem::replace(&mut self.roles[role.index()], self.arena.insert(target));
            self.arena.remove(old);
        }
        self.draw_extent = draw_extent;
        self.extent_generation = generation;
        engine_debug!(
            "umbra::GBufferTargets",
            "Extent targets rebuilt at {}x{} (generation {})",
            draw_extent.width, draw_extent.height, generation
        );
        Ok(())
    }

    /// Recreate the shadow depth array and its per-cascade framebuffers.
    ///
    /// The caller guarantees the GPU is idle.
    pub fn rebuild_shadow(
        &mut self,
        device: &dyn GraphicsDevice,
        passes: &RenderPassSet,
        shadow_resolution: u32,
    ) -> Result<()> {
        let generation = self.shadow_generation + 1;
        let target = build_target(device, TargetRole::ShadowDepth, shadow_extent(shadow_resolution), generation)?;
        let framebuffers = build_shadow_framebuffers(device, passes, &target)?;

        self.shadow_framebuffers = framebuffers;
        let slot = &mut self.roles[TargetRole::ShadowDepth.index()];
        let old = std::mem::replace(slot, self.arena.insert(target));
        self.arena.remove(old);
        self.shadow_resolution = shadow_resolution;
        self.shadow_generation = generation;
        engine_debug!(
            "umbra::GBufferTargets",
            "Shadow array rebuilt at {}x{} (generation {})",
            shadow_resolution, shadow_resolution, generation
        );
        Ok(())
    }

    pub fn key(&self, role: TargetRole) -> TargetKey {
        self.roles[role.index()]
    }

    /// Look up a target by key; `None` once its generation was replaced
    pub fn resolve(&self, key: TargetKey) -> Option<&GpuTarget> {
        self.arena.get(key)
    }

    pub fn target(&self, role: TargetRole) -> &GpuTarget {
        &self.arena[self.roles[role.index()]]
    }

    pub fn texture(&self, role: TargetRole) -> &Arc<dyn Texture> {
        &self.target(role).texture
    }

    pub fn layout(&self, role: TargetRole) -> ImageLayout {
        self.target(role).layout
    }

    pub fn set_layout(&mut self, role: TargetRole, layout: ImageLayout) {
        let key = self.roles[role.index()];
        self.arena[key].layout = layout;
    }

    /// Framebuffer rendering into cascade `layer` of the shadow array
    pub fn shadow_framebuffer(&self, layer: usize) -> Option<&Arc<dyn Framebuffer>> {
        self.shadow_framebuffers.get(layer)
    }

    pub fn main_framebuffer(&self) -> &Arc<dyn Framebuffer> {
        &self.extent_framebuffers.main
    }

    pub fn ssao_framebuffer(&self) -> &Arc<dyn Framebuffer> {
        &self.extent_framebuffers.ssao
    }

    pub fn light_framebuffer(&self) -> &Arc<dyn Framebuffer> {
        &self.extent_framebuffers.light
    }

    pub fn draw_extent(&self) -> Extent2D {
        self.draw_extent
    }

    pub fn shadow_resolution(&self) -> u32 {
        self.shadow_resolution
    }

    pub fn generation(&self, group: TargetGroup) -> u64 {
        match group {
            TargetGroup::Shadow => self.shadow_generation,
            TargetGroup::Extent => self.extent_generation,
        }
    }

    /// Number of live targets (always one per role)
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}

fn shadow_extent(resolution: u32) -> Extent2D {
    Extent2D::new(resolution, resolution)
}

fn build_target(
    device: &dyn GraphicsDevice,
    role: TargetRole,
    extent: Extent2D,
    generation: u64,
) -> Result<GpuTarget> {
    let texture = device.create_texture(TextureDesc {
        label: role.label().to_string(),
        width: extent.width,
        height: extent.height,
        format: role.format(),
        usage: role.usage(),
        array_layers: role.array_layers(),
        data: None,
    })?;
    let views = (0..role.array_layers())
        .map(|layer| device.create_render_target_view(texture.as_ref(), layer))
        .collect::<Result<Vec<_>>>()?;
    Ok(GpuTarget { texture, views, layout: ImageLayout::Undefined, generation })
}

fn build_extent_targets(
    device: &dyn GraphicsDevice,
    extent: Extent2D,
    generation: u64,
) -> Result<Vec<(TargetRole, GpuTarget)>> {
    TargetRole::ALL
        .iter()
        .filter(|role| role.group() == TargetGroup::Extent)
        .map(|&role| Ok((role, build_target(device, role, extent, generation)?)))
        .collect()
}

fn build_shadow_framebuffers(
    device: &dyn GraphicsDevice,
    passes: &RenderPassSet,
    shadow: &GpuTarget,
) -> Result<Vec<Arc<dyn Framebuffer>>> {
    let info = shadow.texture.info();
    shadow
        .views
        .iter()
        .map(|view| {
            device.create_framebuffer(&FramebufferDesc {
                render_pass: &passes.shadow,
                color_attachments: Vec::new(),
                depth_attachment: Some(Arc::clone(view)),
                width: info.width,
                height: info.height,
            })
        })
        .collect()
}

fn build_extent_framebuffers(
    device: &dyn GraphicsDevice,
    passes: &RenderPassSet,
    targets: &[(TargetRole, GpuTarget)],
    extent: Extent2D,
) -> Result<ExtentFramebuffers> {
    let view = |role: TargetRole| -> Vec<Arc<dyn RenderTarget>> {
        targets
            .iter()
            .filter(|(r, _)| *r == role)
            .flat_map(|(_, target)| target.views.iter().cloned())
            .collect()
    };
    let framebuffer = |render_pass: &Arc<dyn RenderPass>, colors: &[TargetRole], depth: Option<TargetRole>| {
        device.create_framebuffer(&FramebufferDesc {
            render_pass,
            color_attachments: colors.iter().flat_map(|&role| view(role)).collect(),
            depth_attachment: depth.and_then(|role| view(role).into_iter().next()),
            width: extent.width,
            height: extent.height,
        })
    };

    Ok(ExtentFramebuffers {
        main: framebuffer(
            &passes.main,
            &[TargetRole::Normal, TargetRole::Albedo, TargetRole::MetallicRoughness],
            Some(TargetRole::Depth),
        )?,
        ssao: framebuffer(&passes.ssao, &[TargetRole::Occlusion], None)?,
        light: framebuffer(&passes.light, &[TargetRole::LightColor], None)?,
    })
}

#[cfg(test)]
#[path = "targets_tests.rs"]
mod tests;
