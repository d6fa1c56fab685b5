/// Per-frame render context threaded through every pass, and the default
/// resources draws fall back on.

use std::cell::Cell;
use std::sync::Arc;
use crate::error::Result;
use crate::graph::{DrawItem, GBufferTargets, MaterialBindings, MaterialFactors, MaterialLayout, TargetRole};
use crate::graphics_device::{
    BindingGroup, Buffer, BufferDesc, BufferUsage, CommandList, Extent2D, GraphicsDevice,
    ImageBarrier, ImageLayout, Texture, TextureData, TextureDesc, TextureFormat, TextureUsage,
};
use crate::shadow::CascadeSet;

/// Resources created before the first frame and shared by every frame
pub struct DefaultResources {
    white: Arc<dyn Texture>,
    flat_normal: Arc<dyn Texture>,
    material_factors: Arc<dyn Buffer>,
    material_group: Arc<dyn BindingGroup>,
}

impl DefaultResources {
    pub fn new(device: &dyn GraphicsDevice, materials: &MaterialLayout) -> Result<Self> {
        let white = solid_texture(device, "default_white", [255, 255, 255, 255])?;
        let flat_normal = solid_texture(device, "default_flat_normal", [128, 128, 255, 255])?;

        let factors = MaterialFactors::default();
        let material_factors = device.create_buffer(BufferDesc {
            label: "default_material".to_string(),
            size: MaterialFactors::SIZE,
            usage: BufferUsage::Uniform,
        })?;
        material_factors.update(0, bytemuck::bytes_of(&factors))?;

        let material_group = materials.create_group(
            device,
            &MaterialBindings {
                albedo: white.as_ref(),
                normal: flat_normal.as_ref(),
                metallic_roughness: white.as_ref(),
                factors: material_factors.as_ref(),
            },
        )?;

        Ok(Self { white, flat_normal, material_factors, material_group })
    }

    /// 1x1 opaque white
    pub fn white_texture(&self) -> &Arc<dyn Texture> {
        &self.white
    }

    /// 1x1 tangent-space +Z normal
    pub fn flat_normal_texture(&self) -> &Arc<dyn Texture> {
        &self.flat_normal
    }

    pub fn material_factors(&self) -> &Arc<dyn Buffer> {
        &self.material_factors
    }

    /// Material group bound for draws without a material
    pub fn material_group(&self) -> &Arc<dyn BindingGroup> {
        &self.material_group
    }
}

fn solid_texture(device: &dyn GraphicsDevice, label: &str, texel: [u8; 4]) -> Result<Arc<dyn Texture>> {
    device.create_texture(TextureDesc {
        label: label.to_string(),
        width: 1,
        height: 1,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::Sampled,
        array_layers: 1,
        data: Some(TextureData::Single(texel.to_vec())),
    })
}

/// Everything a pass may look at while recording one frame
pub struct RenderContext<'a> {
    pub frame_number: u64,
    pub slot_index: usize,
    pub draw_extent: Extent2D,
    pub clear_color: [f32; 4],
    /// Set 0 of every pipeline, pointing at this slot's uniform buffer
    pub global_group: &'a Arc<dyn BindingGroup>,
    pub defaults: &'a DefaultResources,
    pub cascades: &'a CascadeSet,
    pub draws: &'a [DrawItem],
    /// Indices into `draws`, grouped by material
    pub draw_order: &'a [usize],
    targets: &'a mut GBufferTargets,
    draw_calls: Cell<u32>,
}

impl<'a> RenderContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frame_number: u64,
        slot_index: usize,
        clear_color: [f32; 4],
        global_group: &'a Arc<dyn BindingGroup>,
        defaults: &'a DefaultResources,
        cascades: &'a CascadeSet,
        draws: &'a [DrawItem],
        draw_order: &'a [usize],
        targets: &'a mut GBufferTargets,
    ) -> Self {
        Self {
            frame_number,
            slot_index,
            draw_extent: targets.draw_extent(),
            clear_color,
            global_group,
            defaults,
            cascades,
            draws,
            draw_order,
            targets,
            draw_calls: Cell::new(0),
        }
    }

    pub fn targets(&self) -> &GBufferTargets {
        self.targets
    }

    /// Draws in submission order
    pub fn ordered_draws(&self) -> impl Iterator<Item = &DrawItem> + '_ {
        self.draw_order.iter().filter_map(|&i| self.draws.get(i))
    }

    pub fn count_draw(&self) {
        self.draw_calls.set(self.draw_calls.get() + 1);
    }

    pub fn draw_calls(&self) -> u32 {
        self.draw_calls.get()
    }

    /// Record one batched barrier moving each target to its requested layout,
    /// starting from its tracked layout. Targets already there are skipped.
    pub fn transition(
        &mut self,
        cmd: &mut dyn CommandList,
        requests: &[(TargetRole, ImageLayout)],
    ) -> Result<()> {
        let pending: Vec<(TargetRole, ImageLayout, ImageLayout)> = requests
            .iter()
            .filter_map(|&(role, new_layout)| {
                let old_layout = self.targets.layout(role);
                (old_layout != new_layout).then_some((role, old_layout, new_layout))
            })
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        {
            let barriers: Vec<ImageBarrier<'_>> = pending
                .iter()
                .map(|&(role, old_layout, new_layout)| {
                    ImageBarrier::whole(self.targets.texture(role).as_ref(), old_layout, new_layout)
                })
                .collect();
            cmd.pipeline_barrier(&barriers)?;
        }

        for (role, _, new_layout) in pending {
            self.targets.set_layout(role, new_layout);
        }
        Ok(())
    }
}
