/// Frame orchestrator: paces frames over the in-flight slots, applies resizes,
/// records the G-buffer graph and presents.
///
/// Teardown order follows field order: the graph and targets are released
/// before the slots, the slots before the swapchain, and the device last.
/// `Drop` drains the device first.

use std::sync::Arc;
use crate::config::{validate_shadow_resolution, RendererConfig};
use crate::error::{Error, Result};
use crate::frame::frame_slot::{FrameSlot, SlotState, FRAMES_IN_FLIGHT};
use crate::frame::global_uniform::{CameraState, GlobalUniform, LightParams};
use crate::frame::render_context::{DefaultResources, RenderContext};
use crate::graph::{
    material_order, DrawItem, GBufferGraph, GBufferTargets, MaterialLayout, PassShaders, TargetRole,
};
use crate::graphics_device::{AcquireOutcome, CommandList, Extent2D, GraphicsDevice, PresentOutcome, Swapchain};
use crate::shadow::{CascadeProjector, CascadeSet};
use crate::{engine_debug, engine_error, engine_fatal, engine_info, engine_warn};

const SOURCE: &str = "umbra::FrameOrchestrator";

/// Counters since creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_rendered: u64,
    /// Draw calls of the last recorded frame
    pub draw_calls: u32,
    pub total_draw_calls: u64,
    pub resize_count: u64,
    pub shadow_rebuild_count: u64,
    /// Suboptimal or out-of-date surfaces reported by acquire or present
    pub suboptimal_count: u64,
    /// Frames skipped (minimized window, surface lost twice in a row)
    pub skipped_frames: u64,
}

pub struct FrameOrchestrator {
    graph: GBufferGraph,
    targets: GBufferTargets,
    slots: Vec<FrameSlot>,
    defaults: DefaultResources,
    swapchain: Box<dyn Swapchain>,
    device: Arc<dyn GraphicsDevice>,
    config: RendererConfig,
    projector: CascadeProjector,
    /// Last extent the window reported; zero while minimized
    requested_extent: Extent2D,
    pending_extent: Option<Extent2D>,
    pending_shadow: Option<u32>,
    current_slot: usize,
    frame_number: u64,
    frame_open: bool,
    cascades: CascadeSet,
    /// Draw extent the last uploaded globals were built for
    globals_extent: Extent2D,
    stats: FrameStats,
}

impl FrameOrchestrator {
    /// Build every GPU object in dependency order: passes, targets, per-pass
    /// groups, default resources, then the frame slots.
    ///
    /// The swapchain is recreated first if its extent differs from
    /// `config.draw_extent`; the draw extent is what it ends up with. Any
    /// failure is fatal.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        swapchain: Box<dyn Swapchain>,
        shaders: PassShaders,
        config: RendererConfig,
    ) -> Result<Self> {
        Self::build(device, swapchain, &shaders, config).map_err(|err| {
            if err.is_fatal() {
                err
            } else {
                engine_fatal!(SOURCE, "Renderer initialization failed: {}", err)
            }
        })
    }

    fn build(
        device: Arc<dyn GraphicsDevice>,
        mut swapchain: Box<dyn Swapchain>,
        shaders: &PassShaders,
        config: RendererConfig,
    ) -> Result<Self> {
        config.validate()?;
        let requested = config.draw_extent;
        if Extent2D::new(swapchain.width(), swapchain.height()) != requested {
            engine_debug!(
                SOURCE,
                "Swapchain is {}x{}, recreating at {}x{}",
                swapchain.width(), swapchain.height(), requested.width, requested.height
            );
            swapchain.recreate(requested.width, requested.height)?;
        }
        let draw_extent = Extent2D::new(swapchain.width(), swapchain.height());
        if draw_extent.is_zero() {
            return Err(Error::InitializationFailed(format!(
                "Swapchain extent {}x{} is empty",
                draw_extent.width, draw_extent.height
            )));
        }

        let mut graph = GBufferGraph::new(device.as_ref(), shaders, &config)?;
        let targets = GBufferTargets::new(
            device.as_ref(),
            &graph.render_passes(),
            draw_extent,
            config.shadow_resolution,
        )?;
        graph.bind_targets(device.as_ref(), &targets)?;
        let defaults = DefaultResources::new(device.as_ref(), &graph.material_layout())?;
        let slots = (0..FRAMES_IN_FLIGHT)
            .map(|index| FrameSlot::new(device.as_ref(), index, graph.main_pipeline()))
            .collect::<Result<Vec<_>>>()?;

        engine_info!(
            SOURCE,
            "Renderer ready: {}x{}, shadow {}x{}, {} frames in flight",
            draw_extent.width, draw_extent.height,
            config.shadow_resolution, config.shadow_resolution,
            FRAMES_IN_FLIGHT
        );

        Ok(Self {
            graph,
            targets,
            slots,
            defaults,
            swapchain,
            device,
            projector: CascadeProjector::new(config.cascades.clone()),
            config,
            requested_extent: draw_extent,
            pending_extent: None,
            pending_shadow: None,
            current_slot: 0,
            frame_number: 0,
            frame_open: false,
            cascades: CascadeSet::default(),
            globals_extent: draw_extent,
            stats: FrameStats::default(),
        })
    }

    // ===== FRAME =====

    /// Start a frame and record every pass.
    ///
    /// Returns `Ok(None)` when no frame can be rendered (minimized window, or
    /// a surface that stayed out of date); skip `end_frame` in that case.
    /// The returned command list may take extra commands before `end_frame`.
    pub fn begin_frame(
        &mut self,
        camera: &CameraState,
        lights: &LightParams,
        draws: &[DrawItem],
    ) -> Result<Option<&mut dyn CommandList>> {
        if self.frame_open {
            return Err(Error::InvalidState("begin_frame called twice without end_frame".to_string()));
        }
        if self.requested_extent.is_zero() {
            self.stats.skipped_frames += 1;
            return Ok(None);
        }

        let slot_index = self.current_slot;
        self.slots[slot_index].wait_for_gpu(self.config.fence_timeout)?;

        if !self.record_frame(slot_index, camera, lights, draws).map_err(after_fence_reset)? {
            return Ok(None);
        }
        self.frame_open = true;
        Ok(Some(self.slots[slot_index].command_list_mut()))
    }

    /// Everything `begin_frame` does once the slot fence is reset. Returns
    /// false when the frame was retired without rendering.
    fn record_frame(
        &mut self,
        slot_index: usize,
        camera: &CameraState,
        lights: &LightParams,
        draws: &[DrawItem],
    ) -> Result<bool> {
        self.apply_pending_resizes()?;
        self.upload_globals(slot_index, camera, lights)?;

        let image_index = match self.acquire(slot_index)? {
            Some(image_index) => image_index,
            None => {
                self.slots[slot_index].retire_without_present(self.device.as_ref())?;
                self.stats.skipped_frames += 1;
                return Ok(false);
            }
        };
        if self.targets.draw_extent() != self.globals_extent {
            // Surface was rebuilt during acquire
            self.upload_globals(slot_index, camera, lights)?;
        }
        self.slots[slot_index].mark_acquired(image_index)?;

        let draw_order = material_order(draws);
        let slot = &mut self.slots[slot_index];
        slot.advance(SlotState::Recording)?;
        let (cmd, global_group) = slot.recording_parts();
        cmd.begin()?;

        let mut ctx = RenderContext::new(
            self.frame_number,
            slot_index,
            self.config.clear_color,
            global_group,
            &self.defaults,
            &self.cascades,
            draws,
            &draw_order,
            &mut self.targets,
        );
        self.graph.record(cmd, &mut ctx)?;
        let draw_calls = ctx.draw_calls();
        drop(ctx);

        self.stats.draw_calls = draw_calls;
        self.stats.total_draw_calls += draw_calls as u64;
        Ok(true)
    }

    /// Blit the light target to the acquired image, submit, present and move
    /// to the next slot.
    ///
    /// Any failure past the call-order check is fatal: the slot fence is
    /// already reset and nothing would signal it again.
    pub fn end_frame(&mut self) -> Result<()> {
        if !self.frame_open {
            return Err(Error::InvalidState("end_frame called without begin_frame".to_string()));
        }
        self.frame_open = false;
        self.submit_and_present().map_err(after_fence_reset)
    }

    fn submit_and_present(&mut self) -> Result<()> {
        let slot_index = self.current_slot;
        let slot = &mut self.slots[slot_index];
        let image_index = slot.image_index().ok_or_else(|| {
            Error::InvalidState(format!("Frame slot {} has no acquired image", slot_index))
        })?;

        {
            let cmd = slot.command_list_mut();
            let color = self.targets.texture(TargetRole::LightColor);
            self.swapchain.record_present_blit(cmd, color.as_ref(), image_index)?;
            cmd.end()?;
        }
        slot.submit(self.device.as_ref())?;

        let outcome = self.swapchain.present(image_index, slot.render_finished())?;
        slot.advance(SlotState::Presented)?;

        match outcome {
            PresentOutcome::Optimal => {}
            PresentOutcome::Suboptimal | PresentOutcome::OutOfDate => {
                engine_debug!(SOURCE, "Present reported {:?}, surface refresh scheduled", outcome);
                self.stats.suboptimal_count += 1;
                self.schedule_surface_refresh();
            }
        }

        self.current_slot = (slot_index + 1) % FRAMES_IN_FLIGHT;
        self.frame_number += 1;
        self.stats.frames_rendered += 1;
        Ok(())
    }

    /// Record a draw-extent change; applied at the next `begin_frame`.
    ///
    /// A zero extent (minimized window) makes frames skip until a non-zero
    /// extent arrives. Requests are never compared against the current
    /// extent: each one rebuilds.
    pub fn resize(&mut self, width: u32, height: u32) {
        let extent = Extent2D::new(width, height);
        self.requested_extent = extent;
        if extent.is_zero() {
            engine_debug!(SOURCE, "Window minimized, frames paused");
        } else {
            self.pending_extent = Some(extent);
        }
    }

    /// Record a shadow-map resolution change; applied at the next `begin_frame`
    pub fn resize_shadow_map(&mut self, resolution: u32) -> Result<()> {
        validate_shadow_resolution(resolution)?;
        self.pending_shadow = Some(resolution);
        Ok(())
    }

    /// Wait until the GPU has finished all submitted work
    pub fn wait(&self) -> Result<()> {
        self.device.wait_idle()
    }

    // ===== ACCESSORS =====

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn draw_extent(&self) -> Extent2D {
        self.targets.draw_extent()
    }

    pub fn shadow_resolution(&self) -> u32 {
        self.targets.shadow_resolution()
    }

    /// Extent of the presentable images
    pub fn surface_extent(&self) -> Extent2D {
        Extent2D::new(self.swapchain.width(), self.swapchain.height())
    }

    pub fn targets(&self) -> &GBufferTargets {
        &self.targets
    }

    pub fn graph(&self) -> &GBufferGraph {
        &self.graph
    }

    pub fn defaults(&self) -> &DefaultResources {
        &self.defaults
    }

    /// Creates material groups usable by draws
    pub fn material_layout(&self) -> MaterialLayout {
        self.graph.material_layout()
    }

    /// Index of the slot the next frame records into
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    pub fn frame_slot(&self, index: usize) -> Option<&FrameSlot> {
        self.slots.get(index)
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Cascades of the last frame
    pub fn cascades(&self) -> &CascadeSet {
        &self.cascades
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    // ===== INTERNALS =====

    fn schedule_surface_refresh(&mut self) {
        if !self.requested_extent.is_zero() {
            self.pending_extent = Some(self.requested_extent);
        }
    }

    /// Resize protocol: drain the device, then rebuild only the groups whose
    /// size changed and re-point the pass groups at the new targets.
    fn apply_pending_resizes(&mut self) -> Result<()> {
        if self.pending_extent.is_none() && self.pending_shadow.is_none() {
            return Ok(());
        }
        self.device.wait_idle()?;
        let passes = self.graph.render_passes();

        if let Some(requested) = self.pending_extent {
            self.swapchain.recreate(requested.width, requested.height)?;
            let draw_extent = Extent2D::new(self.swapchain.width(), self.swapchain.height());
            self.targets.rebuild_extent(self.device.as_ref(), &passes, draw_extent)?;
            self.pending_extent = None;
            self.stats.resize_count += 1;
            engine_info!(SOURCE, "Resized to {}x{}", draw_extent.width, draw_extent.height);
        }

        if let Some(resolution) = self.pending_shadow {
            self.targets.rebuild_shadow(self.device.as_ref(), &passes, resolution)?;
            self.pending_shadow = None;
            self.stats.shadow_rebuild_count += 1;
            engine_info!(SOURCE, "Shadow map resized to {}x{}", resolution, resolution);
        }

        self.graph.bind_targets(self.device.as_ref(), &self.targets)
    }

    /// Acquire an image, rebuilding the surface once if it is out of date
    fn acquire(&mut self, slot_index: usize) -> Result<Option<u32>> {
        for attempt in 0..2 {
            let outcome = self
                .swapchain
                .acquire_next_image(self.slots[slot_index].image_available(), self.config.acquire_timeout)?;
            match outcome {
                AcquireOutcome::Acquired { image_index, suboptimal } => {
                    if suboptimal {
                        self.stats.suboptimal_count += 1;
                        self.schedule_surface_refresh();
                    }
                    return Ok(Some(image_index));
                }
                AcquireOutcome::OutOfDate if attempt == 0 => {
                    engine_warn!(SOURCE, "Surface out of date at acquire, rebuilding");
                    self.stats.suboptimal_count += 1;
                    self.schedule_surface_refresh();
                    self.apply_pending_resizes()?;
                }
                AcquireOutcome::OutOfDate => {
                    engine_error!(SOURCE, "Surface still out of date after rebuild, frame skipped");
                    self.schedule_surface_refresh();
                }
            }
        }
        Ok(None)
    }

    fn upload_globals(&mut self, slot_index: usize, camera: &CameraState, lights: &LightParams) -> Result<()> {
        let extent = self.targets.draw_extent();
        self.cascades = self.projector.compute(camera.view, camera.fov_y, extent.aspect_ratio(), lights.direction);
        let uniform = GlobalUniform::build(camera, lights, &self.cascades, extent);
        self.slots[slot_index].uniform_buffer().update(0, uniform.as_bytes())?;
        self.globals_extent = extent;
        Ok(())
    }
}

/// Promote an error raised while the current slot's fence is reset
fn after_fence_reset(err: Error) -> Error {
    if err.is_fatal() {
        err
    } else {
        engine_fatal!(SOURCE, "Frame failed with its slot fence reset: {}", err)
    }
}

impl Drop for FrameOrchestrator {
    fn drop(&mut self) {
        if let Err(err) = self.device.wait_idle() {
            engine_error!(SOURCE, "wait_idle failed during teardown: {}", err);
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
