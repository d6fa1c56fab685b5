/// Frame slot: everything one in-flight frame owns

use std::sync::Arc;
use std::time::Duration;
use crate::error::{Error, Result};
use crate::frame::global_uniform::GlobalUniform;
use crate::graph::GLOBAL_SET;
use crate::graphics_device::{
    BindingGroup, BindingResource, Buffer, BufferDesc, BufferUsage, CommandList, Fence,
    GraphicsDevice, Pipeline, Semaphore, Submission,
};

/// Number of frames the CPU may record ahead of the GPU
pub const FRAMES_IN_FLIGHT: usize = 2;

/// Lifecycle of a slot within one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Fence observed signaled; resources free
    Idle,
    /// Presentable image acquired
    Acquired,
    Recording,
    Submitted,
    /// Presented; the fence is pending until the next wait
    Presented,
}

impl SlotState {
    fn can_advance_to(self, next: SlotState) -> bool {
        matches!(
            (self, next),
            (SlotState::Idle, SlotState::Acquired)
                | (SlotState::Acquired, SlotState::Recording)
                | (SlotState::Recording, SlotState::Submitted)
                | (SlotState::Submitted, SlotState::Presented)
                | (SlotState::Presented, SlotState::Idle)
        )
    }
}

pub struct FrameSlot {
    index: usize,
    command_list: Box<dyn CommandList>,
    image_available: Box<dyn Semaphore>,
    render_finished: Box<dyn Semaphore>,
    in_flight: Box<dyn Fence>,
    uniform_buffer: Arc<dyn Buffer>,
    global_group: Arc<dyn BindingGroup>,
    state: SlotState,
    image_index: Option<u32>,
    fence_waits: u64,
}

impl FrameSlot {
    /// Create slot `index`. The fence starts signaled so the first wait returns at once.
    ///
    /// `global_pipeline` supplies the set 0 layout the global group is allocated against.
    pub fn new(device: &dyn GraphicsDevice, index: usize, global_pipeline: &Arc<dyn Pipeline>) -> Result<Self> {
        let uniform_buffer = device.create_buffer(BufferDesc {
            label: format!("global_uniform[{}]", index),
            size: GlobalUniform::SIZE,
            usage: BufferUsage::Uniform,
        })?;
        let global_group = device.create_binding_group(
            global_pipeline,
            GLOBAL_SET,
            &[BindingResource::UniformBuffer(uniform_buffer.as_ref())],
        )?;

        Ok(Self {
            index,
            command_list: device.create_command_list()?,
            image_available: device.create_semaphore()?,
            render_finished: device.create_semaphore()?,
            in_flight: device.create_fence(true)?,
            uniform_buffer,
            global_group,
            state: SlotState::Idle,
            image_index: None,
            fence_waits: 0,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Presentable image acquired for the frame in progress
    pub fn image_index(&self) -> Option<u32> {
        self.image_index
    }

    /// Fence waits performed on this slot since creation
    pub fn fence_waits(&self) -> u64 {
        self.fence_waits
    }

    pub fn uniform_buffer(&self) -> &Arc<dyn Buffer> {
        &self.uniform_buffer
    }

    pub fn global_group(&self) -> &Arc<dyn BindingGroup> {
        &self.global_group
    }

    pub fn image_available(&self) -> &dyn Semaphore {
        self.image_available.as_ref()
    }

    pub fn render_finished(&self) -> &dyn Semaphore {
        self.render_finished.as_ref()
    }

    pub fn command_list_mut(&mut self) -> &mut dyn CommandList {
        self.command_list.as_mut()
    }

    /// Command list and global group, borrowed together for recording
    pub fn recording_parts(&mut self) -> (&mut dyn CommandList, &Arc<dyn BindingGroup>) {
        (self.command_list.as_mut(), &self.global_group)
    }

    /// Block until the GPU has finished this slot's previous frame, then
    /// re-arm the fence. Leaves the slot idle.
    pub fn wait_for_gpu(&mut self, timeout: Duration) -> Result<()> {
        if !matches!(self.state, SlotState::Idle | SlotState::Presented) {
            return Err(Error::InvalidState(format!(
                "Frame slot {} waited on while {:?}",
                self.index, self.state
            )));
        }
        self.in_flight.wait(timeout)?;
        self.in_flight.reset()?;
        self.fence_waits += 1;
        self.state = SlotState::Idle;
        self.image_index = None;
        Ok(())
    }

    pub fn mark_acquired(&mut self, image_index: u32) -> Result<()> {
        self.advance(SlotState::Acquired)?;
        self.image_index = Some(image_index);
        Ok(())
    }

    pub fn advance(&mut self, next: SlotState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(Error::InvalidState(format!(
                "Frame slot {} cannot go from {:?} to {:?}",
                self.index, self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }

    /// Submit the recorded command list: wait for the acquired image,
    /// signal render-finished and the slot fence.
    pub fn submit(&mut self, device: &dyn GraphicsDevice) -> Result<()> {
        if self.state != SlotState::Recording {
            return Err(Error::InvalidState(format!(
                "Frame slot {} submitted while {:?}",
                self.index, self.state
            )));
        }
        device.submit(&Submission {
            command_list: self.command_list.as_ref(),
            wait_semaphore: Some(self.image_available.as_ref()),
            signal_semaphore: Some(self.render_finished.as_ref()),
            fence: Some(self.in_flight.as_ref()),
        })?;
        self.state = SlotState::Submitted;
        Ok(())
    }

    /// Re-signal the fence without presenting, for a frame abandoned after
    /// its fence was reset. The next wait then returns normally.
    pub fn retire_without_present(&mut self, device: &dyn GraphicsDevice) -> Result<()> {
        self.command_list.begin()?;
        self.command_list.end()?;
        device.submit(&Submission {
            command_list: self.command_list.as_ref(),
            wait_semaphore: None,
            signal_semaphore: None,
            fence: Some(self.in_flight.as_ref()),
        })?;
        self.state = SlotState::Presented;
        self.image_index = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "frame_slot_tests.rs"]
mod tests;
