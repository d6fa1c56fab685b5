/// Mock graphics device for tests (no GPU required)
///
/// Every object reports into a shared [`MockLedger`]: device-level events in
/// order, the command stream of every recorded command list, and resource
/// counters. Fences signal as soon as their submission is made, which models a
/// GPU that always keeps up; scripted outcomes in the ledger inject
/// suboptimal / out-of-date surfaces and fence timeouts.
///
/// Objects passed back into the device (pipelines, binding groups, fences)
/// must have been created by a `MockGraphicsDevice`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::graphics_device::{
    AcquireOutcome, BindingGroup, BindingGroupLayoutDesc, BindingResource, Buffer, BufferDesc,
    ClearValue, CommandList, DeviceStats, Fence, Framebuffer, FramebufferDesc, GraphicsDevice,
    ImageBarrier, ImageLayout, IndexType, Pipeline, PipelineDesc, PresentOutcome, Rect2D,
    RenderPass, RenderPassDesc, RenderTarget, Semaphore, Shader, ShaderDesc, ShaderStage,
    ShaderStageFlags, Submission, Swapchain, Texture, TextureDesc, TextureFormat, TextureInfo,
    TextureUsage, Viewport,
};
use crate::{engine_bail, engine_fatal};

/// Binding group capacity of the mock pool
pub const MOCK_POOL_CAPACITY: u32 = 1024;

// ============================================================================
// Ledger
// ============================================================================

/// Everything the mock objects observed
#[derive(Debug, Default)]
pub struct MockLedger {
    /// Device-level events in call order
    pub events: Vec<String>,
    /// Command stream of each command list, appended when recording ends
    pub recorded: Vec<Vec<String>>,
    pub textures_created: usize,
    pub textures_alive: usize,
    pub binding_groups_alive: u32,
    pub binding_group_updates: usize,
    pub wait_idle_calls: usize,
    pub fence_waits: usize,
    pub submissions: u64,
    /// Outcomes returned by the next acquires, before falling back to normal behavior
    pub acquire_script: VecDeque<AcquireOutcome>,
    /// Outcomes returned by the next presents
    pub present_script: VecDeque<PresentOutcome>,
    /// Make the next fence wait time out
    pub fail_next_fence_wait: bool,
    /// Make the next present fail with a plain backend error
    pub fail_next_present: bool,
    /// Make the next submit fail with a plain backend error
    pub fail_next_submit: bool,
}

impl MockLedger {
    /// Events containing `pattern`
    pub fn events_matching(&self, pattern: &str) -> Vec<String> {
        self.events.iter().filter(|e| e.contains(pattern)).cloned().collect()
    }

    /// Command stream of the most recently ended command list
    pub fn last_recorded(&self) -> Option<&Vec<String>> {
        self.recorded.last()
    }
}

pub type SharedLedger = Arc<Mutex<MockLedger>>;

fn lock(ledger: &SharedLedger) -> MutexGuard<'_, MockLedger> {
    // A test that panicked while holding the ledger must not hide later assertions.
    ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn push_event(ledger: &SharedLedger, event: String) {
    lock(ledger).events.push(event);
}

// ============================================================================
// Mock Buffer
// ============================================================================

pub struct MockBuffer {
    pub label: String,
    data: Mutex<Vec<u8>>,
}

impl MockBuffer {
    pub fn new(size: u64, label: String) -> Self {
        Self { label, data: Mutex::new(vec![0; size as usize]) }
    }

    /// Copy of the buffer contents
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl Buffer for MockBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut contents = self.data.lock().map_err(|_| Error::BackendError("buffer lock poisoned".to_string()))?;
        let end = offset as usize + data.len();
        if end > contents.len() {
            engine_bail!(
                "umbra::mock",
                "Buffer '{}' overflow: writing {} bytes at {} into {} bytes",
                self.label, data.len(), offset, contents.len()
            );
        }
        contents[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.data.lock().map(|d| d.len() as u64).unwrap_or(0)
    }
}

// ============================================================================
// Mock Texture
// ============================================================================

pub struct MockTexture {
    pub info: TextureInfo,
    ledger: Option<SharedLedger>,
}

impl MockTexture {
    /// Standalone texture not tracked by any ledger
    pub fn new(width: u32, height: u32, array_layers: u32, label: &str) -> Self {
        Self {
            info: TextureInfo {
                label: label.to_string(),
                width,
                height,
                format: TextureFormat::R8G8B8A8_UNORM,
                usage: TextureUsage::Sampled,
                array_layers,
            },
            ledger: None,
        }
    }
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        if let Some(ledger) = &self.ledger {
            let mut ledger = lock(ledger);
            ledger.textures_alive -= 1;
            ledger.events.push(format!(
                "destroy_texture {} {}x{}",
                self.info.label, self.info.width, self.info.height
            ));
        }
    }
}

// ============================================================================
// Mock Shader / Pipeline / RenderPass / RenderTarget / Framebuffer
// ============================================================================

pub struct MockShader {
    pub stage: ShaderStage,
}

impl Shader for MockShader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

pub struct MockPipeline {
    pub label: String,
    pub layouts: Vec<BindingGroupLayoutDesc>,
    pub push_constant_bytes: u32,
}

impl Pipeline for MockPipeline {
    fn label(&self) -> &str {
        &self.label
    }

    fn binding_group_layout_count(&self) -> u32 {
        self.layouts.len() as u32
    }
}

pub struct MockRenderPass {
    pub color_count: u32,
    pub has_depth: bool,
}

impl RenderPass for MockRenderPass {
    fn color_attachment_count(&self) -> u32 {
        self.color_count
    }

    fn has_depth_attachment(&self) -> bool {
        self.has_depth
    }
}

pub struct MockRenderTarget {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub layer: u32,
}

impl RenderTarget for MockRenderTarget {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn layer(&self) -> u32 {
        self.layer
    }
}

pub struct MockFramebuffer {
    pub width: u32,
    pub height: u32,
    /// Labels of the attached targets, colors first
    pub attachments: Vec<String>,
}

impl Framebuffer for MockFramebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

// ============================================================================
// Mock BindingGroup
// ============================================================================

pub struct MockBindingGroup {
    pub set_index: u32,
    /// One description per bound resource, refreshed by updates
    pub bound: Mutex<Vec<String>>,
    ledger: SharedLedger,
}

impl MockBindingGroup {
    pub fn bound(&self) -> Vec<String> {
        self.bound.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

impl BindingGroup for MockBindingGroup {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

impl Drop for MockBindingGroup {
    fn drop(&mut self) {
        lock(&self.ledger).binding_groups_alive -= 1;
    }
}

/// Bare binding group for tests that never hand it back to a device
pub struct MockBindingGroupHandle(pub u32);

impl BindingGroup for MockBindingGroupHandle {
    fn set_index(&self) -> u32 {
        self.0
    }
}

fn describe_resource(resource: &BindingResource<'_>) -> String {
    match resource {
        BindingResource::UniformBuffer(buffer) => format!("ubo {}", buffer.size()),
        BindingResource::SampledTexture(texture, sampler) => {
            let info = texture.info();
            format!("{} {}x{} {:?}", info.label, info.width, info.height, sampler)
        }
        BindingResource::StorageBuffer(buffer) => format!("ssbo {}", buffer.size()),
    }
}

fn check_resources(
    layout: &BindingGroupLayoutDesc,
    resources: &[BindingResource<'_>],
) -> Result<()> {
    if layout.entries.len() != resources.len() {
        return Err(Error::InvalidResource(format!(
            "Layout declares {} bindings, got {} resources",
            layout.entries.len(),
            resources.len()
        )));
    }
    for (entry, resource) in layout.entries.iter().zip(resources) {
        if entry.binding_type != resource.binding_type() {
            return Err(Error::InvalidResource(format!(
                "Binding {} expects {:?}, got {:?}",
                entry.binding,
                entry.binding_type,
                resource.binding_type()
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Mock sync
// ============================================================================

pub struct MockFence {
    pub id: u32,
    signaled: AtomicBool,
    ledger: SharedLedger,
}

impl MockFence {
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }
}

impl Fence for MockFence {
    fn wait(&self, timeout: Duration) -> Result<()> {
        let mut ledger = lock(&self.ledger);
        if ledger.fail_next_fence_wait || !self.is_signaled() {
            ledger.fail_next_fence_wait = false;
            drop(ledger);
            return Err(engine_fatal!(
                "umbra::mock",
                "Fence {} wait timed out after {:?}",
                self.id, timeout
            ));
        }
        ledger.fence_waits += 1;
        ledger.events.push(format!("fence_wait {}", self.id));
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.signaled.store(false, Ordering::Release);
        push_event(&self.ledger, format!("fence_reset {}", self.id));
        Ok(())
    }
}

pub struct MockSemaphore {
    pub id: u32,
}

impl Semaphore for MockSemaphore {}

// ============================================================================
// Mock CommandList
// ============================================================================

pub struct MockCommandList {
    pub commands: Vec<String>,
    is_recording: bool,
    in_render_pass: bool,
    ledger: Option<SharedLedger>,
}

impl MockCommandList {
    /// Standalone command list not tracked by any ledger
    pub fn new() -> Self {
        Self { commands: Vec::new(), is_recording: false, in_render_pass: false, ledger: None }
    }

    fn require_recording(&self) -> Result<()> {
        if !self.is_recording {
            engine_bail!("umbra::mock", "Command list not recording");
        }
        Ok(())
    }

    fn require_render_pass(&self) -> Result<()> {
        self.require_recording()?;
        if !self.in_render_pass {
            engine_bail!("umbra::mock", "Not inside a render pass");
        }
        Ok(())
    }
}

impl Default for MockCommandList {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            engine_bail!("umbra::mock", "Command list already recording");
        }
        self.commands.clear();
        self.is_recording = true;
        self.commands.push("begin".to_string());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.require_recording()?;
        if self.in_render_pass {
            engine_bail!("umbra::mock", "Render pass still open at end()");
        }
        self.is_recording = false;
        self.commands.push("end".to_string());
        if let Some(ledger) = &self.ledger {
            lock(ledger).recorded.push(self.commands.clone());
        }
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        _render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        _clear_values: &[ClearValue],
    ) -> Result<()> {
        self.require_recording()?;
        if self.in_render_pass {
            engine_bail!("umbra::mock", "Render pass already open");
        }
        self.in_render_pass = true;
        self.commands.push(format!("begin_render_pass {}x{}", framebuffer.width(), framebuffer.height()));
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.require_render_pass()?;
        self.in_render_pass = false;
        self.commands.push("end_render_pass".to_string());
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.require_recording()?;
        self.commands.push(format!("set_viewport {}x{}", viewport.width, viewport.height));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.require_recording()?;
        self.commands.push(format!("set_scissor {}x{}", scissor.width, scissor.height));
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.require_recording()?;
        self.commands.push(format!("bind_pipeline {}", pipeline.label()));
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        _binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()> {
        self.require_recording()?;
        self.commands.push(format!("bind_binding_group set={}", set_index));
        Ok(())
    }

    fn push_constants(&mut self, _stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()> {
        self.require_recording()?;
        self.commands.push(format!("push_constants {}+{}", offset, data.len()));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, _buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.require_recording()?;
        self.commands.push(format!("bind_vertex_buffer {}", offset));
        Ok(())
    }

    fn bind_index_buffer(&mut self, _buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.require_recording()?;
        self.commands.push(format!("bind_index_buffer {} {:?}", offset, index_type));
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, _first_vertex: u32) -> Result<()> {
        self.require_render_pass()?;
        self.commands.push(format!("draw {}", vertex_count));
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32, _vertex_offset: i32) -> Result<()> {
        self.require_render_pass()?;
        self.commands.push(format!("draw_indexed {}", index_count));
        Ok(())
    }

    fn pipeline_barrier(&mut self, barriers: &[ImageBarrier<'_>]) -> Result<()> {
        self.require_recording()?;
        if self.in_render_pass {
            engine_bail!("umbra::mock", "Barrier recorded inside a render pass");
        }
        for barrier in barriers {
            let info = barrier.texture.info();
            self.commands.push(format!(
                "barrier {} {:?}->{:?} {}x{} layers={}+{}",
                info.label,
                barrier.old_layout,
                barrier.new_layout,
                info.width,
                info.height,
                barrier.base_layer,
                barrier.layer_count
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

pub struct MockSwapchain {
    images: Vec<MockTexture>,
    next_image: u32,
    ledger: SharedLedger,
}

impl MockSwapchain {
    pub const IMAGE_COUNT: usize = 3;

    pub fn new(width: u32, height: u32, ledger: SharedLedger) -> Self {
        Self { images: Self::make_images(width, height), next_image: 0, ledger }
    }

    fn make_images(width: u32, height: u32) -> Vec<MockTexture> {
        (0..Self::IMAGE_COUNT)
            .map(|i| MockTexture::new(width, height, 1, &format!("swapchain[{}]", i)))
            .collect()
    }
}

impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self, _signal: &dyn Semaphore, _timeout: Duration) -> Result<AcquireOutcome> {
        let scripted = lock(&self.ledger).acquire_script.pop_front();
        let outcome = match scripted {
            Some(AcquireOutcome::OutOfDate) => AcquireOutcome::OutOfDate,
            Some(AcquireOutcome::Acquired { suboptimal, .. }) => {
                AcquireOutcome::Acquired { image_index: self.next_image, suboptimal }
            }
            None => AcquireOutcome::Acquired { image_index: self.next_image, suboptimal: false },
        };
        match outcome {
            AcquireOutcome::Acquired { image_index, suboptimal } => {
                self.next_image = (self.next_image + 1) % Self::IMAGE_COUNT as u32;
                push_event(&self.ledger, format!("acquire {} suboptimal={}", image_index, suboptimal));
            }
            AcquireOutcome::OutOfDate => push_event(&self.ledger, "acquire out_of_date".to_string()),
        }
        Ok(outcome)
    }

    fn record_present_blit(
        &self,
        command_list: &mut dyn CommandList,
        source: &dyn Texture,
        image_index: u32,
    ) -> Result<()> {
        let image = self.images.get(image_index as usize).ok_or_else(|| {
            Error::InvalidResource(format!("Swapchain image {} out of range", image_index))
        })?;
        command_list.pipeline_barrier(&[ImageBarrier::whole(image, ImageLayout::Undefined, ImageLayout::TransferDst)])?;
        let src = source.info();
        push_event(
            &self.ledger,
            format!(
                "present_blit {} {}x{} -> {}x{}",
                src.label, src.width, src.height, image.info.width, image.info.height
            ),
        );
        command_list.pipeline_barrier(&[ImageBarrier::whole(image, ImageLayout::TransferDst, ImageLayout::PresentSrc)])
    }

    fn present(&mut self, image_index: u32, _wait: &dyn Semaphore) -> Result<PresentOutcome> {
        let mut ledger = lock(&self.ledger);
        if std::mem::take(&mut ledger.fail_next_present) {
            ledger.events.push(format!("present_failed {}", image_index));
            return Err(Error::BackendError("VK_ERROR_OUT_OF_HOST_MEMORY".to_string()));
        }
        ledger.events.push(format!("present {}", image_index));
        Ok(ledger.present_script.pop_front().unwrap_or(PresentOutcome::Optimal))
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        push_event(&self.ledger, format!("recreate_swapchain {}x{}", width, height));
        self.images = Self::make_images(width, height);
        self.next_image = 0;
        Ok(())
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn width(&self) -> u32 {
        self.images.first().map(|i| i.info.width).unwrap_or(0)
    }

    fn height(&self) -> u32 {
        self.images.first().map(|i| i.info.height).unwrap_or(0)
    }

    fn format(&self) -> TextureFormat {
        TextureFormat::B8G8R8A8_SRGB
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

pub struct MockGraphicsDevice {
    ledger: SharedLedger,
    next_id: AtomicU32,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self { ledger: Arc::new(Mutex::new(MockLedger::default())), next_id: AtomicU32::new(0) }
    }

    /// Shared ledger, usable after the device has been moved into an `Arc`
    pub fn ledger(&self) -> SharedLedger {
        Arc::clone(&self.ledger)
    }

    /// Create a swapchain reporting into the same ledger
    pub fn create_swapchain(&self, width: u32, height: u32) -> MockSwapchain {
        MockSwapchain::new(width, height, self.ledger())
    }

    fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        if desc.width == 0 || desc.height == 0 || desc.array_layers == 0 {
            return Err(Error::InvalidResource(format!(
                "Texture '{}' has zero extent {}x{}x{}",
                desc.label, desc.width, desc.height, desc.array_layers
            )));
        }
        let info = TextureInfo::from(&desc);
        {
            let mut ledger = lock(&self.ledger);
            ledger.textures_created += 1;
            ledger.textures_alive += 1;
            ledger.events.push(format!("create_texture {} {}x{}", info.label, info.width, info.height));
        }
        Ok(Arc::new(MockTexture { info, ledger: Some(self.ledger()) }))
    }

    fn create_render_target_view(&self, texture: &dyn Texture, layer: u32) -> Result<Arc<dyn RenderTarget>> {
        let info = texture.info();
        if layer >= info.array_layers {
            return Err(Error::InvalidResource(format!(
                "Layer {} out of range for '{}' ({} layers)",
                layer, info.label, info.array_layers
            )));
        }
        Ok(Arc::new(MockRenderTarget {
            label: info.label.clone(),
            width: info.width,
            height: info.height,
            format: info.format,
            layer,
        }))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        Ok(Arc::new(MockRenderPass {
            color_count: desc.color_attachments.len() as u32,
            has_depth: desc.depth_attachment.is_some(),
        }))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc<'_>) -> Result<Arc<dyn Framebuffer>> {
        if desc.render_pass.color_attachment_count() as usize != desc.color_attachments.len()
            || desc.render_pass.has_depth_attachment() != desc.depth_attachment.is_some()
        {
            return Err(Error::InvalidResource("Framebuffer attachments do not match render pass".to_string()));
        }
        let attachments = desc
            .color_attachments
            .iter()
            .chain(desc.depth_attachment.iter())
            .map(|target| {
                if target.width() != desc.width || target.height() != desc.height {
                    return Err(Error::InvalidResource(format!(
                        "Attachment {}x{} does not match framebuffer {}x{}",
                        target.width(), target.height(), desc.width, desc.height
                    )));
                }
                Ok(format!("{}x{}#{}", target.width(), target.height(), target.layer()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Arc::new(MockFramebuffer { width: desc.width, height: desc.height, attachments }))
    }

    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        push_event(&self.ledger, format!("create_buffer {} {}", desc.label, desc.size));
        Ok(Arc::new(MockBuffer::new(desc.size, desc.label)))
    }

    fn create_shader(&self, desc: ShaderDesc<'_>) -> Result<Arc<dyn Shader>> {
        Ok(Arc::new(MockShader { stage: desc.stage }))
    }

    fn create_pipeline(&self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        if !desc.color_formats.is_empty() && desc.fragment_shader.is_none() {
            return Err(Error::InvalidResource(format!(
                "Pipeline '{}' writes color but has no fragment shader",
                desc.label
            )));
        }
        push_event(&self.ledger, format!("create_pipeline {}", desc.label));
        let push_constant_bytes = desc
            .push_constant_ranges
            .iter()
            .map(|r| r.offset + r.size)
            .max()
            .unwrap_or(0);
        Ok(Arc::new(MockPipeline {
            label: desc.label,
            layouts: desc.binding_group_layouts,
            push_constant_bytes,
        }))
    }

    fn create_binding_group(
        &self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: &[BindingResource<'_>],
    ) -> Result<Arc<dyn BindingGroup>> {
        // SAFETY: every pipeline handed to the mock device was created by it.
        let mock_pipeline = unsafe { &*(pipeline.as_ref() as *const dyn Pipeline as *const MockPipeline) };
        let layout = mock_pipeline.layouts.get(set_index as usize).ok_or_else(|| {
            Error::InvalidResource(format!(
                "Pipeline '{}' has no binding group layout at set {}",
                mock_pipeline.label, set_index
            ))
        })?;
        check_resources(layout, resources)?;

        let mut ledger = lock(&self.ledger);
        if ledger.binding_groups_alive >= MOCK_POOL_CAPACITY {
            return Err(Error::OutOfMemory);
        }
        ledger.binding_groups_alive += 1;
        ledger.events.push(format!("create_binding_group {} set={}", mock_pipeline.label, set_index));
        drop(ledger);

        Ok(Arc::new(MockBindingGroup {
            set_index,
            bound: Mutex::new(resources.iter().map(describe_resource).collect()),
            ledger: self.ledger(),
        }))
    }

    fn update_binding_group(
        &self,
        binding_group: &Arc<dyn BindingGroup>,
        resources: &[BindingResource<'_>],
    ) -> Result<()> {
        // SAFETY: every binding group handed to the mock device was created by it.
        let group = unsafe { &*(binding_group.as_ref() as *const dyn BindingGroup as *const MockBindingGroup) };
        let mut bound = group.bound.lock().map_err(|_| Error::BackendError("binding group lock poisoned".to_string()))?;
        if bound.len() != resources.len() {
            return Err(Error::InvalidResource(format!(
                "Update binds {} resources into a group of {}",
                resources.len(),
                bound.len()
            )));
        }
        *bound = resources.iter().map(describe_resource).collect();
        let mut ledger = lock(&self.ledger);
        ledger.binding_group_updates += 1;
        ledger.events.push(format!("update_binding_group set={}", group.set_index));
        Ok(())
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList {
            commands: Vec::new(),
            is_recording: false,
            in_render_pass: false,
            ledger: Some(self.ledger()),
        }))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn Fence>> {
        Ok(Box::new(MockFence {
            id: self.next_id(),
            signaled: AtomicBool::new(signaled),
            ledger: self.ledger(),
        }))
    }

    fn create_semaphore(&self) -> Result<Box<dyn Semaphore>> {
        Ok(Box::new(MockSemaphore { id: self.next_id() }))
    }

    fn submit(&self, submission: &Submission<'_>) -> Result<()> {
        let mut ledger = lock(&self.ledger);
        if std::mem::take(&mut ledger.fail_next_submit) {
            ledger.events.push("submit_failed".to_string());
            return Err(Error::BackendError("VK_ERROR_OUT_OF_DEVICE_MEMORY".to_string()));
        }
        ledger.submissions += 1;
        ledger.events.push("submit".to_string());
        drop(ledger);

        if let Some(fence) = submission.fence {
            // SAFETY: every fence handed to the mock device was created by it.
            let fence = unsafe { &*(fence as *const dyn Fence as *const MockFence) };
            fence.signaled.store(true, Ordering::Release);
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        let mut ledger = lock(&self.ledger);
        ledger.wait_idle_calls += 1;
        ledger.events.push("wait_idle".to_string());
        Ok(())
    }

    fn stats(&self) -> DeviceStats {
        let ledger = lock(&self.ledger);
        DeviceStats {
            binding_groups_allocated: ledger.binding_groups_alive,
            binding_group_capacity: MOCK_POOL_CAPACITY,
            submissions: ledger.submissions,
        }
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
