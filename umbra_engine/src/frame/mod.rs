/// Frame module - in-flight slots, per-frame uniforms and the orchestrator

pub mod frame_slot;
pub mod global_uniform;
pub mod orchestrator;
pub mod render_context;

pub use frame_slot::{FrameSlot, SlotState, FRAMES_IN_FLIGHT};
pub use global_uniform::{CameraState, GlobalUniform, LightParams, PointLight, PointLightData, MAX_POINT_LIGHTS};
pub use orchestrator::{FrameOrchestrator, FrameStats};
pub use render_context::{DefaultResources, RenderContext};
