/// G-buffer graph module - targets, passes and their ordering

pub mod draw;
pub mod graph;
pub mod light_pass;
pub mod main_pass;
pub mod pass;
pub mod shadow_pass;
pub mod ssao_pass;
pub mod targets;

pub use draw::{material_order, DrawItem, StandardVertex};
pub use graph::{validate_pass_order, GBufferGraph};
pub use light_pass::LightPass;
pub use main_pass::{MainPass, MaterialBindings, MaterialFactors, MaterialLayout, MAIN_COLOR_TARGETS};
pub use pass::{global_layout, GraphPass, PassContract, PassKind, PassShaders, TargetWrite, GLOBAL_SET, PASS_SET};
pub use shadow_pass::{ShadowPass, ShadowPushConstants};
pub use ssao_pass::{SsaoPass, SsaoPushConstants, SsaoResources};
pub use targets::{GBufferTargets, GpuTarget, RenderPassSet, TargetGroup, TargetKey, TargetRole};
