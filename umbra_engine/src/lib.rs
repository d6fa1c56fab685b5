/*!
# Umbra Engine

Backend-agnostic frame-rendering core of the Umbra 3D renderer.

The crate turns camera and light state into ordered GPU work over a fixed
G-buffer graph, paced by two frames in flight, and survives live changes of
the draw extent and of the shadow-map resolution.

## Architecture

- **GraphicsDevice**: Factory trait for GPU resources and queue submission
- **Swapchain**: Presentation surface trait
- **GBufferGraph**: Shadow, Main, SSAO and Light passes with explicit image transitions
- **GBufferTargets**: Generational arena of the images the passes render into
- **CascadeProjector**: Per-frame light-space matrices for cascaded shadows
- **FrameOrchestrator**: Frame slots, resize protocol, acquire / submit / present

Backend implementations (Vulkan) provide concrete types for the
`GraphicsDevice` trait family.
*/

// Internal modules
mod config;
mod error;
mod frame;
mod graph;
mod graphics_device;
pub mod log;
mod shadow;
mod ssao;

// Main umbra namespace module
pub mod umbra {
    // Error types
    pub use crate::error::{terminate, Error, FatalError, Result};

    // Configuration
    pub use crate::config::{
        validate_shadow_resolution, CascadeConfig, RendererConfig, SsaoConfig, MAX_SHADOW_RESOLUTION,
    };

    // Frame orchestration
    pub use crate::frame::{
        CameraState, FrameOrchestrator, FrameSlot, FrameStats, LightParams, PointLight, SlotState,
        FRAMES_IN_FLIGHT, MAX_POINT_LIGHTS,
    };

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{reset_logger, set_logger, DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Render sub-module with all backend-facing types
    pub mod render {
        pub use crate::graphics_device::*;
    }

    // G-buffer graph sub-module
    pub mod graph {
        pub use crate::frame::{DefaultResources, GlobalUniform, PointLightData, RenderContext};
        pub use crate::graph::*;
    }

    // Shadow sub-module
    pub mod shadow {
        pub use crate::shadow::*;
    }

    // SSAO sub-module
    pub mod ssao {
        pub use crate::ssao::*;
    }
}

/// Test doubles for driving the renderer without a GPU
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    pub use crate::graphics_device::mock_graphics_device::*;
}

// Re-export math library at crate root
pub use glam;
