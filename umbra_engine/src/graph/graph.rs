/// G-buffer graph: the fixed pass sequence Shadow -> Main -> SSAO -> Light.
///
/// The graph owns the passes and records them in order. Around each pass it
/// records the barriers its contract implies, starting from the tracked
/// layout of every target so a barrier always names the real previous layout.

use std::sync::Arc;
use crate::config::RendererConfig;
use crate::error::{Error, Result};
use crate::frame::RenderContext;
use crate::graph::light_pass::LightPass;
use crate::graph::main_pass::{MainPass, MaterialLayout};
use crate::graph::pass::{GraphPass, PassShaders};
use crate::graph::shadow_pass::ShadowPass;
use crate::graph::ssao_pass::SsaoPass;
use crate::graph::targets::{GBufferTargets, RenderPassSet, TargetRole};
use crate::graphics_device::{CommandList, GraphicsDevice, ImageLayout, Pipeline};
use crate::engine_info;

pub struct GBufferGraph {
    shadow: ShadowPass,
    main: MainPass,
    ssao: SsaoPass,
    light: LightPass,
}

impl GBufferGraph {
    /// Create every pass with its render pass and pipeline.
    ///
    /// Per-pass binding groups are created by the first [`bind_targets`](Self::bind_targets).
    pub fn new(device: &dyn GraphicsDevice, shaders: &PassShaders, config: &RendererConfig) -> Result<Self> {
        let graph = Self {
            shadow: ShadowPass::new(device, shaders)?,
            main: MainPass::new(device, shaders)?,
            ssao: SsaoPass::new(device, shaders, &config.ssao)?,
            light: LightPass::new(device, shaders)?,
        };
        validate_pass_order(&graph.passes())?;
        engine_info!("umbra::GBufferGraph", "G-buffer graph created ({} passes)", graph.passes().len());
        Ok(graph)
    }

    /// Passes in execution order
    pub fn passes(&self) -> [&dyn GraphPass; 4] {
        [&self.shadow, &self.main, &self.ssao, &self.light]
    }

    pub fn render_passes(&self) -> RenderPassSet {
        RenderPassSet {
            shadow: Arc::clone(self.shadow.render_pass()),
            main: Arc::clone(self.main.render_pass()),
            ssao: Arc::clone(self.ssao.render_pass()),
            light: Arc::clone(self.light.render_pass()),
        }
    }

    /// Pipeline whose set 0 layout the global groups are allocated against
    pub fn main_pipeline(&self) -> &Arc<dyn Pipeline> {
        self.main.pipeline()
    }

    pub fn material_layout(&self) -> MaterialLayout {
        self.main.material_layout()
    }

    pub fn ssao(&self) -> &SsaoPass {
        &self.ssao
    }

    pub fn light(&self) -> &LightPass {
        &self.light
    }

    /// Point every pass's binding groups at the current targets
    pub fn bind_targets(&mut self, device: &dyn GraphicsDevice, targets: &GBufferTargets) -> Result<()> {
        let passes: [&mut dyn GraphPass; 4] = [&mut self.shadow, &mut self.main, &mut self.ssao, &mut self.light];
        for pass in passes {
            pass.bind_targets(device, targets)?;
        }
        Ok(())
    }

    /// Record every pass with its boundary transitions
    pub fn record(&self, cmd: &mut dyn CommandList, ctx: &mut RenderContext<'_>) -> Result<()> {
        for pass in self.passes() {
            let contract = pass.contract();

            let mut entry: Vec<(TargetRole, ImageLayout)> =
                contract.inputs.iter().map(|&role| (role, ImageLayout::ShaderReadOnly)).collect();
            entry.extend(contract.outputs.iter().map(|write| (write.role, write.attachment_layout)));
            ctx.transition(cmd, &entry)?;

            pass.record(cmd, ctx)?;

            let exit: Vec<(TargetRole, ImageLayout)> =
                contract.outputs.iter().map(|write| (write.role, write.final_layout)).collect();
            ctx.transition(cmd, &exit)?;
        }
        Ok(())
    }
}

/// Check that passes run in kind order and that every target a pass reads
/// was written by an earlier pass
pub fn validate_pass_order(passes: &[&dyn GraphPass]) -> Result<()> {
    let mut written: Vec<TargetRole> = Vec::new();
    for (i, pass) in passes.iter().enumerate() {
        if i > 0 && passes[i - 1].kind() >= pass.kind() {
            return Err(Error::InitializationFailed(format!(
                "Pass {:?} scheduled after {:?}",
                pass.kind(),
                passes[i - 1].kind()
            )));
        }
        if let Some(missing) = pass.contract().inputs.iter().find(|role| !written.contains(role)) {
            return Err(Error::InitializationFailed(format!(
                "Pass {:?} reads {:?} before any pass writes it",
                pass.kind(),
                missing
            )));
        }
        written.extend(pass.contract().outputs.iter().map(|write| write.role));
    }
    Ok(())
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
