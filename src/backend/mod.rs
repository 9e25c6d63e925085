//! Execution of recorded frames.
//!
//! A [`RenderBackend`] owns the GPU side of the renderer: the output
//! surface, the compiled pipelines, uploaded meshes/materials and shadow
//! targets. The renderer core only records [`CommandList`]s and hands them
//! over, so the whole pass logic can run against a recording backend in tests.

use crate::{commands::CommandList, error::Result, pipelines::registry::PipelineRegistry};

pub mod gpu;
pub mod upload;

pub use gpu::GpuBackend;

pub trait RenderBackend {
    /// Depth target written by the shadow pass and sampled by the standard pipeline.
    type ShadowTarget;

    /// Size of the output surface in pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Allocate a complete shadow target, or report why it cannot be.
    fn create_shadow_target(&mut self, width: u32, height: u32) -> Result<Self::ShadowTarget>;

    /// Resize the output surface and anything sized with it.
    fn configure_surface(&mut self, width: u32, height: u32);

    /// Create GPU pipelines for every program in `registry`.
    ///
    /// On error the previously built pipelines must stay usable.
    fn rebuild_pipelines(&mut self, registry: &PipelineRegistry) -> Result<()>;

    /// Run one frame. `shadow` is the target the shadow pass renders into and
    /// the standard pipeline samples.
    fn execute(
        &mut self,
        commands: &CommandList,
        registry: &PipelineRegistry,
        shadow: Option<&Self::ShadowTarget>,
    ) -> Result<()>;

    /// Drop pipelines and per-frame buffers. Safe to call repeatedly.
    fn release(&mut self);
}
