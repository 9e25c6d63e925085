//! Renderer error taxonomy.
//!
//! Errors fall into three classes:
//!
//! - configuration errors (shader compile/link failures, unresolvable uniforms,
//!   incomplete shadow targets) abort the setup step that produced them and are
//!   never retried,
//! - logic errors (stale or misused uniform handles) point at a bug in the
//!   command recording and should never reach a user,
//! - surface errors are forwarded from wgpu and handled by the frame loop.
//!
//! Render kinds without a mesh/material binding are not errors at all: they are
//! skipped while recording.

use std::path::PathBuf;

use crate::pipelines::PipelineKind;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{kind:?} shader failed to compile:\n{diagnostics}")]
    ShaderCompile {
        kind: PipelineKind,
        diagnostics: String,
    },
    #[error("{kind:?} shader failed to link: {reason}")]
    ShaderLink { kind: PipelineKind, reason: String },
    #[error("{kind:?} pipeline has no uniform `{name}`")]
    MissingUniform { kind: PipelineKind, name: String },
    #[error("shadow target {width}x{height} is incomplete: {reason}")]
    IncompleteTarget {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("could not read shader source {path:?}")]
    ShaderSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("pipelines have not been built")]
    PipelinesMissing,
    #[error("{kind:?} uniform handle is from generation {handle}, registry is at {current}")]
    StaleUniform {
        kind: PipelineKind,
        handle: u32,
        current: u32,
    },
    #[error("{kind:?} uniform written while {active:?} is the active pipeline")]
    UniformOutsidePipeline {
        kind: PipelineKind,
        active: Option<PipelineKind>,
    },
    #[error("{kind:?} uniform at offset {offset} holds {expected} bytes, got {actual}")]
    UniformSize {
        kind: PipelineKind,
        offset: u32,
        expected: u32,
        actual: u32,
    },
    #[error(transparent)]
    Surface(#[from] wgpu::SurfaceError),
}

impl RenderError {
    /// Configuration errors abort setup and are reported, not retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RenderError::ShaderCompile { .. }
                | RenderError::ShaderLink { .. }
                | RenderError::MissingUniform { .. }
                | RenderError::IncompleteTarget { .. }
                | RenderError::ShaderSource { .. }
                | RenderError::PipelinesMissing
        )
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
