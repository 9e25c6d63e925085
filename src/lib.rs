//! walkthrough-ngin
//!
//! A small wgpu renderer for first-person walkthroughs of a bounded level:
//! shadow-mapped point lighting from the closest lights, camera facing light
//! markers, a skybox and camera attached interaction prompts, plus the scene
//! layer (camera, hinged doors, UI state) to drive it.
//!
//! High-level modules
//! - `renderer`: the facade (`render`, `resize`, `toggle_shadows`, `reload_shaders`, `destroy`)
//! - `passes`: shadow and main pass recording
//! - `commands`: the recorded command vocabulary handed to a backend
//! - `backend`: command execution, `GpuBackend` on top of wgpu
//! - `pipelines`: pipeline kinds, WGSL programs and the uniform registry
//! - `targets`: shadow target lifecycle
//! - `lights`: point lights and closest-light selection
//! - `transform`: projection, view and pivoted model matrices
//! - `scene`: camera, doors and UI state
//! - `app`: window and event loop
//!

pub mod app;
pub mod backend;
pub mod commands;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod lights;
pub mod passes;
pub mod pipelines;
pub mod render;
pub mod renderer;
pub mod scene;
pub mod targets;
pub mod transform;

// Re-exports commonly used types for convenience in downstream code.
pub use backend::{GpuBackend, RenderBackend};
pub use config::{RendererConfig, ShaderSources};
pub use error::{RenderError, Result};
pub use lights::Light;
pub use render::{Binding, BindingTable, CameraView, RenderKind, Renderables};
pub use renderer::Renderer;
