//! Engine data structures: meshes, materials, textures and instances.
//!
//! - `model` contains the vertex layout, procedural meshes and materials
//! - `texture` contains the GPU texture wrapper, shadow map and cubemap creation
//! - `instance` holds per-draw transformation and tint data

pub mod instance;
pub mod model;
pub mod texture;
