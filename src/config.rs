//! Renderer configuration.
//!
//! Everything here is plain data with sensible defaults for a bounded indoor
//! level. The renderer copies the config at construction; use
//! [`crate::renderer::Renderer::configure`] to change it at runtime.

use std::path::PathBuf;

use cgmath::{Deg, Vector3, Zero};

use crate::{error::RenderError, pipelines::PipelineKind};

/// World-space box covered by the shadow-casting light's orthographic projection.
///
/// This is a single static box, not fitted to the scene. Levels larger than the
/// box receive no shadows outside of it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrthoBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for OrthoBounds {
    fn default() -> Self {
        Self {
            left: -30.0,
            right: 30.0,
            bottom: -30.0,
            top: 30.0,
            near: -30.0,
            far: 50.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowConfig {
    pub bounds: OrthoBounds,
    /// Point the dominant light looks at.
    pub center: Vector3<f32>,
    pub up: Vector3<f32>,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            bounds: OrthoBounds::default(),
            center: Vector3::zero(),
            up: Vector3::unit_y(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub fov_y: Deg<f32>,
    pub near: f32,
    pub far: f32,
    /// Number of light slots uploaded to the standard pipeline. Must not exceed
    /// the light array declared in `standard.wgsl`.
    pub max_lights: usize,
    pub clear_colour: wgpu::Color,
    pub shadows_enabled: bool,
    pub shadow: ShadowConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            fov_y: Deg(45.0),
            near: 0.1,
            far: 1000.0,
            max_lights: 8,
            // #028058
            clear_colour: wgpu::Color {
                r: 2.0 / 255.0,
                g: 128.0 / 255.0,
                b: 88.0 / 255.0,
                a: 1.0,
            },
            shadows_enabled: true,
            shadow: ShadowConfig::default(),
        }
    }
}

/// Where the WGSL for each pipeline comes from.
///
/// `Directory` is read again on every reload, which allows editing shaders
/// while the walkthrough is running.
#[derive(Clone, Debug, Default)]
pub enum ShaderSources {
    #[default]
    Embedded,
    Directory(PathBuf),
}

impl ShaderSources {
    pub fn load(&self, kind: PipelineKind) -> Result<String, RenderError> {
        match self {
            ShaderSources::Embedded => Ok(kind.embedded_source().to_string()),
            ShaderSources::Directory(dir) => {
                let path = dir.join(kind.file_name());
                std::fs::read_to_string(&path)
                    .map_err(|source| RenderError::ShaderSource { path, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_shader_directory_is_reported_with_its_path() {
        let sources = ShaderSources::Directory(PathBuf::from("/definitely/not/here"));
        match sources.load(PipelineKind::Shadow) {
            Err(RenderError::ShaderSource { path, .. }) => {
                assert!(path.ends_with("shadow.wgsl"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn shadow_box_defaults_match_the_level_extent() {
        let bounds = OrthoBounds::default();
        assert_eq!((bounds.left, bounds.right), (-30.0, 30.0));
        assert_eq!((bounds.near, bounds.far), (-30.0, 50.0));
    }
}
