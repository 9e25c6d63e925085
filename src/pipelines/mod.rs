//! Shader programs and wgpu pipeline construction.
//!
//! Each [`PipelineKind`] is one WGSL module. The [`registry`] compiles them
//! with naga and resolves their uniforms; [`mk_render_pipeline`] turns a
//! compiled module into a wgpu pipeline for one depth state.

use crate::{commands::DepthState, data_structures::texture::Texture};

pub mod registry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Lit, shadowed geometry.
    Standard,
    /// Unlit geometry with a flat tint: light markers and the UI overlay.
    Emissive,
    /// Depth only, rendered from the dominant light.
    Shadow,
    Skybox,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 4] = [
        PipelineKind::Standard,
        PipelineKind::Emissive,
        PipelineKind::Shadow,
        PipelineKind::Skybox,
    ];

    pub fn index(self) -> usize {
        match self {
            PipelineKind::Standard => 0,
            PipelineKind::Emissive => 1,
            PipelineKind::Shadow => 2,
            PipelineKind::Skybox => 3,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            PipelineKind::Standard => "standard.wgsl",
            PipelineKind::Emissive => "emissive.wgsl",
            PipelineKind::Shadow => "shadow.wgsl",
            PipelineKind::Skybox => "skybox.wgsl",
        }
    }

    pub fn embedded_source(self) -> &'static str {
        match self {
            PipelineKind::Standard => include_str!("standard.wgsl"),
            PipelineKind::Emissive => include_str!("emissive.wgsl"),
            PipelineKind::Shadow => include_str!("shadow.wgsl"),
            PipelineKind::Skybox => include_str!("skybox.wgsl"),
        }
    }

    /// The shadow program only writes depth and has no fragment stage.
    pub fn has_fragment(self) -> bool {
        !matches!(self, PipelineKind::Shadow)
    }

    /// Depth states a pass may select while this pipeline is active.
    pub fn depth_states(self) -> &'static [DepthState] {
        match self {
            PipelineKind::Shadow => &[DepthState::Less],
            _ => &DepthState::ALL,
        }
    }

    /// Markers and prompts are cut out of textures with an alpha channel.
    pub fn blend(self) -> wgpu::BlendState {
        match self {
            PipelineKind::Emissive => wgpu::BlendState::ALPHA_BLENDING,
            _ => wgpu::BlendState::REPLACE,
        }
    }

    pub fn cull_mode(self) -> Option<wgpu::Face> {
        match self {
            PipelineKind::Standard => Some(wgpu::Face::Back),
            // Billboards, hinged panels and the inside of the sky cube
            _ => None,
        }
    }
}

pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    kind: PipelineKind,
    color_format: Option<wgpu::TextureFormat>,
    depth: DepthState,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    let targets = [color_format.map(|format| wgpu::ColorTargetState {
        format,
        blend: Some(kind.blend()),
        write_mask: wgpu::ColorWrites::ALL,
    })];
    let bias = if kind == PipelineKind::Shadow {
        wgpu::DepthBiasState {
            constant: 2,
            slope_scale: 2.0,
            clamp: 0.0,
        }
    } else {
        wgpu::DepthBiasState::default()
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(&format!("{kind:?} {depth:?} Pipeline")),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: if kind.has_fragment() {
            Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &targets,
                compilation_options: Default::default(),
            })
        } else {
            None
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: kind.cull_mode(),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: depth.writes(),
            depth_compare: depth.compare(),
            stencil: wgpu::StencilState::default(),
            bias,
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_emissive_geometry_blends_with_what_is_behind_it() {
        assert_eq!(PipelineKind::Emissive.blend(), wgpu::BlendState::ALPHA_BLENDING);
        for kind in [PipelineKind::Standard, PipelineKind::Shadow, PipelineKind::Skybox] {
            assert_eq!(kind.blend(), wgpu::BlendState::REPLACE);
        }
    }

    #[test]
    fn shadow_has_no_fragment_stage_and_a_single_depth_state() {
        assert!(!PipelineKind::Shadow.has_fragment());
        assert_eq!(PipelineKind::Shadow.depth_states(), &[DepthState::Less]);
        assert_eq!(PipelineKind::Skybox.depth_states().len(), 3);
    }
}
