//! Shader program registry.
//!
//! Every [`PipelineKind`] is compiled from WGSL with naga before wgpu ever
//! sees it, so compile and link problems surface as [`RenderError`]s with the
//! compiler's diagnostics instead of a device panic. After validation the
//! frame uniform block (`@group(0) @binding(0)`) is reflected and every uniform
//! the passes need is resolved to a [`UniformHandle`]: a byte range inside
//! that block. Indexed uniforms such as `lights[i].position` resolve one
//! handle per light slot.
//!
//! Handles carry the registry generation they were resolved in. A reload
//! builds a complete new registry with the next generation and only replaces
//! the old one once every program compiled, so a handle from before the reload
//! is detectably stale and a failed reload leaves the old programs in place.

use std::collections::HashMap;

use naga::{AddressSpace, ArraySize, Module, TypeInner};

use crate::{
    config::ShaderSources,
    error::{RenderError, Result},
    pipelines::PipelineKind,
};

/// Symbolic uniform identifiers understood by the passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Uniform {
    View,
    Projection,
    CameraPosition,
    ShadowsEnabled,
    LightSpaceMatrix,
    LightPosition(usize),
    LightColor(usize),
    LightStrength(usize),
}

impl Uniform {
    /// Field path inside the frame uniform block.
    pub fn path(&self) -> String {
        match self {
            Uniform::View => "view".into(),
            Uniform::Projection => "projection".into(),
            Uniform::CameraPosition => "camera_position".into(),
            Uniform::ShadowsEnabled => "shadows_enabled".into(),
            Uniform::LightSpaceMatrix => "light_space".into(),
            Uniform::LightPosition(i) => format!("lights[{i}].position"),
            Uniform::LightColor(i) => format!("lights[{i}].color"),
            Uniform::LightStrength(i) => format!("lights[{i}].strength"),
        }
    }

    /// Uniforms a program of `kind` must expose.
    pub fn required(kind: PipelineKind, max_lights: usize) -> Vec<Uniform> {
        match kind {
            PipelineKind::Standard => {
                let mut uniforms = vec![
                    Uniform::View,
                    Uniform::Projection,
                    Uniform::CameraPosition,
                    Uniform::ShadowsEnabled,
                    Uniform::LightSpaceMatrix,
                ];
                for i in 0..max_lights {
                    uniforms.push(Uniform::LightPosition(i));
                    uniforms.push(Uniform::LightColor(i));
                    uniforms.push(Uniform::LightStrength(i));
                }
                uniforms
            }
            PipelineKind::Emissive | PipelineKind::Skybox => {
                vec![Uniform::View, Uniform::Projection]
            }
            PipelineKind::Shadow => vec![Uniform::LightSpaceMatrix],
        }
    }
}

/// A resolved uniform: `size` bytes at `offset` in the frame block of `kind`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformHandle {
    pub kind: PipelineKind,
    pub generation: u32,
    pub offset: u32,
    pub size: u32,
}

/// A validated shader program with its reflected frame block.
#[derive(Clone, Debug)]
pub struct CompiledPipeline {
    pub kind: PipelineKind,
    /// WGSL that passed validation. This exact text is handed to wgpu.
    pub source: String,
    /// Size of the frame uniform block in bytes.
    pub block_size: u32,
    module: Module,
    generation: u32,
    handles: HashMap<Uniform, UniformHandle>,
}

impl CompiledPipeline {
    /// Compile, link and resolve the uniforms `kind` requires.
    pub fn load(
        kind: PipelineKind,
        source: &str,
        max_lights: usize,
        generation: u32,
    ) -> Result<Self> {
        let module = compile(kind, source)?;
        let block_size = link(kind, &module)?;

        let mut pipeline = Self {
            kind,
            source: source.to_string(),
            block_size,
            module,
            generation,
            handles: HashMap::new(),
        };
        for uniform in Uniform::required(kind, max_lights) {
            let handle = pipeline.resolve_uniform(&uniform.path())?;
            pipeline.handles.insert(uniform, handle);
        }
        Ok(pipeline)
    }

    /// Resolve an arbitrary field path such as `lights[2].color`.
    pub fn resolve_uniform(&self, name: &str) -> Result<UniformHandle> {
        let (offset, size) =
            reflect_field(&self.module, name).ok_or_else(|| RenderError::MissingUniform {
                kind: self.kind,
                name: name.to_string(),
            })?;
        Ok(UniformHandle {
            kind: self.kind,
            generation: self.generation,
            offset,
            size,
        })
    }

    /// One handle per slot of `array[i].field`, `i` in `0..count`.
    pub fn resolve_indexed(&self, array: &str, field: &str, count: usize) -> Result<Vec<UniformHandle>> {
        (0..count)
            .map(|i| self.resolve_uniform(&format!("{array}[{i}].{field}")))
            .collect()
    }

    pub fn handle(&self, uniform: Uniform) -> Result<UniformHandle> {
        self.handles
            .get(&uniform)
            .copied()
            .ok_or_else(|| RenderError::MissingUniform {
                kind: self.kind,
                name: uniform.path(),
            })
    }
}

#[derive(Clone, Debug)]
pub struct PipelineRegistry {
    generation: u32,
    max_lights: usize,
    sources: ShaderSources,
    pipelines: Vec<CompiledPipeline>,
}

impl PipelineRegistry {
    /// Load every pipeline kind. Fails on the first program that does not
    /// compile, link or expose its uniforms.
    pub fn load(sources: ShaderSources, max_lights: usize) -> Result<Self> {
        Self::build(sources, max_lights, 0)
    }

    fn build(sources: ShaderSources, max_lights: usize, generation: u32) -> Result<Self> {
        let pipelines = PipelineKind::ALL
            .iter()
            .map(|&kind| {
                let source = sources.load(kind)?;
                CompiledPipeline::load(kind, &source, max_lights, generation)
            })
            .collect::<Result<Vec<_>>>()?;
        log::info!(
            "compiled {} pipelines (generation {generation}, {max_lights} light slots)",
            pipelines.len()
        );
        Ok(Self {
            generation,
            max_lights,
            sources,
            pipelines,
        })
    }

    /// A fresh registry from the same sources with the next generation.
    /// `self` is untouched, whatever the outcome.
    pub fn rebuilt(&self) -> Result<Self> {
        Self::build(self.sources.clone(), self.max_lights, self.generation + 1)
    }

    /// Like [`Self::rebuilt`] with a different number of light slots.
    pub fn with_max_lights(&self, max_lights: usize) -> Result<Self> {
        Self::build(self.sources.clone(), max_lights, self.generation + 1)
    }

    /// Rebuild in place. On failure the current programs and handles stay valid.
    pub fn reload(&mut self) -> Result<()> {
        *self = self.rebuilt()?;
        Ok(())
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn max_lights(&self) -> usize {
        self.max_lights
    }

    pub fn sources(&self) -> &ShaderSources {
        &self.sources
    }

    pub fn pipeline(&self, kind: PipelineKind) -> &CompiledPipeline {
        &self.pipelines[kind.index()]
    }

    pub fn handle(&self, kind: PipelineKind, uniform: Uniform) -> Result<UniformHandle> {
        self.pipeline(kind).handle(uniform)
    }

    pub fn resolve_uniform(&self, kind: PipelineKind, name: &str) -> Result<UniformHandle> {
        self.pipeline(kind).resolve_uniform(name)
    }
}

fn compile(kind: PipelineKind, source: &str) -> Result<Module> {
    let module =
        naga::front::wgsl::parse_str(source).map_err(|err| RenderError::ShaderCompile {
            kind,
            diagnostics: err.emit_to_string(source),
        })?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|err| RenderError::ShaderCompile {
        kind,
        diagnostics: error_chain(&err),
    })?;
    Ok(module)
}

/// Checks the entry points wgpu will ask for and returns the frame block size.
fn link(kind: PipelineKind, module: &Module) -> Result<u32> {
    let has_entry = |name: &str, stage: naga::ShaderStage| {
        module
            .entry_points
            .iter()
            .any(|ep| ep.name == name && ep.stage == stage)
    };
    if !has_entry("vs_main", naga::ShaderStage::Vertex) {
        return Err(RenderError::ShaderLink {
            kind,
            reason: "no vertex entry point `vs_main`".into(),
        });
    }
    if kind.has_fragment() && !has_entry("fs_main", naga::ShaderStage::Fragment) {
        return Err(RenderError::ShaderLink {
            kind,
            reason: "no fragment entry point `fs_main`".into(),
        });
    }
    let block = frame_block(module).ok_or_else(|| RenderError::ShaderLink {
        kind,
        reason: "no uniform struct at @group(0) @binding(0)".into(),
    })?;
    Ok(module.types[block].inner.size(module.to_ctx()))
}

fn frame_block(module: &Module) -> Option<naga::Handle<naga::Type>> {
    module
        .global_variables
        .iter()
        .find(|(_, global)| {
            global.space == AddressSpace::Uniform
                && global
                    .binding
                    .as_ref()
                    .is_some_and(|b| b.group == 0 && b.binding == 0)
        })
        .map(|(_, global)| global.ty)
        .filter(|&ty| matches!(module.types[ty].inner, TypeInner::Struct { .. }))
}

/// Byte offset and size of a dotted field path inside the frame block.
fn reflect_field(module: &Module, path: &str) -> Option<(u32, u32)> {
    let mut ty = frame_block(module)?;
    let mut offset = 0;
    for segment in path.split('.') {
        let (name, index) = parse_segment(segment)?;
        let TypeInner::Struct { members, .. } = &module.types[ty].inner else {
            return None;
        };
        let member = members.iter().find(|m| m.name.as_deref() == Some(name))?;
        offset += member.offset;
        ty = member.ty;

        if let Some(index) = index {
            let TypeInner::Array {
                base,
                size: ArraySize::Constant(len),
                stride,
            } = module.types[ty].inner
            else {
                return None;
            };
            if index >= len.get() {
                return None;
            }
            offset += stride * index;
            ty = base;
        }
    }
    Some((offset, module.types[ty].inner.size(module.to_ctx())))
}

/// `lights[3]` -> `("lights", Some(3))`, `view` -> `("view", None)`.
fn parse_segment(segment: &str) -> Option<(&str, Option<u32>)> {
    match segment.split_once('[') {
        None => Some((segment, None)),
        Some((name, rest)) => {
            let index = rest.strip_suffix(']')?.parse().ok()?;
            Some((name, Some(index)))
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(&format!("\n  caused by: {inner}"));
        source = inner.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PipelineRegistry {
        PipelineRegistry::load(ShaderSources::Embedded, 8).unwrap()
    }

    #[test]
    fn embedded_shaders_compile() {
        let registry = registry();
        assert_eq!(registry.generation(), 0);
        for kind in PipelineKind::ALL {
            assert_eq!(registry.pipeline(kind).kind, kind);
        }
    }

    #[test]
    fn standard_frame_block_layout() {
        let registry = registry();
        let standard = registry.pipeline(PipelineKind::Standard);
        assert_eq!(standard.block_size, 464);

        let at = |uniform| {
            let h = registry.handle(PipelineKind::Standard, uniform).unwrap();
            (h.offset, h.size)
        };
        assert_eq!(at(Uniform::View), (0, 64));
        assert_eq!(at(Uniform::Projection), (64, 64));
        assert_eq!(at(Uniform::LightSpaceMatrix), (128, 64));
        assert_eq!(at(Uniform::CameraPosition), (192, 12));
        assert_eq!(at(Uniform::ShadowsEnabled), (204, 4));
        assert_eq!(at(Uniform::LightPosition(0)), (208, 12));
        assert_eq!(at(Uniform::LightStrength(0)), (220, 4));
        assert_eq!(at(Uniform::LightColor(0)), (224, 12));
        assert_eq!(at(Uniform::LightPosition(1)), (240, 12));
        assert_eq!(at(Uniform::LightColor(7)), (208 + 7 * 32 + 16, 12));
    }

    #[test]
    fn indexed_uniforms_resolve_one_handle_per_slot() {
        let registry = registry();
        let strengths = registry
            .pipeline(PipelineKind::Standard)
            .resolve_indexed("lights", "strength", 8)
            .unwrap();
        let offsets: Vec<u32> = strengths.iter().map(|h| h.offset).collect();
        assert_eq!(offsets, (0..8).map(|i| 220 + i * 32).collect::<Vec<_>>());
    }

    #[test]
    fn light_slots_beyond_the_shader_array_are_missing() {
        match PipelineRegistry::load(ShaderSources::Embedded, 9) {
            Err(RenderError::MissingUniform { kind, name }) => {
                assert_eq!(kind, PipelineKind::Standard);
                assert_eq!(name, "lights[8].position");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn uniforms_are_scoped_to_their_pipeline() {
        let registry = registry();
        assert!(matches!(
            registry.handle(PipelineKind::Emissive, Uniform::CameraPosition),
            Err(RenderError::MissingUniform { .. })
        ));
        assert!(
            registry
                .resolve_uniform(PipelineKind::Shadow, "light_space")
                .is_ok()
        );
        assert!(
            registry
                .resolve_uniform(PipelineKind::Shadow, "light_space[0]")
                .is_err()
        );
    }

    #[test]
    fn syntax_errors_carry_compiler_diagnostics() {
        let err = CompiledPipeline::load(PipelineKind::Emissive, "fn vs_main( {", 8, 0).unwrap_err();
        assert!(err.is_fatal());
        match err {
            RenderError::ShaderCompile { kind, diagnostics } => {
                assert_eq!(kind, PipelineKind::Emissive);
                assert!(!diagnostics.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn type_errors_fail_validation() {
        let source = PipelineKind::Shadow
            .embedded_source()
            .replace(
                "return frame.light_space * model * vec4<f32>(vertex.position, 1.0);",
                "return frame.light_space * model;",
            );
        assert!(!source.contains("vertex.position, 1.0);"));
        assert!(matches!(
            CompiledPipeline::load(PipelineKind::Shadow, &source, 8, 0),
            Err(RenderError::ShaderCompile { .. })
        ));
    }

    #[test]
    fn missing_fragment_stage_fails_to_link() {
        let source = PipelineKind::Emissive
            .embedded_source()
            .replace("fn fs_main", "fn fs_other");
        match CompiledPipeline::load(PipelineKind::Emissive, &source, 8, 0) {
            Err(RenderError::ShaderLink { reason, .. }) => assert!(reason.contains("fs_main")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rebuild_advances_the_generation() {
        let mut registry = registry();
        let before = registry.handle(PipelineKind::Shadow, Uniform::LightSpaceMatrix).unwrap();
        registry.reload().unwrap();
        let after = registry.handle(PipelineKind::Shadow, Uniform::LightSpaceMatrix).unwrap();
        assert_eq!(before.generation + 1, after.generation);
        assert_eq!(before.offset, after.offset);
    }

    #[test]
    fn segment_parsing() {
        assert_eq!(parse_segment("view"), Some(("view", None)));
        assert_eq!(parse_segment("lights[12]"), Some(("lights", Some(12))));
        assert_eq!(parse_segment("lights[x]"), None);
        assert_eq!(parse_segment("lights[3"), None);
    }
}
