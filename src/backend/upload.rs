//! Staging of a recorded frame into upload-ready bytes.
//!
//! Frame uniforms are folded into one byte block per pipeline kind, laid out
//! exactly like the reflected WGSL struct, and every draw becomes one
//! [`InstanceRaw`]. Later writes to the same uniform within a frame replace
//! earlier ones. Handle misuse is caught here, before anything reaches the GPU.

use crate::{
    commands::{Command, CommandList},
    data_structures::instance::InstanceRaw,
    error::{RenderError, Result},
    pipelines::{PipelineKind, registry::PipelineRegistry},
};

#[derive(Debug)]
pub struct StagedFrame {
    blocks: Vec<Vec<u8>>,
    written: [bool; 4],
    /// One entry per draw, in command order.
    pub instances: Vec<InstanceRaw>,
}

impl StagedFrame {
    /// Frame block for `kind`, if any of its uniforms were set this frame.
    pub fn block(&self, kind: PipelineKind) -> Option<&[u8]> {
        self.written[kind.index()].then(|| self.blocks[kind.index()].as_slice())
    }
}

pub fn stage(commands: &CommandList, registry: &PipelineRegistry) -> Result<StagedFrame> {
    let mut blocks: Vec<Vec<u8>> = PipelineKind::ALL
        .iter()
        .map(|&kind| vec![0u8; registry.pipeline(kind).block_size as usize])
        .collect();
    let mut written = [false; 4];
    let mut instances = Vec::with_capacity(commands.draw_count());

    for pass in commands.passes() {
        // Pipelines do not carry over between render passes
        let mut active: Option<PipelineKind> = None;
        for command in &pass.commands {
            match command {
                Command::SetPipeline(kind) => active = Some(*kind),
                Command::SetUniform(handle, value) => {
                    if handle.generation != registry.generation() {
                        return Err(RenderError::StaleUniform {
                            kind: handle.kind,
                            handle: handle.generation,
                            current: registry.generation(),
                        });
                    }
                    if active != Some(handle.kind) {
                        return Err(RenderError::UniformOutsidePipeline {
                            kind: handle.kind,
                            active,
                        });
                    }
                    let bytes = value.to_bytes();
                    let size_error = RenderError::UniformSize {
                        kind: handle.kind,
                        offset: handle.offset,
                        expected: handle.size,
                        actual: bytes.len() as u32,
                    };
                    if bytes.len() != handle.size as usize {
                        return Err(size_error);
                    }
                    let start = handle.offset as usize;
                    let slot = blocks[handle.kind.index()]
                        .get_mut(start..start + bytes.len())
                        .ok_or(size_error)?;
                    slot.copy_from_slice(&bytes);
                    written[handle.kind.index()] = true;
                }
                Command::Draw { model, tint } => instances.push(InstanceRaw::new(*model, *tint)),
                _ => {}
            }
        }
    }

    Ok(StagedFrame {
        blocks,
        written,
        instances,
    })
}

#[cfg(test)]
mod tests {
    use cgmath::{Matrix4, SquareMatrix, Vector3};

    use super::*;
    use crate::{
        commands::{PassTarget, UniformValue},
        config::ShaderSources,
        pipelines::registry::Uniform,
    };

    fn registry() -> PipelineRegistry {
        PipelineRegistry::load(ShaderSources::Embedded, 8).unwrap()
    }

    fn surface() -> PassTarget {
        PassTarget::Surface {
            width: 8,
            height: 8,
            clear: wgpu::Color::BLACK,
        }
    }

    #[test]
    fn uniforms_land_at_their_reflected_offsets() {
        let registry = registry();
        let camera = registry
            .handle(PipelineKind::Standard, Uniform::CameraPosition)
            .unwrap();
        let strength = registry
            .handle(PipelineKind::Standard, Uniform::LightStrength(1))
            .unwrap();
        let mut list = CommandList::new();
        {
            let mut pass = list.begin(surface());
            pass.set_pipeline(PipelineKind::Standard);
            pass.set_uniform(camera, UniformValue::Vec3(Vector3::new(1.0, 2.0, 3.0)));
            pass.set_uniform(strength, UniformValue::Float(8.0));
            pass.draw(Matrix4::identity(), Vector3::new(1.0, 1.0, 1.0));
        }
        let staged = stage(&list, &registry).unwrap();
        let block = staged.block(PipelineKind::Standard).unwrap();
        let position: [f32; 3] = bytemuck::pod_read_unaligned(&block[192..204]);
        assert_eq!(position, [1.0, 2.0, 3.0]);
        let strength: f32 = bytemuck::pod_read_unaligned(&block[252..256]);
        assert_eq!(strength, 8.0);
        assert!(staged.block(PipelineKind::Shadow).is_none());
        assert_eq!(staged.instances.len(), 1);
    }

    #[test]
    fn handles_from_an_older_generation_are_rejected() {
        let old = registry();
        let view = old.handle(PipelineKind::Emissive, Uniform::View).unwrap();
        let current = old.rebuilt().unwrap();
        let mut list = CommandList::new();
        {
            let mut pass = list.begin(surface());
            pass.set_pipeline(PipelineKind::Emissive);
            pass.set_uniform(view, UniformValue::Mat4(Matrix4::identity()));
        }
        assert!(matches!(
            stage(&list, &current),
            Err(RenderError::StaleUniform {
                handle: 0,
                current: 1,
                ..
            })
        ));
    }

    #[test]
    fn uniforms_need_their_pipeline_to_be_active() {
        let registry = registry();
        let view = registry.handle(PipelineKind::Skybox, Uniform::View).unwrap();
        let mut list = CommandList::new();
        {
            let mut pass = list.begin(surface());
            pass.set_pipeline(PipelineKind::Emissive);
            pass.set_uniform(view, UniformValue::Mat4(Matrix4::identity()));
        }
        assert!(matches!(
            stage(&list, &registry),
            Err(RenderError::UniformOutsidePipeline {
                kind: PipelineKind::Skybox,
                active: Some(PipelineKind::Emissive),
            })
        ));
    }

    #[test]
    fn pipeline_does_not_leak_into_the_next_pass() {
        let registry = registry();
        let light_space = registry
            .handle(PipelineKind::Shadow, Uniform::LightSpaceMatrix)
            .unwrap();
        let mut list = CommandList::new();
        list.begin(PassTarget::Shadow {
            width: 4,
            height: 4,
        })
        .set_pipeline(PipelineKind::Shadow);
        list.begin(surface())
            .set_uniform(light_space, UniformValue::Mat4(Matrix4::identity()));
        assert!(matches!(
            stage(&list, &registry),
            Err(RenderError::UniformOutsidePipeline { active: None, .. })
        ));
    }

    #[test]
    fn value_size_must_match_the_handle() {
        let registry = registry();
        let position = registry
            .handle(PipelineKind::Standard, Uniform::LightPosition(0))
            .unwrap();
        let mut list = CommandList::new();
        {
            let mut pass = list.begin(surface());
            pass.set_pipeline(PipelineKind::Standard);
            pass.set_uniform(position, UniformValue::Float(1.0));
        }
        assert!(matches!(
            stage(&list, &registry),
            Err(RenderError::UniformSize {
                expected: 12,
                actual: 4,
                ..
            })
        ));
    }
}
