//! Recorded frame commands.
//!
//! The shadow and main passes never talk to the GPU directly. They record a
//! [`CommandList`] which a [`crate::backend::RenderBackend`] then executes. The
//! list tracks the depth test state across passes the same way a GPU context
//! would, so a pass that forgets to restore it is visible before anything is
//! drawn.

use cgmath::{Matrix4, Vector3};

use crate::{
    pipelines::{PipelineKind, registry::UniformHandle},
    render::{MaterialId, MeshId},
};

/// Depth test configuration. Every pass must hand back [`DepthState::Less`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthState {
    #[default]
    Less,
    /// Lets geometry at the far plane pass, used by the skybox.
    LessEqual,
    /// No depth test and no depth writes, used by the UI overlay.
    Disabled,
}

impl DepthState {
    pub const ALL: [DepthState; 3] = [DepthState::Less, DepthState::LessEqual, DepthState::Disabled];

    pub fn compare(self) -> wgpu::CompareFunction {
        match self {
            DepthState::Less => wgpu::CompareFunction::Less,
            DepthState::LessEqual => wgpu::CompareFunction::LessEqual,
            DepthState::Disabled => wgpu::CompareFunction::Always,
        }
    }

    pub fn writes(self) -> bool {
        !matches!(self, DepthState::Disabled)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Mat4(Matrix4<f32>),
    Vec3(Vector3<f32>),
    Float(f32),
    Flag(bool),
}

impl UniformValue {
    /// Bytes as laid out in a WGSL uniform block.
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            UniformValue::Mat4(m) => {
                let raw: [[f32; 4]; 4] = m.into();
                bytemuck::bytes_of(&raw).to_vec()
            }
            UniformValue::Vec3(v) => {
                let raw: [f32; 3] = v.into();
                bytemuck::bytes_of(&raw).to_vec()
            }
            UniformValue::Float(f) => bytemuck::bytes_of(&f).to_vec(),
            UniformValue::Flag(b) => bytemuck::bytes_of(&(b as u32)).to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    SetViewport { x: u32, y: u32, width: u32, height: u32 },
    SetPipeline(PipelineKind),
    SetDepth(DepthState),
    SetUniform(UniformHandle, UniformValue),
    BindShadowMap,
    BindMaterial(MaterialId),
    BindMesh(MeshId),
    Draw { model: Matrix4<f32>, tint: Vector3<f32> },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PassTarget {
    /// Depth only, cleared to 1.0.
    Shadow { width: u32, height: u32 },
    /// Colour and depth, both cleared.
    Surface {
        width: u32,
        height: u32,
        clear: wgpu::Color,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PassRecord {
    pub target: PassTarget,
    pub commands: Vec<Command>,
}

#[derive(Debug)]
pub struct CommandList {
    passes: Vec<PassRecord>,
    depth: DepthState,
}

impl CommandList {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            depth: DepthState::Less,
        }
    }

    /// Start a new render pass. Commands go to it until the recorder is dropped.
    pub fn begin(&mut self, target: PassTarget) -> PassRecorder<'_> {
        self.passes.push(PassRecord {
            target,
            commands: Vec::new(),
        });
        PassRecorder { list: self }
    }

    pub fn passes(&self) -> &[PassRecord] {
        &self.passes
    }

    /// Depth state in effect after the last recorded command.
    pub fn depth(&self) -> DepthState {
        self.depth
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.passes.iter().flat_map(|pass| pass.commands.iter())
    }

    pub fn draw_count(&self) -> usize {
        self.commands()
            .filter(|c| matches!(c, Command::Draw { .. }))
            .count()
    }
}

impl Default for CommandList {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PassRecorder<'a> {
    list: &'a mut CommandList,
}

impl PassRecorder<'_> {
    fn push(&mut self, command: Command) {
        if let Some(pass) = self.list.passes.last_mut() {
            pass.commands.push(command);
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.push(Command::SetViewport {
            x: 0,
            y: 0,
            width,
            height,
        });
    }

    pub fn set_pipeline(&mut self, kind: PipelineKind) {
        self.push(Command::SetPipeline(kind));
    }

    pub fn set_depth(&mut self, depth: DepthState) {
        self.list.depth = depth;
        self.push(Command::SetDepth(depth));
    }

    pub fn set_uniform(&mut self, handle: UniformHandle, value: UniformValue) {
        self.push(Command::SetUniform(handle, value));
    }

    pub fn bind_shadow_map(&mut self) {
        self.push(Command::BindShadowMap);
    }

    pub fn bind_material(&mut self, material: MaterialId) {
        self.push(Command::BindMaterial(material));
    }

    pub fn bind_mesh(&mut self, mesh: MeshId) {
        self.push(Command::BindMesh(mesh));
    }

    pub fn draw(&mut self, model: Matrix4<f32>, tint: Vector3<f32>) {
        self.push(Command::Draw { model, tint });
    }

    pub fn depth(&self) -> DepthState {
        self.list.depth
    }
}

#[cfg(test)]
mod tests {
    use cgmath::SquareMatrix;

    use super::*;

    #[test]
    fn depth_state_survives_pass_boundaries() {
        let mut list = CommandList::new();
        {
            let mut pass = list.begin(PassTarget::Shadow {
                width: 4,
                height: 4,
            });
            pass.set_depth(DepthState::LessEqual);
        }
        assert_eq!(list.depth(), DepthState::LessEqual);
        let pass = list.begin(PassTarget::Surface {
            width: 4,
            height: 4,
            clear: wgpu::Color::BLACK,
        });
        assert_eq!(pass.depth(), DepthState::LessEqual);
    }

    #[test]
    fn commands_go_to_the_open_pass() {
        let mut list = CommandList::new();
        list.begin(PassTarget::Shadow {
            width: 1,
            height: 1,
        })
        .set_pipeline(PipelineKind::Shadow);
        {
            let mut main = list.begin(PassTarget::Surface {
                width: 1,
                height: 1,
                clear: wgpu::Color::BLACK,
            });
            main.set_pipeline(PipelineKind::Standard);
            main.draw(Matrix4::identity(), Vector3::new(1.0, 1.0, 1.0));
        }
        assert_eq!(list.passes().len(), 2);
        assert_eq!(list.passes()[0].commands.len(), 1);
        assert_eq!(list.passes()[1].commands.len(), 2);
        assert_eq!(list.draw_count(), 1);
    }

    #[test]
    fn uniform_values_match_wgsl_sizes() {
        assert_eq!(UniformValue::Mat4(Matrix4::identity()).to_bytes().len(), 64);
        assert_eq!(UniformValue::Vec3(Vector3::new(1.0, 2.0, 3.0)).to_bytes().len(), 12);
        assert_eq!(UniformValue::Float(2.0).to_bytes().len(), 4);
        assert_eq!(UniformValue::Flag(true).to_bytes(), 1u32.to_ne_bytes().to_vec());
    }

    #[test]
    fn disabled_depth_neither_tests_nor_writes() {
        assert_eq!(DepthState::Disabled.compare(), wgpu::CompareFunction::Always);
        assert!(!DepthState::Disabled.writes());
        assert!(DepthState::LessEqual.writes());
    }
}
