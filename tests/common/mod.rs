use std::{cell::Cell, rc::Rc};

use cgmath::Vector3;
use walkthrough_ngin::{
    Binding, BindingTable, Light, RenderBackend, RenderError, RenderKind, Renderables, Result,
    backend::upload::{self, StagedFrame},
    commands::{CommandList, PassRecord},
    data_structures::instance::Instance,
    pipelines::{PipelineKind, registry::PipelineRegistry},
    render::{MaterialId, MeshId},
};

pub struct MockShadow {
    pub width: u32,
    pub height: u32,
    drops: Rc<Cell<usize>>,
}

impl Drop for MockShadow {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

/// Backend that keeps every executed frame instead of drawing it.
pub struct RecordingBackend {
    pub size: (u32, u32),
    pub frames: Vec<Vec<PassRecord>>,
    pub staged: Option<StagedFrame>,
    pub built_generations: Vec<u32>,
    pub fail_rebuild: bool,
    pub releases: usize,
    pub created_targets: usize,
    pub dropped_targets: Rc<Cell<usize>>,
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            frames: Vec::new(),
            staged: None,
            built_generations: Vec::new(),
            fail_rebuild: false,
            releases: 0,
            created_targets: 0,
            dropped_targets: Rc::new(Cell::new(0)),
        }
    }
}

impl RenderBackend for RecordingBackend {
    type ShadowTarget = MockShadow;

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn create_shadow_target(&mut self, width: u32, height: u32) -> Result<MockShadow> {
        self.created_targets += 1;
        Ok(MockShadow {
            width,
            height,
            drops: self.dropped_targets.clone(),
        })
    }

    fn configure_surface(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn rebuild_pipelines(&mut self, registry: &PipelineRegistry) -> Result<()> {
        if self.fail_rebuild {
            return Err(RenderError::ShaderLink {
                kind: PipelineKind::Standard,
                reason: "rejected by the recording backend".into(),
            });
        }
        self.built_generations.push(registry.generation());
        Ok(())
    }

    fn execute(
        &mut self,
        commands: &CommandList,
        registry: &PipelineRegistry,
        _shadow: Option<&MockShadow>,
    ) -> Result<()> {
        self.staged = Some(upload::stage(commands, registry)?);
        self.frames.push(commands.passes().to_vec());
        Ok(())
    }

    fn release(&mut self) {
        self.releases += 1;
    }
}

pub fn white_light(x: f32, y: f32, z: f32, strength: f32) -> Light {
    Light::new(Vector3::new(x, y, z), Vector3::new(1.0, 1.0, 1.0), strength)
}

/// Every kind, the light marker and the skybox bound to distinct ids.
pub fn full_bindings() -> BindingTable {
    let mut bindings = BindingTable::new();
    bindings.set(RenderKind::Static, Binding::bound(MeshId(0), MaterialId(0)));
    bindings.set(RenderKind::Door, Binding::bound(MeshId(1), MaterialId(1)));
    bindings.set(RenderKind::Prompt, Binding::bound(MeshId(2), MaterialId(2)));
    bindings.light_marker = Binding::bound(MeshId(3), MaterialId(3));
    bindings.skybox = Binding::bound(MeshId(4), MaterialId(4));
    bindings
}

pub fn one_of_each() -> Renderables {
    let mut renderables = Renderables::new();
    renderables.push(RenderKind::Static, Instance::new());
    renderables.push(
        RenderKind::Door,
        Instance::from(Vector3::new(2.0, 0.0, 0.0)).with_pivot(Vector3::new(0.0, 0.0, 0.5)),
    );
    renderables.push(RenderKind::Prompt, Instance::from(Vector3::new(1.0, 0.0, 0.0)));
    renderables
}
