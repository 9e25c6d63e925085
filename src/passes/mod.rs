//! Frame recording: the shadow pass followed by the main pass.

use cgmath::{Matrix4, Vector3};

use crate::{
    commands::PassRecorder,
    data_structures::instance::Instance,
    lights::Light,
    pipelines::registry::PipelineRegistry,
    render::{Binding, BindingTable, CameraView, RenderKind, Renderables},
};

pub mod main_pass;
pub mod shadow;

/// Everything a pass needs to record one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameInputs<'a> {
    pub registry: &'a PipelineRegistry,
    pub bindings: &'a BindingTable,
    pub renderables: &'a Renderables,
    pub camera: &'a CameraView,
    pub projection: Matrix4<f32>,
    /// The closest lights padded to the slot count, dominant light first.
    /// Shading and the emissive markers both use these.
    pub selected: &'a [Light],
    pub light_space: Matrix4<f32>,
    /// True when a shadow map was rendered this frame.
    pub shadows_active: bool,
    pub viewport: (u32, u32),
    pub clear_colour: wgpu::Color,
}

pub(crate) const WHITE: Vector3<f32> = Vector3::new(1.0, 1.0, 1.0);

/// Draws every instance of a group with one mesh/material bind.
///
/// `with_material` is false for the depth only shadow pass. Unbound kinds and
/// empty groups record nothing.
pub(crate) fn draw_group(
    pass: &mut PassRecorder<'_>,
    bindings: &BindingTable,
    kind: RenderKind,
    instances: &[Instance],
    with_material: bool,
) {
    if instances.is_empty() {
        return;
    }
    let Binding::Bound(binding) = bindings.get(kind) else {
        log::debug!("skipping {} {kind:?} instances without a binding", instances.len());
        return;
    };
    if with_material {
        pass.bind_material(binding.material);
    }
    pass.bind_mesh(binding.mesh);
    for instance in instances {
        pass.draw(instance.to_matrix(), WHITE);
    }
}
