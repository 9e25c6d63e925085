//! The main pass: opaque, emissive, skybox and UI overlay, in that order.
//!
//! Depth state transitions are part of the contract. The skybox is drawn with
//! [`DepthState::LessEqual`] so it survives at the far plane, the overlay with
//! [`DepthState::Disabled`] so it is never occluded, and both restore
//! [`DepthState::Less`] before the next stage, even when they draw nothing.

use cgmath::{Matrix4, SquareMatrix};

use crate::{
    commands::{CommandList, DepthState, PassRecorder, PassTarget, UniformValue},
    data_structures::instance::Instance,
    error::Result,
    passes::{FrameInputs, WHITE, draw_group},
    pipelines::{PipelineKind, registry::Uniform},
    render::Binding,
    transform,
};

pub fn record(list: &mut CommandList, frame: &FrameInputs<'_>) -> Result<()> {
    let (width, height) = frame.viewport;
    let mut pass = list.begin(PassTarget::Surface {
        width,
        height,
        clear: frame.clear_colour,
    });
    pass.set_viewport(width, height);

    opaque(&mut pass, frame)?;
    emissive(&mut pass, frame)?;
    skybox(&mut pass, frame)?;
    overlay(&mut pass, frame);
    Ok(())
}

fn set(
    pass: &mut PassRecorder<'_>,
    frame: &FrameInputs<'_>,
    kind: PipelineKind,
    uniform: Uniform,
    value: UniformValue,
) -> Result<()> {
    let handle = frame.registry.handle(kind, uniform)?;
    pass.set_uniform(handle, value);
    Ok(())
}

fn opaque(pass: &mut PassRecorder<'_>, frame: &FrameInputs<'_>) -> Result<()> {
    use PipelineKind::Standard;

    pass.set_pipeline(Standard);
    set(pass, frame, Standard, Uniform::View, UniformValue::Mat4(frame.camera.view))?;
    set(pass, frame, Standard, Uniform::Projection, UniformValue::Mat4(frame.projection))?;
    set(
        pass,
        frame,
        Standard,
        Uniform::CameraPosition,
        UniformValue::Vec3(frame.camera.position),
    )?;
    set(
        pass,
        frame,
        Standard,
        Uniform::ShadowsEnabled,
        UniformValue::Flag(frame.shadows_active),
    )?;
    set(
        pass,
        frame,
        Standard,
        Uniform::LightSpaceMatrix,
        UniformValue::Mat4(frame.light_space),
    )?;
    for (i, light) in frame.selected.iter().enumerate() {
        set(pass, frame, Standard, Uniform::LightPosition(i), UniformValue::Vec3(light.position))?;
        set(pass, frame, Standard, Uniform::LightColor(i), UniformValue::Vec3(light.color))?;
        set(pass, frame, Standard, Uniform::LightStrength(i), UniformValue::Float(light.strength))?;
    }
    pass.bind_shadow_map();

    for (kind, instances) in frame.renderables.iter() {
        if kind.is_overlay() {
            continue;
        }
        draw_group(pass, frame.bindings, kind, instances, true);
    }
    Ok(())
}

/// Camera facing markers for every light that actually shines.
fn emissive(pass: &mut PassRecorder<'_>, frame: &FrameInputs<'_>) -> Result<()> {
    use PipelineKind::Emissive;

    pass.set_pipeline(Emissive);
    set(pass, frame, Emissive, Uniform::View, UniformValue::Mat4(frame.camera.view))?;
    set(pass, frame, Emissive, Uniform::Projection, UniformValue::Mat4(frame.projection))?;

    let Binding::Bound(marker) = frame.bindings.light_marker else {
        return Ok(());
    };
    let mut markers = frame.selected.iter().filter(|light| !light.is_null()).peekable();
    if markers.peek().is_none() {
        return Ok(());
    }
    pass.bind_material(marker.material);
    pass.bind_mesh(marker.mesh);
    for light in markers {
        let eulers = transform::facing_eulers(light.position, frame.camera.position);
        let model = Instance::from(light.position).with_eulers(eulers).to_matrix();
        pass.draw(model, light.color);
    }
    Ok(())
}

fn skybox(pass: &mut PassRecorder<'_>, frame: &FrameInputs<'_>) -> Result<()> {
    use PipelineKind::Skybox;

    pass.set_depth(DepthState::LessEqual);
    pass.set_pipeline(Skybox);
    set(
        pass,
        frame,
        Skybox,
        Uniform::View,
        UniformValue::Mat4(transform::strip_translation(frame.camera.view)),
    )?;
    set(pass, frame, Skybox, Uniform::Projection, UniformValue::Mat4(frame.projection))?;
    if let Binding::Bound(sky) = frame.bindings.skybox {
        pass.bind_material(sky.material);
        pass.bind_mesh(sky.mesh);
        pass.draw(Matrix4::identity(), WHITE);
    }
    pass.set_depth(DepthState::Less);
    Ok(())
}

/// Camera attached UI through the emissive pipeline with a white tint.
///
/// The emissive frame uniforms are still in place from the marker stage.
fn overlay(pass: &mut PassRecorder<'_>, frame: &FrameInputs<'_>) {
    pass.set_depth(DepthState::Disabled);
    pass.set_pipeline(PipelineKind::Emissive);
    for (kind, instances) in frame.renderables.iter() {
        if kind.is_overlay() {
            draw_group(pass, frame.bindings, kind, instances, true);
        }
    }
    pass.set_depth(DepthState::Less);
}
