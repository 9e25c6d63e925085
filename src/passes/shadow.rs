//! Depth from the dominant light's point of view.

use cgmath::{InnerSpace, Matrix4, Vector3};

use crate::{
    commands::{CommandList, PassTarget, UniformValue},
    config::ShadowConfig,
    error::Result,
    lights::Light,
    passes::{FrameInputs, draw_group},
    pipelines::{PipelineKind, registry::Uniform},
    transform,
};

/// `orthographic(bounds) · lookAt(light, center, up)`
///
/// A light sitting on the up axis through the center (or on the center itself)
/// leaves the look-at basis undefined, so a perpendicular up vector is used then.
pub fn light_space_matrix(light: &Light, shadow: &ShadowConfig) -> Matrix4<f32> {
    let mut center = shadow.center;
    if (center - light.position).magnitude2() < DEGENERATE_EPSILON {
        center = light.position - shadow.up;
    }
    let direction = (center - light.position).normalize();
    let up = if direction.cross(shadow.up).magnitude2() < DEGENERATE_EPSILON {
        perpendicular(shadow.up)
    } else {
        shadow.up
    };
    transform::orthographic(&shadow.bounds) * transform::look_at(light.position, center, up)
}

const DEGENERATE_EPSILON: f32 = 1e-6;

fn perpendicular(v: Vector3<f32>) -> Vector3<f32> {
    let axis = if v.z.abs() < 0.9 {
        Vector3::unit_z()
    } else {
        Vector3::unit_x()
    };
    v.cross(axis).normalize()
}

/// Record the shadow pass into a `width`×`height` depth target.
///
/// Overlay kinds are left out; every other bound kind is drawn depth only.
pub fn record(
    list: &mut CommandList,
    frame: &FrameInputs<'_>,
    width: u32,
    height: u32,
) -> Result<()> {
    let light_space = frame
        .registry
        .handle(PipelineKind::Shadow, Uniform::LightSpaceMatrix)?;

    let mut pass = list.begin(PassTarget::Shadow { width, height });
    pass.set_viewport(width, height);
    pass.set_pipeline(PipelineKind::Shadow);
    pass.set_uniform(light_space, UniformValue::Mat4(frame.light_space));
    for (kind, instances) in frame.renderables.iter() {
        if kind.is_overlay() {
            continue;
        }
        draw_group(&mut pass, frame.bindings, kind, instances, false);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{EuclideanSpace, Point3, Transform, Vector3};

    use super::*;

    #[test]
    fn light_space_projects_the_scene_center_to_the_middle_of_the_map() {
        let light = Light::new(Vector3::new(5.0, 5.0, 5.0), Vector3::new(1.0, 1.0, 1.0), 8.0);
        let shadow = ShadowConfig::default();
        let m = light_space_matrix(&light, &shadow);
        let center = m.transform_point(Point3::from_vec(shadow.center));
        assert_relative_eq!(center.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(center.y, 0.0, epsilon = 1e-5);
        assert!(center.z > 0.0 && center.z < 1.0);
    }

    fn is_finite(m: &Matrix4<f32>) -> bool {
        let raw: [[f32; 4]; 4] = (*m).into();
        raw.iter().flatten().all(|v| v.is_finite())
    }

    #[test]
    fn light_above_the_center_still_has_a_basis() {
        let light = Light::new(Vector3::new(0.0, 10.0, 0.0), Vector3::new(1.0, 1.0, 1.0), 8.0);
        let shadow = ShadowConfig::default();
        let m = light_space_matrix(&light, &shadow);
        assert!(is_finite(&m));
        let center = m.transform_point(Point3::from_vec(shadow.center));
        assert_relative_eq!(center.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(center.y, 0.0, epsilon = 1e-5);
        assert!(center.z > 0.0 && center.z < 1.0);
    }

    #[test]
    fn light_on_the_center_still_has_a_basis() {
        let shadow = ShadowConfig::default();
        let light = Light::new(shadow.center, Vector3::new(1.0, 1.0, 1.0), 8.0);
        assert!(is_finite(&light_space_matrix(&light, &shadow)));
    }
}
