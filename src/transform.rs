//! Matrix construction helpers.
//!
//! All projections are produced in wgpu clip space (depth in `[0, 1]`), so the
//! OpenGL-style matrices from cgmath are corrected with [`OPENGL_TO_WGPU_MATRIX`].
//! Euler angles are given in degrees and applied in `Z · Y · X` order.

use cgmath::{Deg, EuclideanSpace, Matrix3, Matrix4, Point3, Vector3, Zero};

use crate::config::OrthoBounds;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Perspective projection for the camera. Recomputed on every surface resize.
pub fn perspective(fov_y: Deg<f32>, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * cgmath::perspective(fov_y, aspect, near, far)
}

/// Orthographic projection, used for the shadow-casting light only.
pub fn orthographic(bounds: &OrthoBounds) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX
        * cgmath::ortho(
            bounds.left,
            bounds.right,
            bounds.bottom,
            bounds.top,
            bounds.near,
            bounds.far,
        )
}

pub fn look_at(eye: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::look_at_rh(Point3::from_vec(eye), Point3::from_vec(target), up)
}

/// `Rz · Ry · Rx` for euler angles in degrees.
pub fn rotation(eulers: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_angle_z(Deg(eulers.z))
        * Matrix4::from_angle_y(Deg(eulers.y))
        * Matrix4::from_angle_x(Deg(eulers.x))
}

/// Model matrix rotating about `pivot` (a local-space point) before moving to
/// `position`:
///
/// `T(position) · T(pivot) · Rz · Ry · Rx · T(-pivot)`
///
/// Swapping any two factors moves the hinge away from the pivot.
pub fn pivoted_transform(
    position: Vector3<f32>,
    eulers: Vector3<f32>,
    pivot: Vector3<f32>,
) -> Matrix4<f32> {
    Matrix4::from_translation(position)
        * Matrix4::from_translation(pivot)
        * rotation(eulers)
        * Matrix4::from_translation(-pivot)
}

/// Plain translate-then-rotate model matrix.
pub fn model_transform(position: Vector3<f32>, eulers: Vector3<f32>) -> Matrix4<f32> {
    pivoted_transform(position, eulers, Vector3::zero())
}

/// Drops the translation of a view matrix, keeping its rotation. Used for the skybox.
pub fn strip_translation(view: Matrix4<f32>) -> Matrix4<f32> {
    Matrix4::from(Matrix3::from_cols(
        view.x.truncate(),
        view.y.truncate(),
        view.z.truncate(),
    ))
}

/// Euler angles that turn a billboard (a quad facing +X) towards `camera`.
///
/// The world is Z-up: yaw goes into `z`, pitch into `y`, roll stays zero.
pub fn facing_eulers(position: Vector3<f32>, camera: Vector3<f32>) -> Vector3<f32> {
    let to_camera = camera - position;
    let yaw = to_camera.y.atan2(to_camera.x);
    let planar = (to_camera.x * to_camera.x + to_camera.y * to_camera.y).sqrt();
    let pitch = -to_camera.z.atan2(planar);
    Vector3::new(0.0, pitch.to_degrees(), yaw.to_degrees())
}
