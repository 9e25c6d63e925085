use cgmath::{InnerSpace, Matrix4, Vector3};

use crate::{render::CameraView, transform};

/// First person camera in a Z-up world.
///
/// `eulers` are `(roll, pitch, yaw)` in degrees. Pitch is clamped so the view
/// never flips over the vertical.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vector3<f32>,
    pub eulers: Vector3<f32>,
    forwards: Vector3<f32>,
    right: Vector3<f32>,
    up: Vector3<f32>,
}

impl Camera {
    pub const PITCH_LIMIT: f32 = 89.0;

    pub fn new(position: Vector3<f32>) -> Self {
        let mut camera = Self {
            position,
            eulers: Vector3::new(0.0, 0.0, 0.0),
            forwards: Vector3::unit_x(),
            right: -Vector3::unit_y(),
            up: Vector3::unit_z(),
        };
        camera.update_basis();
        camera
    }

    pub fn with_eulers(mut self, eulers: Vector3<f32>) -> Self {
        self.eulers = eulers;
        self.update_basis();
        self
    }

    /// Recompute forwards/right/up from the current angles.
    pub fn update_basis(&mut self) {
        let theta = self.eulers.z.to_radians();
        let phi = self.eulers.y.to_radians();
        self.forwards = Vector3::new(
            theta.cos() * phi.cos(),
            theta.sin() * phi.cos(),
            phi.sin(),
        );
        self.right = self.forwards.cross(Vector3::unit_z()).normalize();
        self.up = self.right.cross(self.forwards);
    }

    pub fn forwards(&self) -> Vector3<f32> {
        self.forwards
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn view(&self) -> Matrix4<f32> {
        transform::look_at(self.position, self.position + self.forwards, self.up)
    }

    pub fn view_snapshot(&self) -> CameraView {
        CameraView {
            position: self.position,
            view: self.view(),
        }
    }

    /// Move by `d` along `(forwards, right, up)`.
    pub fn walk(&mut self, d: Vector3<f32>) {
        self.position += d.x * self.forwards + d.y * self.right + d.z * self.up;
    }

    /// Turn by `d` degrees. Roll and yaw wrap into `[0, 360)`.
    pub fn spin(&mut self, d: Vector3<f32>) {
        self.eulers += d;
        self.eulers.x = self.eulers.x.rem_euclid(360.0);
        self.eulers.y = self.eulers.y.clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        self.eulers.z = self.eulers.z.rem_euclid(360.0);
        self.update_basis();
    }
}
