use cgmath::{InnerSpace, Vector3};

use crate::data_structures::instance::Instance;

/// The camera has to be closer than this to interact with a door.
pub const ACTIVATION_DISTANCE: f32 = 3.0;

/// Which way a door swings open about its hinge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Swing {
    #[default]
    Positive,
    Negative,
}

impl Swing {
    pub fn sign(self) -> f32 {
        match self {
            Swing::Positive => 1.0,
            Swing::Negative => -1.0,
        }
    }
}

/// A hinged entity that animates between closed and open.
///
/// Only the rotation about Y is animated. It moves from `base_angle` towards
/// `base_angle + angle_limit * swing` while open and back while closed, and is
/// always clipped to the range between the two.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Door {
    pub position: Vector3<f32>,
    pub eulers: Vector3<f32>,
    /// Local-space hinge point.
    pub pivot: Vector3<f32>,
    pub base_angle: f32,
    pub angle_limit: f32,
    /// Degrees per second.
    pub speed: f32,
    pub swing: Swing,
    open: bool,
    active: bool,
}

impl Door {
    pub const DEFAULT_SPEED: f32 = 90.0;

    /// A closed door. The hinge defaults to `-position + (0, 0, 0.5)`.
    pub fn new(position: Vector3<f32>, eulers: Vector3<f32>, swing: Swing) -> Self {
        Self {
            position,
            eulers,
            pivot: -position + Vector3::new(0.0, 0.0, 0.5),
            base_angle: eulers.y,
            angle_limit: 90.0,
            speed: Self::DEFAULT_SPEED,
            swing,
            open: false,
            active: false,
        }
    }

    pub fn with_pivot(mut self, pivot: Vector3<f32>) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether the camera was within reach at the last update.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
        log::info!("door {}", if self.open { "opened" } else { "closed" });
    }

    /// `(min, max)` of the swing range.
    pub fn range(&self) -> (f32, f32) {
        let end = self.base_angle + self.angle_limit * self.swing.sign();
        (self.base_angle.min(end), self.base_angle.max(end))
    }

    pub fn update(&mut self, dt: f32, camera: Vector3<f32>) {
        self.active = (camera - self.position).magnitude() < ACTIVATION_DISTANCE;

        let sign = self.swing.sign();
        let (target, step) = if self.open {
            (self.base_angle + self.angle_limit * sign, sign)
        } else {
            (self.base_angle, -sign)
        };
        if (target - self.eulers.y).abs() > 0.01 {
            let (min, max) = self.range();
            self.eulers.y = (self.eulers.y + step * self.speed * dt).clamp(min, max);
        }
    }

    pub fn instance(&self) -> Instance {
        Instance::from(self.position)
            .with_eulers(self.eulers)
            .with_pivot(self.pivot)
    }
}
