//! The walkthrough scene: camera, static entities, doors, lights and UI.
//!
//! The scene owns all mutable game state and hands the renderer a snapshot
//! each frame through [`Scene::snapshot`].

use cgmath::{InnerSpace, Vector3};

use crate::{
    data_structures::instance::Instance,
    lights::Light,
    render::{CameraView, RenderKind, Renderables},
};

pub mod camera;
pub mod door;
pub mod ui;

pub use camera::Camera;
pub use door::{Door, Swing};
pub use ui::{UiElement, UiState};

#[derive(Clone, Debug)]
pub struct Scene {
    pub camera: Camera,
    pub statics: Vec<Instance>,
    pub doors: Vec<Door>,
    pub lights: Vec<Light>,
    pub ui: UiState,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            statics: Vec::new(),
            doors: Vec::new(),
            lights: Vec::new(),
            ui: UiState::new(),
        }
    }

    /// Advance doors and UI by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.camera.update_basis();

        let mut any_active = false;
        for door in &mut self.doors {
            door.update(dt, self.camera.position);
            any_active |= door.is_active();
        }
        if any_active {
            self.ui.show(UiElement::InteractionPrompt);
        } else {
            self.ui.hide(UiElement::InteractionPrompt);
        }
        self.ui.update(&self.camera);
    }

    /// Toggle the closest door in reach. Returns false if none is.
    pub fn interact(&mut self) -> bool {
        let camera = self.camera.position;
        let closest = self
            .doors
            .iter_mut()
            .filter(|door| door.is_active())
            .min_by(|a, b| {
                let da = (a.position - camera).magnitude2();
                let db = (b.position - camera).magnitude2();
                da.total_cmp(&db)
            });
        match closest {
            Some(door) => {
                door.toggle();
                true
            }
            None => false,
        }
    }

    pub fn walk(&mut self, d: Vector3<f32>) {
        self.camera.walk(d);
    }

    pub fn spin(&mut self, d: Vector3<f32>) {
        self.camera.spin(d);
    }

    /// Everything the renderer needs for one frame.
    pub fn snapshot(&self) -> (CameraView, Renderables) {
        let mut renderables = Renderables::new();
        renderables.extend(RenderKind::Static, self.statics.iter().copied());
        renderables.extend(RenderKind::Door, self.doors.iter().map(Door::instance));
        self.ui.append_to(&mut renderables);
        (self.camera.view_snapshot(), renderables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_door() -> Scene {
        let mut scene = Scene::new(Camera::new(Vector3::new(0.0, 0.0, 0.0)));
        scene.statics.push(Instance::new());
        scene
            .doors
            .push(Door::new(Vector3::new(2.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0), Swing::Positive));
        scene
    }

    #[test]
    fn prompt_follows_door_proximity() {
        let mut scene = scene_with_door();
        scene.update(0.016);
        assert!(scene.ui.is_visible(UiElement::InteractionPrompt));
        let (_, renderables) = scene.snapshot();
        assert_eq!(renderables.get(RenderKind::Prompt).len(), 1);

        scene.walk(Vector3::new(-10.0, 0.0, 0.0));
        scene.update(0.016);
        assert!(!scene.ui.is_visible(UiElement::InteractionPrompt));
        let (_, renderables) = scene.snapshot();
        assert!(renderables.get(RenderKind::Prompt).is_empty());
    }

    #[test]
    fn interact_only_reaches_active_doors() {
        let mut scene = scene_with_door();
        assert!(!scene.interact());
        scene.update(0.0);
        assert!(scene.interact());
        assert!(scene.doors[0].is_open());
    }

    #[test]
    fn snapshot_groups_entities_by_kind() {
        let scene = scene_with_door();
        let (view, renderables) = scene.snapshot();
        assert_eq!(view.position, scene.camera.position);
        assert_eq!(renderables.get(RenderKind::Static).len(), 1);
        assert_eq!(renderables.get(RenderKind::Door).len(), 1);
        assert_eq!(renderables.len(), 2);
    }
}
