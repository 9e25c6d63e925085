use std::collections::BTreeSet;

use crate::{
    data_structures::instance::Instance,
    render::{RenderKind, Renderables},
    scene::camera::Camera,
    transform,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UiElement {
    InteractionPrompt,
}

impl UiElement {
    pub fn kind(self) -> RenderKind {
        match self {
            UiElement::InteractionPrompt => RenderKind::Prompt,
        }
    }
}

/// Camera attached UI: which elements are shown and where.
#[derive(Clone, Debug)]
pub struct UiState {
    active: BTreeSet<UiElement>,
    prompt: Instance,
}

impl UiState {
    /// Distance in front of the camera the prompt floats at.
    pub const PROMPT_DISTANCE: f32 = 2.0;
    pub const PROMPT_LIFT: f32 = 0.3;

    pub fn new() -> Self {
        Self {
            active: BTreeSet::new(),
            prompt: Instance::new(),
        }
    }

    pub fn show(&mut self, element: UiElement) {
        self.active.insert(element);
    }

    /// Hiding an element that is not shown is a no-op.
    pub fn hide(&mut self, element: UiElement) {
        self.active.remove(&element);
    }

    pub fn is_visible(&self, element: UiElement) -> bool {
        self.active.contains(&element)
    }

    pub fn prompt(&self) -> &Instance {
        &self.prompt
    }

    /// Move visible elements in front of the camera and turn them towards it.
    pub fn update(&mut self, camera: &Camera) {
        if self.is_visible(UiElement::InteractionPrompt) {
            let position = camera.position
                + camera.forwards() * Self::PROMPT_DISTANCE
                + camera.up() * Self::PROMPT_LIFT;
            self.prompt = Instance::from(position)
                .with_eulers(transform::facing_eulers(position, camera.position));
        }
    }

    pub fn append_to(&self, renderables: &mut Renderables) {
        for &element in &self.active {
            let instance = match element {
                UiElement::InteractionPrompt => self.prompt,
            };
            renderables.push(element.kind(), instance);
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
