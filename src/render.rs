//! Render composition.
//!
//! The scene hands the renderer a flat, kind-indexed table of entities each
//! frame. Which mesh and material a kind is drawn with is decided once, at
//! startup, in a [`BindingTable`]; a kind without a binding is an explicit
//! [`Binding::Unbound`] entry and is skipped while recording.
//!
//! # Key types
//!
//! - [`RenderKind`] is the fixed set of entity kinds, in draw order
//! - [`Renderables`] holds the entities of one frame, grouped by kind
//! - [`BindingTable`] maps kinds (plus light markers and the sky) to GPU resources
//! - [`CameraView`] is the camera part of the per-frame snapshot

use cgmath::{Matrix4, SquareMatrix, Vector3, Zero};

use crate::data_structures::instance::Instance;

/// Index of a mesh uploaded to a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

/// Index of a material uploaded to a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

/// Kinds of renderable entities.
///
/// The order of [`RenderKind::ALL`] is the draw order inside a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderKind {
    /// Level geometry that never moves.
    Static,
    /// Hinged entities rotating about a pivot.
    Door,
    /// Camera attached interaction prompt. Drawn in the UI overlay only.
    Prompt,
}

impl RenderKind {
    pub const ALL: [RenderKind; 3] = [RenderKind::Static, RenderKind::Door, RenderKind::Prompt];

    pub fn index(self) -> usize {
        match self {
            RenderKind::Static => 0,
            RenderKind::Door => 1,
            RenderKind::Prompt => 2,
        }
    }

    /// Overlay kinds neither cast shadows nor take part in the opaque pass.
    pub fn is_overlay(self) -> bool {
        matches!(self, RenderKind::Prompt)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawBinding {
    pub mesh: MeshId,
    pub material: MaterialId,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Binding {
    Bound(DrawBinding),
    #[default]
    Unbound,
}

impl Binding {
    pub fn bound(mesh: MeshId, material: MaterialId) -> Self {
        Binding::Bound(DrawBinding { mesh, material })
    }
}

/// Mesh/material for every render kind, the light markers and the sky.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BindingTable {
    kinds: [Binding; 3],
    pub light_marker: Binding,
    pub skybox: Binding,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, kind: RenderKind, binding: Binding) {
        self.kinds[kind.index()] = binding;
    }

    pub fn get(&self, kind: RenderKind) -> Binding {
        self.kinds[kind.index()]
    }
}

/// One frame's entities grouped by kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Renderables {
    groups: [Vec<Instance>; 3],
}

impl Renderables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: RenderKind, instance: Instance) {
        self.groups[kind.index()].push(instance);
    }

    pub fn extend(&mut self, kind: RenderKind, instances: impl IntoIterator<Item = Instance>) {
        self.groups[kind.index()].extend(instances);
    }

    pub fn get(&self, kind: RenderKind) -> &[Instance] {
        &self.groups[kind.index()]
    }

    /// Groups in draw order.
    pub fn iter(&self) -> impl Iterator<Item = (RenderKind, &[Instance])> {
        RenderKind::ALL
            .into_iter()
            .map(|kind| (kind, self.get(kind)))
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Camera position and view matrix for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraView {
    pub position: Vector3<f32>,
    pub view: Matrix4<f32>,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            position: Vector3::zero(),
            view: Matrix4::identity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_default_to_unbound() {
        let mut table = BindingTable::new();
        assert_eq!(table.get(RenderKind::Door), Binding::Unbound);
        table.set(RenderKind::Door, Binding::bound(MeshId(1), MaterialId(2)));
        assert_eq!(
            table.get(RenderKind::Door),
            Binding::Bound(DrawBinding {
                mesh: MeshId(1),
                material: MaterialId(2)
            })
        );
        assert_eq!(table.get(RenderKind::Static), Binding::Unbound);
        assert_eq!(table.skybox, Binding::Unbound);
    }

    #[test]
    fn groups_iterate_in_draw_order() {
        let mut renderables = Renderables::new();
        renderables.push(RenderKind::Prompt, Instance::new());
        renderables.push(RenderKind::Static, Instance::new());
        renderables.push(RenderKind::Static, Instance::new());
        let order: Vec<(RenderKind, usize)> = renderables
            .iter()
            .map(|(kind, group)| (kind, group.len()))
            .collect();
        assert_eq!(
            order,
            vec![
                (RenderKind::Static, 2),
                (RenderKind::Door, 0),
                (RenderKind::Prompt, 1)
            ]
        );
        assert_eq!(renderables.len(), 3);
    }

    #[test]
    fn only_prompts_are_overlay() {
        assert!(RenderKind::Prompt.is_overlay());
        assert!(!RenderKind::Static.is_overlay());
        assert!(!RenderKind::Door.is_overlay());
    }
}
