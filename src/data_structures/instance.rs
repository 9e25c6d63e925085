//! Per-draw instance data.
//!
//! Every draw carries its own model matrix and tint through an instance-rate
//! vertex buffer, so one mesh can be drawn for many entities without touching
//! the frame uniforms in between.

use cgmath::{Matrix4, Vector3, Zero};

use crate::{data_structures::model, transform};

/// Position, orientation and hinge of one renderable entity.
///
/// `eulers` are degrees, applied `Z · Y · X`. `pivot` is the local-space point
/// the rotation happens about; it is zero for everything but hinged entities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: Vector3<f32>,
    pub eulers: Vector3<f32>,
    pub pivot: Vector3<f32>,
}

impl Instance {
    pub fn new() -> Self {
        Self {
            position: Vector3::zero(),
            eulers: Vector3::zero(),
            pivot: Vector3::zero(),
        }
    }

    pub fn with_eulers(mut self, eulers: Vector3<f32>) -> Self {
        self.eulers = eulers;
        self
    }

    pub fn with_pivot(mut self, pivot: Vector3<f32>) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        transform::pivoted_transform(self.position, self.eulers, self.pivot)
    }

    pub fn to_raw(&self, tint: Vector3<f32>) -> InstanceRaw {
        InstanceRaw::new(self.to_matrix(), tint)
    }
}

impl From<Vector3<f32>> for Instance {
    fn from(position: Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub tint: [f32; 3],
}

impl InstanceRaw {
    pub fn new(model: Matrix4<f32>, tint: Vector3<f32>) -> Self {
        Self {
            model: model.into(),
            tint: tint.into(),
        }
    }
}

/**
 * Model matrix as four vec4 columns at locations 5..=8, tint at 9.
 * Locations 0..=2 belong to the mesh vertex.
 */
impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Advance once per instance, not per vertex
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // A mat4 takes up 4 vertex slots as it is technically 4 vec4s.
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{EuclideanSpace, Point3, Transform};

    use super::*;
    use crate::data_structures::model::Vertex;

    #[test]
    fn hinged_instance_uses_pivoted_transform() {
        let instance = Instance::from(Vector3::new(4.0, 0.0, 0.0))
            .with_eulers(Vector3::new(0.0, 90.0, 0.0))
            .with_pivot(Vector3::new(0.0, 0.0, 0.5));
        let hinge = instance
            .to_matrix()
            .transform_point(Point3::new(0.0, 0.0, 0.5))
            .to_vec();
        assert_relative_eq!(hinge, Vector3::new(4.0, 0.0, 0.5), epsilon = 1e-5);
    }

    #[test]
    fn raw_layout_matches_vertex_description() {
        let desc = InstanceRaw::desc();
        assert_eq!(desc.array_stride as usize, std::mem::size_of::<InstanceRaw>());
        assert_eq!(desc.array_stride, 19 * 4);
        assert_eq!(desc.step_mode, wgpu::VertexStepMode::Instance);
    }

    #[test]
    fn raw_keeps_translation_in_last_column() {
        let raw = Instance::from(Vector3::new(1.0, 2.0, 3.0)).to_raw(Vector3::new(1.0, 0.5, 0.0));
        assert_eq!(raw.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(raw.tint, [1.0, 0.5, 0.0]);
    }
}
