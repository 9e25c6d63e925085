//! Meshes, materials and the vertex layout shared by every pipeline.
//!
//! Geometry is built procedurally on the CPU as [`MeshData`] and uploaded once
//! into a [`Mesh`]. Asset file parsing is left to the caller.

use cgmath::Vector3;
use wgpu::util::DeviceExt;

use crate::data_structures::texture;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// CPU-side triangle list, counter-clockwise front faces.
#[derive(Clone, Debug)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

// (normal, u, v) with u × v = normal
const CUBE_FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
];

const QUAD_CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

impl MeshData {
    /// Flat quad in the YZ plane facing +X, centred on the origin.
    ///
    /// Billboards use this together with [`crate::transform::facing_eulers`].
    pub fn quad(name: &str, width: f32, height: f32) -> Self {
        let vertices = QUAD_CORNERS
            .iter()
            .map(|&(su, sv)| ModelVertex {
                position: [0.0, su * width * 0.5, sv * height * 0.5],
                tex_coords: [(su + 1.0) * 0.5, (1.0 - sv) * 0.5],
                normal: [1.0, 0.0, 0.0],
            })
            .collect();
        Self {
            name: name.to_string(),
            vertices,
            indices: QUAD_INDICES.to_vec(),
        }
    }

    /// Axis aligned box centred on the origin with per-face normals.
    pub fn cuboid(name: &str, size: Vector3<f32>) -> Self {
        let half = size * 0.5;
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in CUBE_FACES {
            let base = vertices.len() as u32;
            for (su, sv) in QUAD_CORNERS {
                let position = [
                    (normal[0] + u[0] * su + v[0] * sv) * half.x,
                    (normal[1] + u[1] * su + v[1] * sv) * half.y,
                    (normal[2] + u[2] * su + v[2] * sv) * half.z,
                ];
                vertices.push(ModelVertex {
                    position,
                    tex_coords: [(su + 1.0) * 0.5, (1.0 - sv) * 0.5],
                    normal,
                });
            }
            indices.extend(QUAD_INDICES.iter().map(|i| base + i));
        }
        Self {
            name: name.to_string(),
            vertices,
            indices,
        }
    }

    /// Unit cube around the camera. Drawn without culling, sampled by direction.
    pub fn sky_cube() -> Self {
        Self::cuboid("skybox", Vector3::new(2.0, 2.0, 2.0))
    }
}

/// Uploaded mesh, bound once per render kind per pass.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl Mesh {
    pub fn new(device: &wgpu::Device, data: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", data.name)),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", data.name)),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: data.name.clone(),
            vertex_buffer,
            index_buffer,
            num_elements: data.indices.len() as u32,
        }
    }
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub diffuse_texture: texture::Texture,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse_texture: texture::Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let sampler = diffuse_texture
            .sampler
            .clone()
            .unwrap_or_else(|| texture::create_default_sampler(device));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some(name),
        });
        Self {
            name: name.to_string(),
            diffuse_texture,
            bind_group,
        }
    }
}

/// Texture + sampler layout of group 1. Cube view dimension for the skybox.
pub fn material_layout(
    device: &wgpu::Device,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}
