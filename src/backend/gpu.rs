use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::{
    backend::{RenderBackend, upload},
    commands::{Command, CommandList, DepthState, PassTarget},
    context::Context,
    data_structures::{
        instance::InstanceRaw,
        model::{self, Material, Mesh, MeshData, ModelVertex, Vertex},
        texture::{self, Texture},
    },
    error::{RenderError, Result},
    pipelines::{PipelineKind, mk_render_pipeline, registry::PipelineRegistry},
    render::{MaterialId, MeshId},
};

/// Depth target of the shadow pass together with the group 2 bind group
/// the standard pipeline samples it through.
#[derive(Debug)]
pub struct GpuShadowTarget {
    pub texture: Texture,
    bind_group: wgpu::BindGroup,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
struct Layouts {
    frame: wgpu::BindGroupLayout,
    material: wgpu::BindGroupLayout,
    sky_material: wgpu::BindGroupLayout,
    shadow: wgpu::BindGroupLayout,
}

#[derive(Debug)]
struct FrameBlock {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Everything built from one registry generation.
#[derive(Debug)]
struct Pipelines {
    generation: u32,
    variants: HashMap<(PipelineKind, DepthState), wgpu::RenderPipeline>,
    blocks: Vec<FrameBlock>,
}

#[derive(Debug)]
struct InstanceBuffer {
    buffer: wgpu::Buffer,
    capacity: usize,
}

/// wgpu implementation of [`RenderBackend`].
#[derive(Debug)]
pub struct GpuBackend {
    ctx: Context,
    layouts: Layouts,
    pipelines: Option<Pipelines>,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    instances: Option<InstanceBuffer>,
    fallback_shadow: GpuShadowTarget,
    fallback_cleared: bool,
}

impl GpuBackend {
    pub fn new(ctx: Context) -> Self {
        let device = &ctx.device;
        let layouts = Layouts {
            frame: frame_layout(device),
            material: model::material_layout(device, wgpu::TextureViewDimension::D2),
            sky_material: model::material_layout(device, wgpu::TextureViewDimension::Cube),
            shadow: shadow_layout(device),
        };
        let fallback = Texture::create_fallback_shadow_map(device, ctx.clamp_to_border);
        let fallback_shadow = shadow_target(device, &layouts.shadow, fallback, 1, 1);

        Self {
            ctx,
            layouts,
            pipelines: None,
            meshes: Vec::new(),
            materials: Vec::new(),
            instances: None,
            fallback_shadow,
            fallback_cleared: false,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn add_mesh(&mut self, data: &MeshData) -> MeshId {
        self.meshes.push(Mesh::new(&self.ctx.device, data));
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_material(&mut self, name: &str, texture: Texture) -> MaterialId {
        let material = Material::new(&self.ctx.device, name, texture, &self.layouts.material);
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Register a cubemap texture for the skybox pipeline.
    pub fn add_sky_material(&mut self, name: &str, cubemap: Texture) -> MaterialId {
        let material = Material::new(&self.ctx.device, name, cubemap, &self.layouts.sky_material);
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Material from a decoded image, e.g. a light bulb or prompt with alpha.
    pub fn add_image_material(&mut self, name: &str, img: &image::DynamicImage) -> MaterialId {
        let texture = Texture::from_image(&self.ctx.device, &self.ctx.queue, img, Some(name));
        self.add_material(name, texture)
    }

    /// Skybox material from six faces in `+X, -X, +Y, -Y, +Z, -Z` order.
    pub fn add_sky_faces(&mut self, name: &str, faces: &[image::DynamicImage; 6]) -> MaterialId {
        let cubemap = Texture::cubemap(&self.ctx.device, &self.ctx.queue, faces, name);
        self.add_sky_material(name, cubemap)
    }

    /// Solid colour material, handy for markers and prompts without artwork.
    pub fn add_solid_material(&mut self, name: &str, rgba: [u8; 4]) -> MaterialId {
        let texture = Texture::create_solid(&self.ctx.device, &self.ctx.queue, rgba, name);
        self.add_material(name, texture)
    }

    fn pipeline_layout(&self, kind: PipelineKind) -> wgpu::PipelineLayout {
        let layouts: &[&wgpu::BindGroupLayout] = match kind {
            PipelineKind::Standard => &[
                &self.layouts.frame,
                &self.layouts.material,
                &self.layouts.shadow,
            ],
            PipelineKind::Emissive => &[&self.layouts.frame, &self.layouts.material],
            PipelineKind::Skybox => &[&self.layouts.frame, &self.layouts.sky_material],
            PipelineKind::Shadow => &[&self.layouts.frame],
        };
        self.ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{kind:?} Pipeline Layout")),
                bind_group_layouts: layouts,
                push_constant_ranges: &[],
            })
    }

    fn ensure_instance_capacity(&mut self, count: usize) {
        let needed = count.max(1);
        if self
            .instances
            .as_ref()
            .is_some_and(|instances| instances.capacity >= needed)
        {
            return;
        }
        let capacity = needed.next_power_of_two();
        log::debug!("growing instance buffer to {capacity} entries");
        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.instances = Some(InstanceBuffer { buffer, capacity });
    }

    fn clear_fallback(&mut self, encoder: &mut wgpu::CommandEncoder) {
        if self.fallback_cleared {
            return;
        }
        drop(encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Fallback Shadow Clear"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.fallback_shadow.texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        }));
        self.fallback_cleared = true;
    }
}

/// Per pass replay state.
struct Replay<'a> {
    pipelines: &'a Pipelines,
    meshes: &'a [Mesh],
    materials: &'a [Material],
    shadow: &'a wgpu::BindGroup,
    kind: Option<PipelineKind>,
    depth: DepthState,
    mesh: Option<u32>,
}

impl Replay<'_> {
    fn apply_pipeline(&self, pass: &mut wgpu::RenderPass<'_>) {
        let Some(kind) = self.kind else {
            return;
        };
        match self.pipelines.variants.get(&(kind, self.depth)) {
            Some(pipeline) => {
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.pipelines.blocks[kind.index()].bind_group, &[]);
            }
            None => log::warn!("no {kind:?} pipeline for depth state {:?}", self.depth),
        }
    }

    fn run(&mut self, pass: &mut wgpu::RenderPass<'_>, commands: &[Command], next_instance: &mut u32) {
        for command in commands {
            match command {
                Command::SetViewport {
                    x,
                    y,
                    width,
                    height,
                } => pass.set_viewport(
                    *x as f32,
                    *y as f32,
                    *width as f32,
                    *height as f32,
                    0.0,
                    1.0,
                ),
                Command::SetPipeline(kind) => {
                    self.kind = Some(*kind);
                    self.apply_pipeline(pass);
                }
                Command::SetDepth(depth) => {
                    self.depth = *depth;
                    self.apply_pipeline(pass);
                }
                // Already folded into the frame blocks
                Command::SetUniform(..) => {}
                Command::BindShadowMap => pass.set_bind_group(2, self.shadow, &[]),
                Command::BindMaterial(id) => match self.materials.get(id.0) {
                    Some(material) => pass.set_bind_group(1, &material.bind_group, &[]),
                    None => log::warn!("unknown material {id:?}"),
                },
                Command::BindMesh(id) => match self.meshes.get(id.0) {
                    Some(mesh) => {
                        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                        pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        self.mesh = Some(mesh.num_elements);
                    }
                    None => {
                        log::warn!("unknown mesh {id:?}");
                        self.mesh = None;
                    }
                },
                Command::Draw { .. } => {
                    let instance = *next_instance;
                    *next_instance += 1;
                    if let (Some(_), Some(elements)) = (self.kind, self.mesh) {
                        pass.draw_indexed(0..elements, 0, instance..instance + 1);
                    }
                }
            }
        }
    }
}

impl RenderBackend for GpuBackend {
    type ShadowTarget = GpuShadowTarget;

    fn surface_size(&self) -> (u32, u32) {
        self.ctx.size()
    }

    fn create_shadow_target(&mut self, width: u32, height: u32) -> Result<GpuShadowTarget> {
        let texture =
            Texture::create_shadow_map(&self.ctx.device, width, height, self.ctx.clamp_to_border)?;
        Ok(shadow_target(
            &self.ctx.device,
            &self.layouts.shadow,
            texture,
            width,
            height,
        ))
    }

    fn configure_surface(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    fn rebuild_pipelines(&mut self, registry: &PipelineRegistry) -> Result<()> {
        let device = &self.ctx.device;
        let vertex_layouts = [ModelVertex::desc(), InstanceRaw::desc()];
        let mut variants = HashMap::new();
        let mut blocks = Vec::with_capacity(PipelineKind::ALL.len());

        for kind in PipelineKind::ALL {
            let compiled = registry.pipeline(kind);
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(kind.file_name()),
                source: wgpu::ShaderSource::Wgsl(compiled.source.as_str().into()),
            });
            let layout = self.pipeline_layout(kind);
            let color_format = kind.has_fragment().then_some(self.ctx.config.format);
            for &depth in kind.depth_states() {
                let pipeline = mk_render_pipeline(
                    device,
                    &layout,
                    kind,
                    color_format,
                    depth,
                    &vertex_layouts,
                    &shader,
                );
                variants.insert((kind, depth), pipeline);
            }

            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{kind:?} Frame Buffer")),
                contents: &vec![0u8; compiled.block_size as usize],
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.layouts.frame,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
                label: Some(&format!("{kind:?} Frame Bind Group")),
            });
            blocks.push(FrameBlock { buffer, bind_group });
        }

        log::info!(
            "built {} pipeline variants for generation {}",
            variants.len(),
            registry.generation()
        );
        self.pipelines = Some(Pipelines {
            generation: registry.generation(),
            variants,
            blocks,
        });
        Ok(())
    }

    fn execute(
        &mut self,
        commands: &CommandList,
        registry: &PipelineRegistry,
        shadow: Option<&GpuShadowTarget>,
    ) -> Result<()> {
        match &self.pipelines {
            Some(pipelines) if pipelines.generation == registry.generation() => {}
            _ => return Err(RenderError::PipelinesMissing),
        }
        let staged = upload::stage(commands, registry)?;
        self.ensure_instance_capacity(staged.instances.len());

        let output = self.ctx.acquire()?;
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.clear_fallback(&mut encoder);

        let Some(pipelines) = &self.pipelines else {
            return Err(RenderError::PipelinesMissing);
        };
        let Some(instances) = &self.instances else {
            return Err(RenderError::PipelinesMissing);
        };
        for kind in PipelineKind::ALL {
            if let Some(bytes) = staged.block(kind) {
                self.ctx
                    .queue
                    .write_buffer(&pipelines.blocks[kind.index()].buffer, 0, bytes);
            }
        }
        if !staged.instances.is_empty() {
            self.ctx
                .queue
                .write_buffer(&instances.buffer, 0, bytemuck::cast_slice(&staged.instances));
        }

        let shadow_bind_group = shadow
            .map(|target| &target.bind_group)
            .unwrap_or(&self.fallback_shadow.bind_group);
        let mut next_instance = 0u32;
        let mut depth = DepthState::Less;

        for record in commands.passes() {
            let mut replay = Replay {
                pipelines,
                meshes: &self.meshes,
                materials: &self.materials,
                shadow: shadow_bind_group,
                kind: None,
                depth,
                mesh: None,
            };
            let mut pass = match record.target {
                PassTarget::Shadow { .. } => {
                    let Some(target) = shadow else {
                        log::warn!("shadow pass recorded without a shadow target");
                        next_instance += record
                            .commands
                            .iter()
                            .filter(|c| matches!(c, Command::Draw { .. }))
                            .count() as u32;
                        continue;
                    };
                    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Shadow Pass"),
                        color_attachments: &[],
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: &target.texture.view,
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        }),
                        occlusion_query_set: None,
                        timestamp_writes: None,
                    })
                }
                PassTarget::Surface { clear, .. } => {
                    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Main Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &output.view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(clear),
                                store: wgpu::StoreOp::Store,
                            },
                            depth_slice: None,
                        })],
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: &self.ctx.depth_texture.view,
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        }),
                        occlusion_query_set: None,
                        timestamp_writes: None,
                    })
                }
            };
            pass.set_vertex_buffer(1, instances.buffer.slice(..));
            replay.run(&mut pass, &record.commands, &mut next_instance);
            depth = replay.depth;
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn release(&mut self) {
        if self.pipelines.take().is_some() {
            log::debug!("released pipelines");
        }
        self.instances = None;
    }
}

fn frame_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("frame_bind_group_layout"),
    })
}

fn shadow_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("shadow_bind_group_layout"),
    })
}

fn shadow_target(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: Texture,
    width: u32,
    height: u32,
) -> GpuShadowTarget {
    let sampler = texture
        .sampler
        .clone()
        .unwrap_or_else(|| texture::create_shadow_sampler(device, false));
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
        label: Some("shadow_bind_group"),
    });
    GpuShadowTarget {
        texture,
        bind_group,
        width,
        height,
    }
}
