//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources,
//! and helpers for the depth buffer, the shadow map, solid colour fallbacks,
//! decoded images and the skybox cubemap.

use image::GenericImageView;

use crate::error::RenderError;

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create the main depth buffer.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Create a depth target for the shadow pass together with its comparison sampler.
    ///
    /// The size is checked against the device limits first; a target that cannot
    /// be created in full is reported as [`RenderError::IncompleteTarget`] instead of
    /// producing a texture that would read back garbage depth.
    ///
    /// With `clamp_to_border` the sampler returns an opaque white border, so every
    /// lookup outside of the light frustum reads as lit. Without it the standard
    /// shader performs the same range check itself.
    pub fn create_shadow_map(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        clamp_to_border: bool,
    ) -> Result<Self, RenderError> {
        check_target_size(width, height, device.limits().max_texture_dimension_2d)?;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_map"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_shadow_sampler(device, clamp_to_border));

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }

    /// Create a texture filled with a single RGBA colour.
    ///
    /// Used as the default material and as the skybox when no faces are supplied.
    pub fn create_solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
    ) -> Texture {
        let size = wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_layer(queue, &texture, 0, &rgba, 1, 1);

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Texture {
            texture,
            view,
            sampler: Some(create_default_sampler(device)),
        }
    }

    /// Create a depth texture that is never rendered to, bound in place of the
    /// shadow map while no shadow target exists.
    ///
    /// Its single texel is cleared to 1.0 by the caller's first render pass.
    pub fn create_fallback_shadow_map(device: &wgpu::Device, clamp_to_border: bool) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("fallback_shadow_map"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Texture {
            texture,
            view,
            sampler: Some(create_shadow_sampler(device, clamp_to_border)),
        }
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
    ) -> Texture {
        let dimensions = img.dimensions();
        let rgba = img.to_rgba8();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_layer(queue, &texture, 0, &rgba, dimensions.0, dimensions.1);

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: Some(create_default_sampler(device)),
        }
    }

    /// Create a cubemap from six square faces in `+X, -X, +Y, -Y, +Z, -Z` order.
    ///
    /// Faces that do not match the size of the first one are resized to it.
    pub fn cubemap(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[image::DynamicImage; 6],
        label: &str,
    ) -> Texture {
        let (width, height) = faces[0].dimensions();
        let rgba: Vec<image::RgbaImage> = faces
            .iter()
            .map(|face| {
                if face.dimensions() == (width, height) {
                    face.to_rgba8()
                } else {
                    face.resize_exact(width, height, image::imageops::FilterType::Triangle)
                        .to_rgba8()
                }
            })
            .collect();
        let layers: Vec<&[u8]> = rgba.iter().map(|face| face.as_raw().as_slice()).collect();
        Self::cubemap_from_layers(device, queue, &layers, width, height, label)
    }

    /// Cubemap with every face set to the same colour.
    pub fn solid_cubemap(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
    ) -> Texture {
        let layers = [&rgba[..]; 6];
        Self::cubemap_from_layers(device, queue, &layers, 1, 1, label)
    }

    fn cubemap_from_layers(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layers: &[&[u8]],
        width: u32,
        height: u32,
        label: &str,
    ) -> Texture {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        for (layer, data) in layers.iter().enumerate() {
            write_layer(queue, &texture, layer as u32, data, width, height);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Texture {
            texture,
            view,
            sampler: Some(sampler),
        }
    }
}

fn write_layer(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    layer: u32,
    data: &[u8],
    width: u32,
    height: u32,
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

/// Rejects shadow target sizes the device cannot back with a complete texture.
pub fn check_target_size(width: u32, height: u32, max_dimension: u32) -> Result<(), RenderError> {
    let reason = if width == 0 || height == 0 {
        "zero sized".to_string()
    } else if width > max_dimension || height > max_dimension {
        format!("exceeds the device limit of {max_dimension}")
    } else {
        return Ok(());
    };
    Err(RenderError::IncompleteTarget {
        width,
        height,
        reason,
    })
}

/// Comparison sampler for the shadow map: nearest filtering, white outside the map.
pub fn create_shadow_sampler(device: &wgpu::Device, clamp_to_border: bool) -> wgpu::Sampler {
    let (address_mode, border_color) = if clamp_to_border {
        (
            wgpu::AddressMode::ClampToBorder,
            Some(wgpu::SamplerBorderColor::OpaqueWhite),
        )
    } else {
        (wgpu::AddressMode::ClampToEdge, None)
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("shadow_sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        compare: Some(wgpu::CompareFunction::LessEqual),
        border_color,
        ..Default::default()
    })
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}
