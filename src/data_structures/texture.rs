//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources,
//! and [`TextureHandle`], the shareable and possibly invalid texture that meshes
//! reference. Decoding happens beforehand in
//! [`resources::texture`](crate::resources::texture).

use std::fmt;

use image::RgbaImage;

use crate::resources::texture::{TextureSource, texture_bind_group_layout};

/// Semantic role of a texture on a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Specular,
    Normal,
}

impl TextureKind {
    /// Prefix of the shader texture binding this kind is bound to, e.g. `diffuse0`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TextureKind::Diffuse => "diffuse",
            TextureKind::Specular => "specular",
            TextureKind::Normal => "normal",
        }
    }

    /// Normal maps hold vectors, not colours, and are sampled without sRGB decoding.
    pub fn is_linear(&self) -> bool {
        matches!(self, TextureKind::Normal)
    }
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A GPU texture with a view, a sampler and, for sampled textures, the bind
/// group that exposes both to a shader.
///
/// Typically created via [`from_image`](Self::from_image) or
/// [`create_depth_texture`](Self::create_depth_texture).
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
    pub bind_group: Option<wgpu::BindGroup>,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
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
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        }));

        Self {
            texture,
            view,
            sampler,
            bind_group: None,
        }
    }

    /// A 1x1 texture of a single colour, used where a shader expects a texture
    /// that the mesh did not provide.
    ///
    /// `view_dimension` may be `D2` or `Cube`; a cube gets the colour on all
    /// six faces.
    pub fn create_solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        colour: [u8; 4],
        view_dimension: wgpu::TextureViewDimension,
        label: &str,
    ) -> Texture {
        let layers = match view_dimension {
            wgpu::TextureViewDimension::Cube => 6,
            _ => 1,
        };
        let size = wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: layers,
        };
        let data: Vec<u8> = colour
            .iter()
            .cycle()
            .take(4 * layers as usize)
            .copied()
            .collect();

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(view_dimension),
            ..Default::default()
        });
        let sampler = create_default_sampler(device);
        let bind_group = create_texture_bind_group(device, &view, &sampler, view_dimension, label);
        Texture {
            texture,
            view,
            sampler: Some(sampler),
            bind_group: Some(bind_group),
        }
    }

    /// Create a default normal map (neutral blue, representing no deformation).
    pub fn create_default_normal_map(device: &wgpu::Device, queue: &wgpu::Queue) -> Texture {
        Self::create_solid(
            device,
            queue,
            [127, 127, 255, 255],
            wgpu::TextureViewDimension::D2,
            "default normal map",
        )
    }

    /// Upload decoded pixels into a sampled 2D texture.
    ///
    /// `is_normal_map` toggles between sRGB (false) and linear (true) color space.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &RgbaImage,
        label: Option<&str>,
        is_normal_map: bool,
    ) -> Self {
        let dimensions = rgba.dimensions();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let format = if is_normal_map {
            wgpu::TextureFormat::Rgba8Unorm
        } else {
            wgpu::TextureFormat::Rgba8UnormSrgb
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_default_sampler(device);
        let bind_group = create_texture_bind_group(
            device,
            &view,
            &sampler,
            wgpu::TextureViewDimension::D2,
            label.unwrap_or("texture"),
        );

        Self {
            texture,
            view,
            sampler: Some(sampler),
            bind_group: Some(bind_group),
        }
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

pub fn create_texture_bind_group(
    device: &wgpu::Device,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    view_dimension: wgpu::TextureViewDimension,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &texture_bind_group_layout(device, view_dimension),
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some(label),
    })
}

/// One GPU texture shared between every mesh that references it, or nothing
/// when its source image failed to decode.
///
/// Binding an invalid handle is a no-op, so a broken image never stops the
/// rest of a model from drawing.
#[derive(Debug)]
pub struct TextureHandle {
    label: String,
    texture: Option<Texture>,
}

impl TextureHandle {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: &TextureSource,
        kind: TextureKind,
    ) -> Self {
        let texture = source.pixels.as_ref().map(|pixels| {
            Texture::from_image(
                device,
                queue,
                pixels,
                Some(&source.label),
                kind.is_linear(),
            )
        });
        Self {
            label: source.label.clone(),
            texture,
        }
    }

    pub fn invalid(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            texture: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_valid(&self) -> bool {
        self.texture.is_some()
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    /// Bind to bind group `group`. Returns false and binds nothing if invalid.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>, group: u32) -> bool {
        match self.texture.as_ref().and_then(|t| t.bind_group.as_ref()) {
            Some(bind_group) => {
                render_pass.set_bind_group(group, bind_group, &[]);
                true
            }
            None => false,
        }
    }
}
