use std::path::Path;

use image::RgbaImage;

use crate::{
    data_structures::texture::{Texture, create_texture_bind_group},
    error::DecodeError,
    resources::texture::decode_file,
};

/// Six decoded faces of equal size.
#[derive(Debug)]
pub struct CubemapFaces {
    faces: Vec<RgbaImage>,
}

impl CubemapFaces {
    /// Decode the faces in layer order: +X, -X, +Y, -Y, +Z, -Z.
    pub fn load(paths: [&Path; 6]) -> Result<Self, DecodeError> {
        let faces = paths
            .iter()
            .map(|path| decode_file(path))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_images(faces)
    }

    /// Check that there are six faces sharing one size.
    pub fn from_images(faces: Vec<RgbaImage>) -> Result<Self, DecodeError> {
        let expected = faces.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        if faces.len() != 6 {
            return Err(DecodeError::FaceSizeMismatch {
                face: faces.len(),
                expected,
                actual: (0, 0),
            });
        }
        if let Some((face, actual)) = faces
            .iter()
            .map(|f| f.dimensions())
            .enumerate()
            .find(|(_, size)| *size != expected)
        {
            return Err(DecodeError::FaceSizeMismatch {
                face,
                expected,
                actual,
            });
        }
        Ok(Self { faces })
    }

    pub fn size(&self) -> (u32, u32) {
        self.faces[0].dimensions()
    }
}

/// A cube texture, or nothing if its faces failed to load.
#[derive(Debug)]
pub struct Cubemap {
    texture: Option<Texture>,
}

impl Cubemap {
    /// Decode and upload the faces, logging and returning an invalid cubemap
    /// on failure.
    pub fn load(device: &wgpu::Device, queue: &wgpu::Queue, paths: [&Path; 6]) -> Self {
        match CubemapFaces::load(paths) {
            Ok(faces) => Self::upload(device, queue, &faces),
            Err(e) => {
                log::warn!("Failed to load cubemap: {}", e);
                Self { texture: None }
            }
        }
    }

    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, faces: &CubemapFaces) -> Self {
        let (width, height) = faces.size();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 6,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("cubemap"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.faces.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                },
                face,
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

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
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
        let bind_group = create_texture_bind_group(
            device,
            &view,
            &sampler,
            wgpu::TextureViewDimension::Cube,
            "cubemap",
        );

        Self {
            texture: Some(Texture {
                texture,
                view,
                sampler: Some(sampler),
                bind_group: Some(bind_group),
            }),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.texture.is_some()
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
