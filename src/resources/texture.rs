use std::path::Path;

use image::{ImageFormat, RgbaImage, load_from_memory_with_format};

use crate::error::DecodeError;

/// Bind group layout shared by every sampled texture: the view at binding 0
/// and its filtering sampler at binding 1.
///
/// wgpu treats layouts built from identical descriptors as compatible, so
/// textures, cubemaps and shader programs each create their own.
pub fn texture_bind_group_layout(
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
        label: Some("texture_bind_group_layout"),
    })
}

pub fn load_binary(path: &Path) -> Result<Vec<u8>, DecodeError> {
    std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_string(path: &Path) -> Result<String, DecodeError> {
    std::fs::read_to_string(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode encoded image bytes (PNG, JPEG, ...) into RGBA8 pixels.
///
/// `format` is an optional extension style hint such as `"png"`. Without a
/// usable hint the format is guessed from the bytes.
pub fn decode_bytes(
    bytes: &[u8],
    label: &str,
    format: Option<&str>,
) -> Result<RgbaImage, DecodeError> {
    let img = match format.and_then(ImageFormat::from_extension) {
        Some(fmt) => load_from_memory_with_format(bytes, fmt),
        None => image::load_from_memory(bytes),
    }
    .map_err(|source| DecodeError::Image {
        label: label.to_string(),
        source,
    })?;
    Ok(img.to_rgba8())
}

pub fn decode_file(path: &Path) -> Result<RgbaImage, DecodeError> {
    let data = load_binary(path)?;
    let format = path.extension().and_then(|ext| ext.to_str());
    decode_bytes(&data, &path.to_string_lossy(), format)
}

/// Decoded pixels of one texture, or nothing if decoding failed.
///
/// This is the CPU half of a texture. Sources are shared between meshes
/// through `Rc` and uploaded once into a
/// [`TextureHandle`](crate::data_structures::texture::TextureHandle).
#[derive(Debug)]
pub struct TextureSource {
    pub label: String,
    pub pixels: Option<RgbaImage>,
}

impl TextureSource {
    pub fn from_file(path: &Path) -> Self {
        let label = path.to_string_lossy().into_owned();
        match decode_file(path) {
            Ok(pixels) => Self {
                label,
                pixels: Some(pixels),
            },
            Err(e) => {
                log::warn!("Failed to load texture {}: {}", label, e);
                Self::invalid(label)
            }
        }
    }

    pub fn from_bytes(bytes: &[u8], label: &str, format: Option<&str>) -> Self {
        match decode_bytes(bytes, label, format) {
            Ok(pixels) => Self {
                label: label.to_string(),
                pixels: Some(pixels),
            },
            Err(e) => {
                log::warn!("Failed to load embedded texture {}: {}", label, e);
                Self::invalid(label)
            }
        }
    }

    pub fn invalid(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pixels: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.pixels.is_some()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.pixels.as_ref().map(|p| p.dimensions())
    }
}
