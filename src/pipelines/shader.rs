//! Shader programs: a vertex and a fragment stage, their render pipeline,
//! the uniform block and one default texture per texture group.
//!
//! Uniforms are set by name between draws and committed per draw into a
//! slice of one uniform buffer, bound with a dynamic offset. Call
//! [`ShaderProgram::begin_frame`] before the first draw of each frame.

use std::{collections::HashMap, num::NonZeroU64, path::Path};

use cgmath::Matrix4;
use wgpu::naga;

use crate::{
    data_structures::{
        model::{ModelVertex, Vertex},
        skybox::SkyboxVertex,
        texture::Texture,
    },
    error::CompileError,
    pipelines::{
        basic::mk_render_pipeline,
        uniform::{
            self, FRAGMENT, PROGRAM, ProgramLayout, TextureSlot, UNIFORM_GROUP, UniformBlock,
            VERTEX,
        },
    },
    resources::texture::{load_string, texture_bind_group_layout},
};

/// Uniform blocks are committed at multiples of this many bytes, the default
/// `min_uniform_buffer_offset_alignment`.
pub const UNIFORM_ALIGNMENT: u32 = 256;
/// Draws per frame with their own uniform values. Further draws reuse the
/// last slice.
pub const MAX_DRAWS: u32 = 256;

/// Built-in shaders for [`ProgramDescriptor::model`]. Uniforms: `camMatrix`,
/// `model`. Textures: `diffuse0`, `specular0`, `normal0`.
pub const MODEL_VERTEX_SHADER: &str = include_str!("model.vert.wgsl");
pub const MODEL_FRAGMENT_SHADER: &str = include_str!("model.frag.wgsl");
/// Built-in shaders for [`ProgramDescriptor::skybox`]. Uniforms: `view`,
/// `projection`. Texture: `environmentMap`.
pub const SKYBOX_VERTEX_SHADER: &str = include_str!("skybox.vert.wgsl");
pub const SKYBOX_FRAGMENT_SHADER: &str = include_str!("skybox.frag.wgsl");

/// Fixed pipeline state of a program.
#[derive(Clone, Debug)]
pub struct ProgramDescriptor {
    pub label: String,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: Option<wgpu::TextureFormat>,
    pub vertex_layouts: Vec<wgpu::VertexBufferLayout<'static>>,
    pub blend: Option<wgpu::BlendState>,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
}

impl ProgramDescriptor {
    /// Opaque meshes with [`ModelVertex`] input and regular depth testing.
    pub fn model(color_format: wgpu::TextureFormat) -> Self {
        Self {
            label: "Model Program".to_string(),
            color_format,
            depth_format: Some(Texture::DEPTH_FORMAT),
            vertex_layouts: vec![ModelVertex::desc()],
            blend: Some(wgpu::BlendState {
                alpha: wgpu::BlendComponent::REPLACE,
                color: wgpu::BlendComponent::REPLACE,
            }),
            cull_mode: None,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
        }
    }

    /// The inside of a cube drawn at the far plane behind everything else.
    pub fn skybox(color_format: wgpu::TextureFormat) -> Self {
        Self {
            label: "Skybox Program".to_string(),
            vertex_layouts: vec![SkyboxVertex::desc()],
            cull_mode: Some(wgpu::Face::Front),
            depth_write: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            ..Self::model(color_format)
        }
    }
}

#[derive(Debug)]
struct ProgramGpu {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    defaults: Vec<(u32, Texture)>,
    stride: u32,
    cursor: u32,
    overflowed: bool,
}

#[derive(Debug)]
pub struct ShaderProgram {
    label: String,
    uniforms: UniformBlock,
    textures: HashMap<String, TextureSlot>,
    gpu: Option<ProgramGpu>,
}

impl ShaderProgram {
    /// Compile both stages and build the pipeline.
    ///
    /// Compile and link errors are logged with the failing stage and give an
    /// invalid program, see [`is_valid`](Self::is_valid).
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        vertex_src: &str,
        fragment_src: &str,
        desc: &ProgramDescriptor,
    ) -> Self {
        let compiled = uniform::compile_stage(VERTEX, vertex_src, naga::ShaderStage::Vertex)
            .and_then(|vertex| {
                let fragment =
                    uniform::compile_stage(FRAGMENT, fragment_src, naga::ShaderStage::Fragment)?;
                let layout = uniform::link(&vertex, &fragment)?;
                Ok((vertex, fragment, layout))
            });

        match compiled {
            Ok((vertex, fragment, layout)) => {
                let gpu = ProgramGpu::new(
                    device,
                    queue,
                    desc,
                    &layout,
                    (vertex_src, &vertex.entry_point),
                    (fragment_src, &fragment.entry_point),
                );
                log::debug!(
                    "Program {:?}: {} uniforms, {} textures",
                    desc.label,
                    layout.members.len(),
                    layout.textures.len()
                );
                Self {
                    label: desc.label.clone(),
                    uniforms: UniformBlock::from_layout(&layout),
                    textures: layout
                        .textures
                        .into_iter()
                        .map(|slot| (slot.name.clone(), slot))
                        .collect(),
                    gpu: Some(gpu),
                }
            }
            Err(e) => {
                log_compile_error(&desc.label, &e);
                Self::invalid(&desc.label)
            }
        }
    }

    /// Read both stages from disk and compile them.
    pub fn from_files(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        vertex_path: &Path,
        fragment_path: &Path,
        desc: &ProgramDescriptor,
    ) -> Self {
        match (load_string(vertex_path), load_string(fragment_path)) {
            (Ok(vertex_src), Ok(fragment_src)) => {
                Self::new(device, queue, &vertex_src, &fragment_src, desc)
            }
            (Err(e), _) | (_, Err(e)) => {
                log::error!("Failed to read shader of {:?}: {}", desc.label, e);
                Self::invalid(&desc.label)
            }
        }
    }

    fn invalid(label: &str) -> Self {
        Self {
            label: label.to_string(),
            uniforms: UniformBlock::default(),
            textures: HashMap::new(),
            gpu: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_valid(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn uniforms(&self) -> &UniformBlock {
        &self.uniforms
    }

    /// Bind group of the texture named `name` in the shader.
    pub fn texture_group(&self, name: &str) -> Option<u32> {
        self.textures.get(name).map(|slot| slot.group)
    }

    /// Restart uniform slices at the beginning of the buffer.
    pub fn begin_frame(&mut self) {
        if let Some(gpu) = &mut self.gpu {
            gpu.cursor = 0;
        }
    }

    /// Set the pipeline and the default texture of every texture group.
    /// Returns false for an invalid program.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) -> bool {
        let Some(gpu) = &self.gpu else {
            return false;
        };
        render_pass.set_pipeline(&gpu.pipeline);
        for (group, texture) in &gpu.defaults {
            if let Some(bind_group) = &texture.bind_group {
                render_pass.set_bind_group(*group, bind_group, &[]);
            }
        }
        true
    }

    /// Upload the current uniform values into a fresh slice and bind it.
    pub fn commit(&mut self, queue: &wgpu::Queue, render_pass: &mut wgpu::RenderPass<'_>) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        let offset = gpu.cursor * gpu.stride;
        if !self.uniforms.data().is_empty() {
            queue.write_buffer(&gpu.uniform_buffer, offset as u64, self.uniforms.data());
        }
        render_pass.set_bind_group(UNIFORM_GROUP, &gpu.uniform_bind_group, &[offset]);

        if gpu.cursor + 1 < MAX_DRAWS {
            gpu.cursor += 1;
        } else if !gpu.overflowed {
            log::warn!(
                "Program {:?} drew more than {} times in one frame, uniforms of later draws overwrite each other",
                self.label,
                MAX_DRAWS
            );
            gpu.overflowed = true;
        }
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.uniforms.set_bool(name, value);
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.uniforms.set_int(name, value);
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.uniforms.set_float(name, value);
    }

    pub fn set_vec2(&mut self, name: &str, value: [f32; 2]) {
        self.uniforms.set_vec2(name, value);
    }

    pub fn set_vec3(&mut self, name: &str, value: [f32; 3]) {
        self.uniforms.set_vec3(name, value);
    }

    pub fn set_vec4(&mut self, name: &str, value: [f32; 4]) {
        self.uniforms.set_vec4(name, value);
    }

    pub fn set_mat4(&mut self, name: &str, value: &Matrix4<f32>) {
        self.uniforms.set_mat4(name, value);
    }
}

fn log_compile_error(label: &str, error: &CompileError) {
    let stage = match error {
        CompileError::Parse { stage, .. }
        | CompileError::Validation { stage, .. }
        | CompileError::MissingEntryPoint { stage } => stage,
        CompileError::Link(_) => PROGRAM,
    };
    log::error!("Shader program {:?} failed at {}: {}", label, stage, error);
}

impl ProgramGpu {
    fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        desc: &ProgramDescriptor,
        layout: &ProgramLayout,
        vertex: (&str, &str),
        fragment: (&str, &str),
    ) -> Self {
        let stride = layout.block_size.max(16).next_multiple_of(UNIFORM_ALIGNMENT);
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} Uniform Buffer", desc.label)),
            size: (stride * MAX_DRAWS) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(layout.block_size as u64),
                },
                count: None,
            }],
            label: Some("uniform_bind_group_layout"),
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: NonZeroU64::new(stride as u64),
                }),
            }],
            label: Some("uniform_bind_group"),
        });

        let texture_layouts = layout
            .textures
            .iter()
            .map(|slot| texture_bind_group_layout(device, slot.view_dimension))
            .collect::<Vec<_>>();
        let bind_group_layouts = std::iter::once(&uniform_layout)
            .chain(texture_layouts.iter())
            .collect::<Vec<_>>();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", desc.label)),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Vertex Shader", desc.label)),
            source: wgpu::ShaderSource::Wgsl(vertex.0.into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Fragment Shader", desc.label)),
            source: wgpu::ShaderSource::Wgsl(fragment.0.into()),
        });
        let pipeline = mk_render_pipeline(
            device,
            &pipeline_layout,
            desc,
            (&vertex_module, vertex.1),
            (&fragment_module, fragment.1),
        );

        let defaults = layout
            .textures
            .iter()
            .map(|slot| (slot.group, default_texture(device, queue, slot)))
            .collect();

        Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            defaults,
            stride,
            cursor: 0,
            overflowed: false,
        }
    }
}

/// White for colour maps, flat for normal maps, black for cubemaps.
fn default_texture(device: &wgpu::Device, queue: &wgpu::Queue, slot: &TextureSlot) -> Texture {
    match slot.view_dimension {
        wgpu::TextureViewDimension::Cube => {
            Texture::create_solid(device, queue, [0, 0, 0, 255], slot.view_dimension, &slot.name)
        }
        _ if slot.name.starts_with("normal") => Texture::create_default_normal_map(device, queue),
        _ => Texture::create_solid(device, queue, [255, 255, 255, 255], slot.view_dimension, &slot.name),
    }
}
