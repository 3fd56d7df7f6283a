//! WGSL reflection and the CPU side of a program's uniforms.
//!
//! Shader stages are parsed and validated with the naga version wgpu itself
//! uses. Uniforms live in a single struct at `@group(0) @binding(0)`; every
//! other bind group holds one texture at binding 0 and its sampler at
//! binding 1.

use std::collections::HashMap;

use cgmath::Matrix4;
use wgpu::naga;

use crate::error::CompileError;

pub const VERTEX: &str = "VERTEX";
pub const FRAGMENT: &str = "FRAGMENT";
pub const PROGRAM: &str = "PROGRAM";

/// Bind group of the uniform block.
pub const UNIFORM_GROUP: u32 = 0;

/// Byte range of one member of the uniform block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformLocation {
    pub offset: u32,
    pub size: u32,
}

/// A texture declared by a shader stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureSlot {
    pub name: String,
    pub group: u32,
    pub view_dimension: wgpu::TextureViewDimension,
}

/// One validated shader stage.
#[derive(Debug)]
pub struct CompiledStage {
    pub stage: &'static str,
    pub module: naga::Module,
    pub entry_point: String,
}

/// What both stages of a program declare, merged.
#[derive(Debug, Default)]
pub struct ProgramLayout {
    pub members: HashMap<String, UniformLocation>,
    pub block_size: u32,
    pub textures: Vec<TextureSlot>,
}

/// Parse and validate `source`, and find its entry point for `shader_stage`.
pub fn compile_stage(
    stage: &'static str,
    source: &str,
    shader_stage: naga::ShaderStage,
) -> Result<CompiledStage, CompileError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| CompileError::Parse {
        stage,
        message: e.emit_to_string(source),
    })?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| CompileError::Validation {
        stage,
        message: error_chain(e.as_inner()),
    })?;

    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == shader_stage)
        .map(|ep| ep.name.clone())
        .ok_or(CompileError::MissingEntryPoint { stage })?;

    Ok(CompiledStage {
        stage,
        module,
        entry_point,
    })
}

/// Check that the stages fit together and merge what they declare.
pub fn link(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<ProgramLayout, CompileError> {
    let outputs = entry_point(vertex)
        .and_then(|ep| ep.function.result.as_ref())
        .map(|result| binding_locations(&vertex.module, result.ty, result.binding.as_ref()))
        .unwrap_or_default();
    let inputs = entry_point(fragment)
        .map(|ep| {
            ep.function
                .arguments
                .iter()
                .flat_map(|arg| binding_locations(&fragment.module, arg.ty, arg.binding.as_ref()))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    if let Some(missing) = inputs.iter().find(|location| !outputs.contains(location)) {
        return Err(CompileError::Link(format!(
            "fragment input @location({}) is not written by the vertex stage",
            missing
        )));
    }

    let mut layout = ProgramLayout::default();
    for stage in [vertex, fragment] {
        reflect_uniforms(stage, &mut layout)?;
        reflect_textures(stage, &mut layout)?;
    }

    layout.textures.sort_by_key(|slot| slot.group);
    for (expected, slot) in (UNIFORM_GROUP + 1..).zip(&layout.textures) {
        if slot.group != expected {
            return Err(CompileError::Link(format!(
                "texture {:?} is in group {}, expected group {}",
                slot.name, slot.group, expected
            )));
        }
    }
    Ok(layout)
}

/// Compile and link without touching a GPU.
pub fn reflect_program(vertex_src: &str, fragment_src: &str) -> Result<ProgramLayout, CompileError> {
    let vertex = compile_stage(VERTEX, vertex_src, naga::ShaderStage::Vertex)?;
    let fragment = compile_stage(FRAGMENT, fragment_src, naga::ShaderStage::Fragment)?;
    link(&vertex, &fragment)
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn entry_point(stage: &CompiledStage) -> Option<&naga::EntryPoint> {
    stage
        .module
        .entry_points
        .iter()
        .find(|ep| ep.name == stage.entry_point)
}

fn binding_locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
) -> Vec<u32> {
    match binding {
        Some(naga::Binding::Location { location, .. }) => vec![*location],
        Some(naga::Binding::BuiltIn(_)) => Vec::new(),
        None => match &module.types[ty].inner {
            naga::TypeInner::Struct { members, .. } => members
                .iter()
                .filter_map(|member| match &member.binding {
                    Some(naga::Binding::Location { location, .. }) => Some(*location),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        },
    }
}

fn reflect_uniforms(stage: &CompiledStage, layout: &mut ProgramLayout) -> Result<(), CompileError> {
    let module = &stage.module;
    for (_, var) in module.global_variables.iter() {
        if var.space != naga::AddressSpace::Uniform {
            continue;
        }
        let name = var.name.clone().unwrap_or_default();
        match &var.binding {
            Some(rb) if rb.group == UNIFORM_GROUP && rb.binding == 0 => {}
            _ => {
                return Err(CompileError::Link(format!(
                    "uniform {:?} in {} must be declared at @group(0) @binding(0)",
                    name, stage.stage
                )));
            }
        }

        let ty = &module.types[var.ty];
        let members = match &ty.inner {
            naga::TypeInner::Struct { members, .. } => members
                .iter()
                .map(|m| {
                    (
                        m.name.clone().unwrap_or_default(),
                        UniformLocation {
                            offset: m.offset,
                            size: module.types[m.ty].inner.size(module.to_ctx()),
                        },
                    )
                })
                .collect::<Vec<_>>(),
            inner => vec![(
                name,
                UniformLocation {
                    offset: 0,
                    size: inner.size(module.to_ctx()),
                },
            )],
        };

        for (member, location) in members {
            match layout.members.get(&member) {
                Some(existing) if *existing != location => {
                    return Err(CompileError::Link(format!(
                        "uniform {:?} has a different layout in {}",
                        member, stage.stage
                    )));
                }
                _ => {
                    layout.members.insert(member, location);
                }
            }
        }
        layout.block_size = layout.block_size.max(ty.inner.size(module.to_ctx()));
    }
    Ok(())
}

fn reflect_textures(stage: &CompiledStage, layout: &mut ProgramLayout) -> Result<(), CompileError> {
    let module = &stage.module;
    for (_, var) in module.global_variables.iter() {
        let Some(rb) = &var.binding else { continue };
        if rb.group == UNIFORM_GROUP {
            continue;
        }
        let name = var.name.clone().unwrap_or_default();
        match &module.types[var.ty].inner {
            naga::TypeInner::Image { dim, arrayed, .. } if rb.binding == 0 => {
                let view_dimension = match (dim, arrayed) {
                    (naga::ImageDimension::D2, false) => wgpu::TextureViewDimension::D2,
                    (naga::ImageDimension::Cube, false) => wgpu::TextureViewDimension::Cube,
                    _ => {
                        return Err(CompileError::Link(format!(
                            "texture {:?} must be a texture_2d or texture_cube",
                            name
                        )));
                    }
                };
                let slot = TextureSlot {
                    name,
                    group: rb.group,
                    view_dimension,
                };
                match layout.textures.iter().find(|t| t.group == slot.group) {
                    Some(existing) if *existing != slot => {
                        return Err(CompileError::Link(format!(
                            "group {} is declared as both {:?} and {:?}",
                            slot.group, existing.name, slot.name
                        )));
                    }
                    Some(_) => {}
                    None => layout.textures.push(slot),
                }
            }
            naga::TypeInner::Sampler { comparison: false } if rb.binding == 1 => {}
            _ => {
                return Err(CompileError::Link(format!(
                    "{:?} at @group({}) @binding({}) in {} is not a texture at binding 0 or a sampler at binding 1",
                    name, rb.group, rb.binding, stage.stage
                )));
            }
        }
    }
    Ok(())
}

/// Staging copy of the uniform block plus the name lookup cache.
///
/// Lookups are cached on first use, including names the program does not
/// declare, so a missing uniform costs one map lookup per set.
#[derive(Debug, Default)]
pub struct UniformBlock {
    members: HashMap<String, UniformLocation>,
    locations: HashMap<String, Option<UniformLocation>>,
    data: Vec<u8>,
}

impl UniformBlock {
    pub fn new(members: HashMap<String, UniformLocation>, block_size: u32) -> Self {
        Self {
            members,
            locations: HashMap::new(),
            data: vec![0; block_size.next_multiple_of(4) as usize],
        }
    }

    pub fn from_layout(layout: &ProgramLayout) -> Self {
        Self::new(layout.members.clone(), layout.block_size)
    }

    /// Cached location of `name`, `None` if the program has no such uniform.
    pub fn location(&mut self, name: &str) -> Option<UniformLocation> {
        if let Some(location) = self.locations.get(name) {
            return *location;
        }
        let location = self.members.get(name).copied();
        if location.is_none() {
            log::warn!("Uniform {:?} not found", name);
        }
        self.locations.insert(name.to_string(), location);
        location
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.locations.contains_key(name)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn write(&mut self, name: &str, bytes: &[u8]) {
        let Some(location) = self.location(name) else {
            return;
        };
        if bytes.len() > location.size as usize {
            log::warn!(
                "Uniform {:?} holds {} bytes, {} given",
                name,
                location.size,
                bytes.len()
            );
            return;
        }
        let start = location.offset as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Booleans are stored as `u32`, WGSL has no host-shareable `bool`.
    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.write(name, bytemuck::bytes_of(&(value as u32)));
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.write(name, bytemuck::bytes_of(&value));
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.write(name, bytemuck::bytes_of(&value));
    }

    pub fn set_vec2(&mut self, name: &str, value: [f32; 2]) {
        self.write(name, bytemuck::cast_slice(&value));
    }

    pub fn set_vec3(&mut self, name: &str, value: [f32; 3]) {
        self.write(name, bytemuck::cast_slice(&value));
    }

    pub fn set_vec4(&mut self, name: &str, value: [f32; 4]) {
        self.write(name, bytemuck::cast_slice(&value));
    }

    pub fn set_mat4(&mut self, name: &str, value: &Matrix4<f32>) {
        let columns: [[f32; 4]; 4] = (*value).into();
        self.write(name, bytemuck::cast_slice(&columns));
    }

    /// Little-endian `f32` at `offset`, for inspecting the staging data.
    pub fn read_f32(&self, offset: u32) -> Option<f32> {
        let start = offset as usize;
        let bytes = self.data.get(start..start + 4)?;
        Some(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
