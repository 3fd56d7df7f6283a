//! Drawable meshes and models.
//!
//! A [`Model`] is built in two steps: [`resources::import`](crate::resources::import)
//! walks the scene on the CPU and [`Model::from_imported`] uploads the result.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
    rc::Rc,
};

use cgmath::{Deg, InnerSpace, Matrix4, Quaternion, SquareMatrix, Vector3};

use crate::{
    data_structures::{
        buffer::GeometryBuffer,
        instance::Instance,
        texture::{TextureHandle, TextureKind},
    },
    error::ImportError,
    math::RotationOrder,
    pipelines::shader::ShaderProgram,
    resources::{
        import::{self, ImportOptions, ImportedModel},
        texture::TextureSource,
    },
};

/// Types that can be fed to a vertex shader through a vertex buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl ModelVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x3,
        3 => Float32x2,
    ];
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Axis aligned bounding box. A box that never saw a point is empty, with
/// `min` at +inf and `max` at -inf.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn extend(&mut self, point: [f32; 3]) {
        self.min.x = self.min.x.min(point[0]);
        self.min.y = self.min.y.min(point[1]);
        self.min.z = self.min.z.min(point[2]);
        self.max.x = self.max.x.max(point[0]);
        self.max.y = self.max.y.max(point[1]);
        self.max.z = self.max.z.max(point[2]);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Midpoint of the box, or `None` if it is empty.
    pub fn center(&self) -> Option<Vector3<f32>> {
        (!self.is_empty()).then(|| (self.min + self.max) * 0.5)
    }

    pub fn size(&self) -> Option<Vector3<f32>> {
        (!self.is_empty()).then(|| self.max - self.min)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

/// A texture as seen by one mesh: what it is used for, which slot it got
/// during import, and the handle shared with other meshes.
#[derive(Clone, Debug)]
pub struct MeshTexture {
    pub kind: TextureKind,
    pub slot: u32,
    pub handle: Rc<TextureHandle>,
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    geometry: GeometryBuffer,
    textures: Vec<MeshTexture>,
    transform: Matrix4<f32>,
}

impl Mesh {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
        textures: Vec<MeshTexture>,
    ) -> Self {
        Self {
            name: name.to_string(),
            geometry: GeometryBuffer::new(device, name, vertices, Some(indices)),
            textures,
            transform: Matrix4::identity(),
        }
    }

    pub fn geometry(&self) -> &GeometryBuffer {
        &self.geometry
    }

    pub fn textures(&self) -> &[MeshTexture] {
        &self.textures
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.transform
    }

    pub fn set_model_matrix(&mut self, matrix: Matrix4<f32>) {
        self.transform = matrix;
    }

    pub fn reset_transform(&mut self) {
        self.transform = Matrix4::identity();
    }

    /// Replace the local transform with a plain translation.
    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.transform = Matrix4::from_translation(position);
    }

    /// Append a rotation of `angle` degrees about `axis`.
    pub fn rotate(&mut self, angle: f32, axis: Vector3<f32>) {
        if axis.magnitude2() <= f32::EPSILON {
            return;
        }
        self.transform = self.transform * Matrix4::from_axis_angle(axis.normalize(), Deg(angle));
    }

    /// Append a non-uniform scale.
    pub fn scale(&mut self, scale: Vector3<f32>) {
        self.transform = self.transform * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z);
    }

    /// Bind the textures by shader name (`diffuse0`, `diffuse1`, `specular0`, ...),
    /// commit the program's uniforms and draw.
    ///
    /// Textures the shader does not declare are skipped. Texture groups the
    /// mesh does not fill keep the program's defaults.
    pub fn draw(
        &self,
        queue: &wgpu::Queue,
        render_pass: &mut wgpu::RenderPass<'_>,
        program: &mut ShaderProgram,
    ) {
        if !program.bind(render_pass) {
            log::warn!("Mesh {:?} not drawn: shader program is invalid", self.name);
            return;
        }

        let mut counts: HashMap<TextureKind, u32> = HashMap::new();
        for texture in &self.textures {
            let count = counts.entry(texture.kind).or_insert(0);
            let name = format!("{}{}", texture.kind, count);
            *count += 1;
            match program.texture_group(&name) {
                Some(group) => {
                    if !texture.handle.bind(render_pass, group) {
                        log::debug!("Texture {:?} is invalid, {} keeps its default", texture.handle.label(), name);
                    }
                }
                None => log::debug!("Program has no texture named {}", name),
            }
        }

        program.commit(queue, render_pass);
        self.geometry.draw(render_pass);
    }
}

/// Identity of one GPU upload: the decoded source and whether it is sampled
/// linearly or as sRGB.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UploadKey {
    source: *const TextureSource,
    linear: bool,
}

impl UploadKey {
    pub fn new(source: &Rc<TextureSource>, kind: TextureKind) -> Self {
        Self {
            source: Rc::as_ptr(source),
            linear: kind.is_linear(),
        }
    }
}

/// Meshes sharing one world transform, the textures they reference and their
/// model space bounds.
#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    transform: Instance,
    textures_loaded: HashMap<String, Rc<TextureHandle>>,
    aabb: Aabb,
}

impl Model {
    /// Import the scene at `path` and upload it.
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        options: &ImportOptions,
    ) -> Result<Model, ImportError> {
        let imported = import::import_model(path, options)?;
        Ok(Self::from_imported(device, queue, imported))
    }

    /// Upload an import result. Every decoded texture becomes one GPU texture
    /// per colour space it is used in, no matter how many meshes use it.
    pub fn from_imported(device: &wgpu::Device, queue: &wgpu::Queue, imported: ImportedModel) -> Model {
        // Sources bound at least once as colour data.
        let colour_sources: HashSet<*const TextureSource> = imported
            .meshes
            .iter()
            .flat_map(|data| &data.textures)
            .filter(|binding| !binding.kind.is_linear())
            .map(|binding| Rc::as_ptr(&binding.source))
            .collect();

        let mut uploaded: HashMap<UploadKey, Rc<TextureHandle>> = HashMap::new();
        let mut upload = |source: &Rc<TextureSource>, kind: TextureKind| {
            uploaded
                .entry(UploadKey::new(source, kind))
                .or_insert_with(|| Rc::new(TextureHandle::upload(device, queue, source, kind)))
                .clone()
        };

        let meshes = imported
            .meshes
            .iter()
            .map(|data| {
                let textures = data
                    .textures
                    .iter()
                    .map(|binding| MeshTexture {
                        kind: binding.kind,
                        slot: binding.slot,
                        handle: upload(&binding.source, binding.kind),
                    })
                    .collect();
                Mesh::new(device, &data.name, &data.vertices, &data.indices, textures)
            })
            .collect();

        // The cache holds the colour upload unless a source is only ever a normal map.
        let textures_loaded = imported
            .textures
            .iter()
            .map(|(locator, source)| {
                let used = imported
                    .meshes
                    .iter()
                    .flat_map(|data| &data.textures)
                    .any(|binding| Rc::ptr_eq(&binding.source, source));
                let kind = if used && !colour_sources.contains(&Rc::as_ptr(source)) {
                    TextureKind::Normal
                } else {
                    TextureKind::Diffuse
                };
                (locator.clone(), upload(source, kind))
            })
            .collect();

        Model {
            meshes,
            transform: Instance::new(),
            textures_loaded,
            aabb: imported.aabb,
        }
    }

    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// The texture cache, keyed by locator string.
    pub fn textures(&self) -> &HashMap<String, Rc<TextureHandle>> {
        &self.textures_loaded
    }

    pub fn position(&self) -> Vector3<f32> {
        self.transform.position
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.transform.position = position;
    }

    /// Rotation of `angle` degrees about `axis`.
    pub fn set_rotation(&mut self, angle: f32, axis: Vector3<f32>) {
        self.transform.set_rotation_axis_angle(angle, axis);
    }

    pub fn set_rotation_quat(&mut self, rotation: Quaternion<f32>) {
        self.transform.rotation = rotation;
    }

    pub fn set_rotation_euler(&mut self, pitch: f32, yaw: f32, roll: f32, order: RotationOrder) {
        self.transform.set_rotation_euler(pitch, yaw, roll, order);
    }

    pub fn rotation_quat(&self) -> Quaternion<f32> {
        self.transform.rotation
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.transform.scale
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.transform.scale = scale;
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.transform.to_matrix()
    }

    /// Draw every mesh with `model` set to the model matrix times the mesh's
    /// own transform.
    pub fn draw(
        &self,
        queue: &wgpu::Queue,
        render_pass: &mut wgpu::RenderPass<'_>,
        program: &mut ShaderProgram,
    ) {
        if !program.is_valid() {
            log::warn!("Model not drawn: shader program is invalid");
            return;
        }
        let model_matrix = self.model_matrix();
        for mesh in &self.meshes {
            program.set_mat4("model", &(model_matrix * mesh.model_matrix()));
            mesh.draw(queue, render_pass, program);
        }
    }
}
