//! Owned scene graph handed from the file decoders to the model importer.
//!
//! The decoders in [`super::gltf_loader`] and [`super::obj_loader`] do all format specific
//! work: they triangulate, bake node transforms into vertex data, generate
//! missing normals and index the vertices. What is left is a plain tree of
//! nodes referencing meshes by index, which [`super::import`] walks without
//! tracking a transform stack.

use std::path::Path;

use cgmath::{InnerSpace, Vector3, Zero};

use crate::error::ImportError;

/// Material texture categories the importer knows how to resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureType {
    BaseColor,
    Diffuse,
    Specular,
    Normals,
}

#[derive(Clone, Debug, Default)]
pub struct SceneNode {
    pub name: String,
    /// Indices into [`SceneGraph::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_meshes(mut self, meshes: impl IntoIterator<Item = usize>) -> Self {
        self.meshes.extend(meshes);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct SceneMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    /// First UV channel only.
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub triangles: Vec<[u32; 3]>,
    /// Index into [`SceneGraph::materials`].
    pub material: Option<usize>,
}

impl SceneMesh {
    /// Area weighted vertex normals for meshes that ship without any.
    pub fn generate_normals(&mut self) {
        if self.normals.is_some() {
            return;
        }
        let mut normals = vec![Vector3::<f32>::zero(); self.positions.len()];
        for triangle in &self.triangles {
            let [a, b, c] = triangle.map(|i| i as usize);
            if a >= self.positions.len() || b >= self.positions.len() || c >= self.positions.len() {
                continue;
            }
            let p0 = Vector3::from(self.positions[a]);
            let p1 = Vector3::from(self.positions[b]);
            let p2 = Vector3::from(self.positions[c]);
            let face = (p1 - p0).cross(p2 - p0);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        self.normals = Some(
            normals
                .into_iter()
                .map(|n| {
                    if n.magnitude2() > f32::EPSILON {
                        n.normalize().into()
                    } else {
                        [0.0; 3]
                    }
                })
                .collect(),
        );
    }

    /// Append `other`'s geometry, offsetting its indices. An attribute only one
    /// side carries is zero filled on the other.
    pub fn append(&mut self, other: SceneMesh) {
        let (own, theirs) = (self.positions.len(), other.positions.len());
        let offset = own as u32;
        self.normals = concat_attribute(self.normals.take(), own, other.normals, theirs);
        self.tex_coords = concat_attribute(self.tex_coords.take(), own, other.tex_coords, theirs);
        self.positions.extend(other.positions);
        self.triangles
            .extend(other.triangles.into_iter().map(|t| t.map(|i| i + offset)));
    }
}

fn concat_attribute<T: Copy + Default>(
    own: Option<Vec<T>>,
    own_len: usize,
    other: Option<Vec<T>>,
    other_len: usize,
) -> Option<Vec<T>> {
    if own.is_none() && other.is_none() {
        return None;
    }
    let mut values = own.unwrap_or_else(|| vec![T::default(); own_len]);
    values.extend(other.unwrap_or_else(|| vec![T::default(); other_len]));
    Some(values)
}

#[derive(Clone, Debug, Default)]
pub struct SceneMaterial {
    pub name: String,
    /// Texture slots in declaration order, each with its locator string.
    pub textures: Vec<(TextureType, String)>,
}

impl SceneMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            textures: Vec::new(),
        }
    }

    pub fn with_texture(mut self, ty: TextureType, locator: impl Into<String>) -> Self {
        self.textures.push((ty, locator.into()));
        self
    }

    /// All locators registered under `ty`, in slot order.
    pub fn textures_of(&self, ty: TextureType) -> impl Iterator<Item = &str> {
        self.textures
            .iter()
            .filter(move |(t, _)| *t == ty)
            .map(|(_, locator)| locator.as_str())
    }
}

/// Encoded image bytes stored inside the scene file.
#[derive(Clone, Debug)]
pub struct EmbeddedTexture {
    pub bytes: Vec<u8>,
    /// File extension style hint such as `png`, if the format declared one.
    pub format_hint: Option<String>,
}

/// Sibling meshes sharing a name and material are merged while their combined
/// vertex count stays at or below this.
pub const SMALL_MESH_VERTICES: usize = 1024;

#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    pub root: Option<SceneNode>,
    pub meshes: Vec<SceneMesh>,
    pub materials: Vec<SceneMaterial>,
    pub embedded_textures: Vec<EmbeddedTexture>,
}

impl SceneGraph {
    /// Parse `path` with the decoder matching its extension. The result is not
    /// validated; [`super::import::import_scene`] does that.
    pub fn load(path: &Path) -> Result<SceneGraph, ImportError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let mut scene = match extension.as_deref() {
            Some("gltf") | Some("glb") => super::gltf_loader::load_scene(path)?,
            Some("obj") => super::obj_loader::load_scene(path)?,
            _ => return Err(ImportError::UnsupportedFormat(path.to_path_buf())),
        };
        scene.merge_small_meshes(SMALL_MESH_VERTICES);
        Ok(scene)
    }

    /// Fold adjacent meshes of one node into the first of them when they share
    /// a name and material and together have at most `max_vertices` vertices.
    /// Meshes referenced from more than one node, or not at all, are left
    /// alone. Absorbed meshes stay in [`SceneGraph::meshes`] unreferenced.
    /// Returns the number of meshes absorbed.
    pub fn merge_small_meshes(&mut self, max_vertices: usize) -> usize {
        let Self { root, meshes, .. } = self;
        let Some(root) = root.as_mut() else {
            return 0;
        };

        let mut references = vec![0usize; meshes.len()];
        let mut stack = vec![&*root];
        while let Some(node) = stack.pop() {
            for &index in &node.meshes {
                if let Some(count) = references.get_mut(index) {
                    *count += 1;
                }
            }
            stack.extend(node.children.iter());
        }
        let unique = |index: usize| references.get(index) == Some(&1);

        let mut absorbed = 0;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let mut kept: Vec<usize> = Vec::with_capacity(node.meshes.len());
            for &index in &node.meshes {
                let target = kept.last().copied().filter(|&last| {
                    unique(last) && unique(index) && {
                        let (a, b) = (&meshes[last], &meshes[index]);
                        a.name == b.name
                            && a.material == b.material
                            && a.positions.len() + b.positions.len() <= max_vertices
                    }
                });
                match target {
                    Some(last) => {
                        let mesh = std::mem::take(&mut meshes[index]);
                        meshes[last].append(mesh);
                        absorbed += 1;
                    }
                    None => kept.push(index),
                }
            }
            node.meshes = kept;
            stack.extend(node.children.iter_mut());
        }

        if absorbed > 0 {
            log::debug!("Merged {} small meshes into their siblings.", absorbed);
        }
        absorbed
    }

    /// Store encoded image bytes and return their `*N` locator.
    pub fn embed_texture(&mut self, bytes: Vec<u8>, format_hint: Option<String>) -> String {
        let locator = format!("*{}", self.embedded_textures.len());
        self.embedded_textures.push(EmbeddedTexture { bytes, format_hint });
        locator
    }

    /// Reject scenes the importer cannot walk safely.
    pub fn validate(&self, path: &Path) -> Result<(), ImportError> {
        let incomplete = |reason: String| ImportError::Incomplete {
            path: path.to_path_buf(),
            reason,
        };
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| incomplete("scene has no root node".to_string()))?;

        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if let Some(&bad) = node.meshes.iter().find(|&&m| m >= self.meshes.len()) {
                return Err(incomplete(format!(
                    "node {:?} references mesh {} of {}",
                    node.name,
                    bad,
                    self.meshes.len()
                )));
            }
            stack.extend(node.children.iter());
        }

        for mesh in &self.meshes {
            if let Some(material) = mesh.material.filter(|&m| m >= self.materials.len()) {
                return Err(incomplete(format!(
                    "mesh {:?} references material {} of {}",
                    mesh.name,
                    material,
                    self.materials.len()
                )));
            }
            let vertex_count = mesh.positions.len() as u32;
            if mesh.triangles.iter().flatten().any(|&i| i >= vertex_count) {
                return Err(incomplete(format!(
                    "mesh {:?} has indices past its {} vertices",
                    mesh.name, vertex_count
                )));
            }
        }
        Ok(())
    }
}
