//! Turns a parsed [`SceneGraph`] into mesh data ready for upload.
//!
//! The walk is depth-first from the root: a node's own meshes come before its
//! children, and children are visited in source order. Meshes whose name
//! contains one of the skip substrings are dropped entirely and do not touch
//! the bounding box.
//!
//! Textures are decoded at most once per import. The cache is keyed by the
//! locator string found in the material, which is either a path relative to
//! the model file or `*N` for the N-th texture embedded in the scene.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    data_structures::{
        model::{Aabb, ModelVertex},
        texture::TextureKind,
    },
    error::{DecodeError, ImportError},
    resources::{
        scene::{SceneGraph, SceneMesh, SceneNode, TextureType},
        texture::TextureSource,
    },
};

/// Material texture types in the order they are looked up, with the kind
/// each one is bound as.
const TEXTURE_ORDER: [(TextureType, TextureKind); 4] = [
    (TextureType::BaseColor, TextureKind::Diffuse),
    (TextureType::Diffuse, TextureKind::Diffuse),
    (TextureType::Specular, TextureKind::Specular),
    (TextureType::Normals, TextureKind::Normal),
];

pub const DIFFUSE_KEYWORDS: [&str; 4] = ["basecolor", "albedo", "diffuse", "color"];
pub const NORMAL_KEYWORDS: [&str; 2] = ["normal", "nrm"];

const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

#[derive(Clone, Debug)]
pub struct ImportOptions {
    /// Meshes whose name contains any of these (case-sensitive) are skipped.
    pub skip_mesh_names: Vec<String>,
    /// Directory next to the model file scanned when a mesh has no textures.
    pub textures_dir: String,
}

impl ImportOptions {
    pub fn skipping<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip_mesh_names: names.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    fn should_skip(&self, mesh_name: &str) -> Option<&str> {
        self.skip_mesh_names
            .iter()
            .map(String::as_str)
            .find(|pattern| mesh_name.contains(pattern))
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            skip_mesh_names: Vec::new(),
            textures_dir: "textures".to_string(),
        }
    }
}

/// A texture attached to one mesh. `slot` counts up from zero per mesh in
/// discovery order.
#[derive(Clone, Debug)]
pub struct TextureBinding {
    pub kind: TextureKind,
    pub slot: u32,
    pub locator: String,
    pub source: Rc<TextureSource>,
}

#[derive(Clone, Debug)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub textures: Vec<TextureBinding>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub meshes_seen: usize,
    pub meshes_skipped: usize,
    pub textures_decoded: usize,
    pub cache_hits: usize,
    pub fallback_textures: usize,
}

#[derive(Debug)]
pub struct ImportedModel {
    /// Directory of the model file, the base for relative texture locators.
    pub directory: PathBuf,
    pub meshes: Vec<MeshData>,
    /// Every texture decoded during the import, keyed by locator.
    pub textures: HashMap<String, Rc<TextureSource>>,
    pub aabb: Aabb,
    pub stats: ImportStats,
}

/// Parse the scene file at `path` and import it.
pub fn import_model(path: &Path, options: &ImportOptions) -> Result<ImportedModel, ImportError> {
    let scene = SceneGraph::load(path)?;
    import_scene(&scene, path, options)
}

/// Import an already parsed scene. `model_path` only serves to locate
/// external textures.
pub fn import_scene(
    scene: &SceneGraph,
    model_path: &Path,
    options: &ImportOptions,
) -> Result<ImportedModel, ImportError> {
    scene.validate(model_path)?;
    let Some(root) = scene.root.as_ref() else {
        return Err(ImportError::Incomplete {
            path: model_path.to_path_buf(),
            reason: "scene has no root node".to_string(),
        });
    };

    let directory = model_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    log::info!("Loading model from directory: {:?}", directory);

    let mut importer = Importer {
        scene,
        options,
        textures_dir: directory.join(&options.textures_dir),
        directory,
        textures: HashMap::new(),
        meshes: Vec::new(),
        aabb: Aabb::empty(),
        stats: ImportStats::default(),
    };
    importer.process_node(root);

    let stats = importer.stats;
    log::info!(
        "Imported {:?}: {} of {} meshes kept, {} textures decoded, {} cache hits, {} fallback textures",
        model_path,
        importer.meshes.len(),
        stats.meshes_seen,
        stats.textures_decoded,
        stats.cache_hits,
        stats.fallback_textures
    );

    Ok(ImportedModel {
        directory: importer.directory,
        meshes: importer.meshes,
        textures: importer.textures,
        aabb: importer.aabb,
        stats,
    })
}

/// `"*3"` is embedded texture 3. Anything without the leading `*` is a path.
pub fn parse_embedded_locator(locator: &str) -> Option<usize> {
    locator.strip_prefix('*')?.parse().ok()
}

/// First file in `dir`, by file name, whose lowercase name contains any of
/// `keywords`. A missing directory matches nothing.
pub fn find_first_matching_texture(dir: &Path, keywords: &[&str]) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("No fallback textures in {:?}: {}", dir, e);
            return None;
        }
    };
    let mut files = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect::<Vec<_>>();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    files.into_iter().find(|path| {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        keywords.iter().any(|keyword| name.contains(keyword))
    })
}

struct Importer<'a> {
    scene: &'a SceneGraph,
    options: &'a ImportOptions,
    directory: PathBuf,
    textures_dir: PathBuf,
    textures: HashMap<String, Rc<TextureSource>>,
    meshes: Vec<MeshData>,
    aabb: Aabb,
    stats: ImportStats,
}

impl Importer<'_> {
    fn process_node(&mut self, node: &SceneNode) {
        let (scene, options) = (self.scene, self.options);
        for &index in &node.meshes {
            let mesh = &scene.meshes[index];
            self.stats.meshes_seen += 1;
            if let Some(pattern) = options.should_skip(&mesh.name) {
                log::warn!("Skipping mesh {:?} (matches {:?})", mesh.name, pattern);
                self.stats.meshes_skipped += 1;
                continue;
            }
            let data = self.process_mesh(mesh);
            self.meshes.push(data);
        }
        for child in &node.children {
            self.process_node(child);
        }
    }

    fn process_mesh(&mut self, mesh: &SceneMesh) -> MeshData {
        let vertices = mesh
            .positions
            .iter()
            .enumerate()
            .map(|(i, &position)| {
                self.aabb.extend(position);
                ModelVertex {
                    position,
                    normal: mesh
                        .normals
                        .as_ref()
                        .and_then(|n| n.get(i).copied())
                        .unwrap_or([0.0; 3]),
                    color: WHITE,
                    tex_coords: mesh
                        .tex_coords
                        .as_ref()
                        .and_then(|t| t.get(i).copied())
                        .unwrap_or([0.0; 2]),
                }
            })
            .collect::<Vec<_>>();
        let indices = mesh.triangles.iter().flatten().copied().collect::<Vec<_>>();

        let scene = self.scene;
        let mut textures = Vec::new();
        if let Some(material) = mesh.material.and_then(|m| scene.materials.get(m)) {
            for (ty, kind) in TEXTURE_ORDER {
                for locator in material.textures_of(ty) {
                    let source = self.texture(locator);
                    textures.push(TextureBinding {
                        kind,
                        slot: textures.len() as u32,
                        locator: locator.to_string(),
                        source,
                    });
                }
            }
        }

        if textures.is_empty() && scene.embedded_textures.is_empty() {
            self.fallback_textures(&mut textures);
        }

        log::debug!(
            "Mesh {:?}: {} vertices, {} indices, {} textures",
            mesh.name,
            vertices.len(),
            indices.len(),
            textures.len()
        );

        MeshData {
            name: mesh.name.clone(),
            vertices,
            indices,
            textures,
        }
    }

    /// Cached texture for `locator`, decoding it on first use.
    fn texture(&mut self, locator: &str) -> Rc<TextureSource> {
        if let Some(source) = self.textures.get(locator) {
            self.stats.cache_hits += 1;
            return source.clone();
        }
        let source = Rc::new(self.decode(locator));
        self.stats.textures_decoded += 1;
        self.textures.insert(locator.to_string(), source.clone());
        source
    }

    fn decode(&self, locator: &str) -> TextureSource {
        if !locator.starts_with('*') {
            let path = self.directory.join(locator);
            log::debug!("Loading texture {:?}", path);
            return TextureSource::from_file(&path);
        }

        let embedded = parse_embedded_locator(locator)
            .ok_or_else(|| DecodeError::InvalidLocator(locator.to_string()))
            .and_then(|index| {
                self.scene
                    .embedded_textures
                    .get(index)
                    .ok_or(DecodeError::MissingEmbedded {
                        index,
                        available: self.scene.embedded_textures.len(),
                    })
            });
        match embedded {
            Ok(texture) => {
                TextureSource::from_bytes(&texture.bytes, locator, texture.format_hint.as_deref())
            }
            Err(e) => {
                log::warn!("Failed to load embedded texture {}: {}", locator, e);
                TextureSource::invalid(locator)
            }
        }
    }

    fn fallback_textures(&mut self, textures: &mut Vec<TextureBinding>) {
        log::info!("Looking for fallback textures in: {:?}", self.textures_dir);
        let candidates = [
            (TextureKind::Diffuse, &DIFFUSE_KEYWORDS[..]),
            (TextureKind::Normal, &NORMAL_KEYWORDS[..]),
        ];
        for (kind, keywords) in candidates {
            let Some(path) = find_first_matching_texture(&self.textures_dir, keywords) else {
                continue;
            };
            let key = path.to_string_lossy().into_owned();
            let source = match self.textures.get(&key) {
                Some(source) => {
                    self.stats.cache_hits += 1;
                    source.clone()
                }
                None => {
                    let source = Rc::new(TextureSource::from_file(&path));
                    self.stats.textures_decoded += 1;
                    self.textures.insert(key.clone(), source.clone());
                    source
                }
            };
            log::debug!("Fallback {} texture {:?}", kind, path);
            self.stats.fallback_textures += 1;
            textures.push(TextureBinding {
                kind,
                slot: textures.len() as u32,
                locator: key,
                source,
            });
        }
    }
}
