//! glTF 2.0 (`.gltf` / `.glb`) decoding into a [`SceneGraph`].

use std::path::Path;

use base64::Engine;
use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector3};

use crate::{
    error::ImportError,
    resources::scene::{SceneGraph, SceneMaterial, SceneMesh, SceneNode, TextureType},
};

pub fn load_scene(path: &Path) -> Result<SceneGraph, ImportError> {
    let bytes = std::fs::read(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let gltf_error = |source| ImportError::Gltf {
        path: path.to_path_buf(),
        source,
    };
    let gltf = gltf::Gltf::from_slice(&bytes).map_err(gltf_error)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let buffers = gltf::import_buffers(&gltf.document, Some(base), gltf.blob.clone())
        .map_err(gltf_error)?;

    let mut scene = SceneGraph::default();

    // Images inside buffer views or base64 data uris become embedded textures
    // addressed as `*N`, everything else keeps its relative uri.
    let mut image_locators = Vec::new();
    for image in gltf.images() {
        let locator = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let data = &buffers[view.buffer().index()].0;
                let start = view.offset();
                let end = start + view.length();
                match data.get(start..end) {
                    Some(bytes) => {
                        Some(scene.embed_texture(bytes.to_vec(), format_hint(mime_type)))
                    }
                    None => {
                        log::warn!(
                            "Image {} in {:?} points outside of buffer {}.",
                            image.index(),
                            path,
                            view.buffer().index()
                        );
                        None
                    }
                }
            }
            gltf::image::Source::Uri { uri, mime_type } if uri.starts_with("data:") => {
                match decode_data_uri(uri) {
                    Some((mime, bytes)) => {
                        let hint = mime_type.or(mime).and_then(format_hint);
                        Some(scene.embed_texture(bytes, hint))
                    }
                    None => {
                        log::warn!(
                            "Image {} in {:?} is a data uri without a base64 payload.",
                            image.index(),
                            path
                        );
                        None
                    }
                }
            }
            gltf::image::Source::Uri { uri, .. } => Some(uri.to_string()),
        };
        image_locators.push(locator);
    }

    for material in gltf.materials() {
        let mut scene_material = SceneMaterial::new(material.name().unwrap_or_default());
        let pbr = material.pbr_metallic_roughness();
        if let Some(info) = pbr.base_color_texture() {
            if let Some(locator) = &image_locators[info.texture().source().index()] {
                scene_material = scene_material.with_texture(TextureType::BaseColor, locator);
            }
        }
        if let Some(normal) = material.normal_texture() {
            if let Some(locator) = &image_locators[normal.texture().source().index()] {
                scene_material = scene_material.with_texture(TextureType::Normals, locator);
            }
        }
        scene.materials.push(scene_material);
    }

    let gltf_scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    if let Some(gltf_scene) = gltf_scene {
        let mut root = SceneNode::new(gltf_scene.name().unwrap_or("root"));
        for node in gltf_scene.nodes() {
            let child = to_scene_node(node, Matrix4::identity(), &buffers, &mut scene.meshes);
            root.children.push(child);
        }
        scene.root = Some(root);
    }

    Ok(scene)
}

/// `image/png` -> `png`.
fn format_hint(mime_type: &str) -> Option<String> {
    mime_type
        .split('/')
        .nth(1)
        .filter(|subtype| !subtype.is_empty())
        .map(str::to_string)
}

/// Splits `data:<mime>;base64,<payload>` into its mime type and decoded bytes.
fn decode_data_uri(uri: &str) -> Option<(Option<&str>, Vec<u8>)> {
    let (header, payload) = uri.strip_prefix("data:")?.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;
    Some(((!mime.is_empty()).then_some(mime), bytes))
}

fn to_scene_node(
    node: gltf::Node,
    parent: Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
    meshes: &mut Vec<SceneMesh>,
) -> SceneNode {
    let world = parent * Matrix4::from(node.transform().matrix());
    let mut scene_node = SceneNode::new(node.name().unwrap_or_default());

    if let Some(mesh) = node.mesh() {
        let name = mesh
            .name()
            .or(node.name())
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
        for primitive in mesh.primitives() {
            match read_primitive(&primitive, &name, world, buffers) {
                Some(scene_mesh) => {
                    scene_node.meshes.push(meshes.len());
                    meshes.push(scene_mesh);
                }
                None => log::warn!(
                    "Primitive {} of mesh {:?} uses mode {:?} and was dropped.",
                    primitive.index(),
                    name,
                    primitive.mode()
                ),
            }
        }
    }

    for child in node.children() {
        scene_node
            .children
            .push(to_scene_node(child, world, buffers, meshes));
    }
    scene_node
}

fn read_primitive(
    primitive: &gltf::Primitive,
    name: &str,
    world: Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
) -> Option<SceneMesh> {
    let reader = primitive.reader(|buffer| Some(buffers[buffer.index()].0.as_slice()));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|positions| {
            positions
                .map(|p| (world * Vector3::from(p).extend(1.0)).truncate().into())
                .collect()
        })
        .unwrap_or_default();

    let normal_matrix = normal_matrix(world);
    let normals = reader.read_normals().map(|normals| {
        normals
            .map(|n| {
                let n = normal_matrix * Vector3::from(n);
                if n.magnitude2() > f32::EPSILON {
                    n.normalize().into()
                } else {
                    [0.0; 3]
                }
            })
            .collect::<Vec<[f32; 3]>>()
    });
    let tex_coords = reader
        .read_tex_coords(0)
        .map(|uvs| uvs.into_f32().collect::<Vec<[f32; 2]>>());

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let triangles = triangulate(primitive.mode(), &indices)?;

    let mut mesh = SceneMesh {
        name: name.to_string(),
        positions,
        normals,
        tex_coords,
        triangles,
        material: primitive.material().index(),
    };
    mesh.generate_normals();
    Some(mesh)
}

/// Inverse transpose of the upper 3x3, falling back to the plain 3x3 when singular.
fn normal_matrix(world: Matrix4<f32>) -> Matrix3<f32> {
    let linear = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
    linear
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or(linear)
}

fn triangulate(mode: gltf::mesh::Mode, indices: &[u32]) -> Option<Vec<[u32; 3]>> {
    use gltf::mesh::Mode;

    let triangles = match mode {
        Mode::Triangles => indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect(),
        Mode::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| {
                if i % 2 == 0 {
                    [w[0], w[1], w[2]]
                } else {
                    [w[1], w[0], w[2]]
                }
            })
            .collect(),
        Mode::TriangleFan => match indices.split_first() {
            Some((&first, rest)) => rest.windows(2).map(|w| [first, w[0], w[1]]).collect(),
            None => Vec::new(),
        },
        Mode::Points | Mode::Lines | Mode::LineLoop | Mode::LineStrip => return None,
    };
    Some(triangles)
}
