//! Wavefront OBJ (+ MTL) decoding into a [`SceneGraph`].
//!
//! OBJ has no node hierarchy, so every object ends up under the root node in
//! file order.

use std::path::Path;

use crate::{
    error::ImportError,
    resources::scene::{SceneGraph, SceneMaterial, SceneMesh, SceneNode, TextureType},
};

pub fn load_scene(path: &Path) -> Result<SceneGraph, ImportError> {
    let (models, obj_materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| ImportError::Obj {
        path: path.to_path_buf(),
        source,
    })?;

    // A missing .mtl is not fatal, the meshes just come without materials.
    let obj_materials = obj_materials.unwrap_or_else(|e| {
        log::warn!("Materials of {:?} could not be loaded: {}", path, e);
        Vec::new()
    });

    let materials = obj_materials
        .into_iter()
        .map(|m| {
            let mut material = SceneMaterial::new(m.name);
            if let Some(diffuse) = m.diffuse_texture {
                material = material.with_texture(TextureType::Diffuse, diffuse);
            }
            if let Some(specular) = m.specular_texture {
                material = material.with_texture(TextureType::Specular, specular);
            }
            if let Some(normal) = m.normal_texture {
                material = material.with_texture(TextureType::Normals, normal);
            }
            material
        })
        .collect::<Vec<_>>();

    let meshes = models
        .into_iter()
        .map(|m| {
            let vertex_count = m.mesh.positions.len() / 3;
            let positions = m
                .mesh
                .positions
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]])
                .collect();
            let normals = (m.mesh.normals.len() == vertex_count * 3).then(|| {
                m.mesh
                    .normals
                    .chunks_exact(3)
                    .map(|n| [n[0], n[1], n[2]])
                    .collect()
            });
            // OBJ puts the uv origin at the bottom left, textures are uploaded top row first.
            let tex_coords = (m.mesh.texcoords.len() == vertex_count * 2).then(|| {
                m.mesh
                    .texcoords
                    .chunks_exact(2)
                    .map(|t| [t[0], 1.0 - t[1]])
                    .collect()
            });
            let triangles = m
                .mesh
                .indices
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect();
            let material = m
                .mesh
                .material_id
                .filter(|&id| id < materials.len());

            let mut mesh = SceneMesh {
                name: m.name,
                positions,
                normals,
                tex_coords,
                triangles,
                material,
            };
            mesh.generate_normals();
            mesh
        })
        .collect::<Vec<_>>();

    let root = SceneNode::new("root").with_meshes(0..meshes.len());

    Ok(SceneGraph {
        root: Some(root),
        meshes,
        materials,
        embedded_textures: Vec::new(),
    })
}
