#![allow(dead_code)]

use std::{io::Cursor, path::Path};

use image::{ImageFormat, Rgba, RgbaImage};
use render_scaffold::resources::scene::{SceneMesh, SceneNode};

pub(crate) const EPSILON: f32 = 1e-5;

pub(crate) fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() <= EPSILON
}

pub(crate) fn approx3(a: [f32; 3], b: [f32; 3]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| approx(*x, *y))
}

pub(crate) fn solid(width: u32, height: u32, colour: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(colour))
}

/// Write a solid colour PNG, creating parent directories.
pub(crate) fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create texture dir");
    }
    solid(width, height, [200, 120, 40, 255])
        .save(path)
        .expect("write png");
}

/// PNG encoded bytes, as a scene would embed them.
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    solid(width, height, [10, 20, 30, 255])
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}

/// One triangle whose corners are `origin`, `origin + x` and `origin + y`.
pub(crate) fn triangle(name: &str, origin: [f32; 3], material: Option<usize>) -> SceneMesh {
    let [x, y, z] = origin;
    SceneMesh {
        name: name.to_string(),
        positions: vec![[x, y, z], [x + 1.0, y, z], [x, y + 1.0, z]],
        normals: None,
        tex_coords: Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
        triangles: vec![[0, 1, 2]],
        material,
    }
}

/// A root node holding every mesh index in `0..count`.
pub(crate) fn flat_root(count: usize) -> SceneNode {
    SceneNode::new("root").with_meshes(0..count)
}
