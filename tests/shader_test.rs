use std::collections::HashMap;

use cgmath::{Matrix4, SquareMatrix};
use render_scaffold::{
    error::CompileError,
    pipelines::{
        shader::{
            MODEL_FRAGMENT_SHADER, MODEL_VERTEX_SHADER, SKYBOX_FRAGMENT_SHADER,
            SKYBOX_VERTEX_SHADER,
        },
        uniform::{FRAGMENT, UniformBlock, UniformLocation, VERTEX, reflect_program},
    },
};
use wgpu::TextureViewDimension;

const PLAIN_VERTEX: &str = r#"
struct Uniforms {
    tint: vec4<f32>,
    scale: f32,
    flip: u32,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(position * uniforms.scale, 1.0);
    out.uv = position.xy;
    return out;
}
"#;

const PLAIN_FRAGMENT: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#;

#[test]
fn model_shaders_reflect_camera_model_and_three_textures() {
    let layout = reflect_program(MODEL_VERTEX_SHADER, MODEL_FRAGMENT_SHADER).unwrap();

    assert_eq!(
        layout.members.get("camMatrix"),
        Some(&UniformLocation { offset: 0, size: 64 })
    );
    assert_eq!(
        layout.members.get("model"),
        Some(&UniformLocation { offset: 64, size: 64 })
    );
    assert_eq!(layout.block_size, 128);

    let textures: Vec<_> = layout
        .textures
        .iter()
        .map(|t| (t.name.as_str(), t.group, t.view_dimension))
        .collect();
    assert_eq!(
        textures,
        [
            ("diffuse0", 1, TextureViewDimension::D2),
            ("specular0", 2, TextureViewDimension::D2),
            ("normal0", 3, TextureViewDimension::D2),
        ]
    );
}

#[test]
fn skybox_shaders_reflect_a_cube_texture() {
    let layout = reflect_program(SKYBOX_VERTEX_SHADER, SKYBOX_FRAGMENT_SHADER).unwrap();

    assert!(layout.members.contains_key("view"));
    assert!(layout.members.contains_key("projection"));
    assert_eq!(layout.textures.len(), 1);
    assert_eq!(layout.textures[0].name, "environmentMap");
    assert_eq!(layout.textures[0].group, 1);
    assert_eq!(layout.textures[0].view_dimension, TextureViewDimension::Cube);
}

#[test]
fn scalar_members_are_reflected_with_their_offsets() {
    let layout = reflect_program(PLAIN_VERTEX, PLAIN_FRAGMENT).unwrap();

    assert_eq!(layout.members["tint"], UniformLocation { offset: 0, size: 16 });
    assert_eq!(layout.members["scale"], UniformLocation { offset: 16, size: 4 });
    assert_eq!(layout.members["flip"], UniformLocation { offset: 20, size: 4 });
    assert!(layout.textures.is_empty());
}

#[test]
fn parse_errors_name_the_stage() {
    let err = reflect_program("fn broken(", PLAIN_FRAGMENT).unwrap_err();
    assert!(matches!(err, CompileError::Parse { stage, .. } if stage == VERTEX));

    let err = reflect_program(PLAIN_VERTEX, "@fragment fn fs_main( {").unwrap_err();
    assert!(matches!(err, CompileError::Parse { stage, .. } if stage == FRAGMENT));
    assert!(err.to_string().starts_with("FRAGMENT"));
}

#[test]
fn validation_errors_name_the_stage() {
    let fragment = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(undefined_value, 0.0, 0.0, 1.0);
}
"#;
    let err = reflect_program(PLAIN_VERTEX, fragment).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Parse { stage, .. } | CompileError::Validation { stage, .. } if stage == FRAGMENT
    ));
}

#[test]
fn stage_without_matching_entry_point_is_rejected() {
    let err = reflect_program(PLAIN_FRAGMENT, PLAIN_FRAGMENT).unwrap_err();
    assert!(matches!(err, CompileError::MissingEntryPoint { stage } if stage == VERTEX));
}

#[test]
fn unwritten_fragment_input_fails_to_link() {
    let fragment = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>, @location(4) extra: f32) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, extra, 1.0);
}
"#;
    let err = reflect_program(PLAIN_VERTEX, fragment).unwrap_err();
    assert!(matches!(err, CompileError::Link(_)));
}

#[test]
fn texture_groups_must_be_contiguous() {
    let fragment = r#"
@group(2) @binding(0)
var lonely: texture_2d<f32>;
@group(2) @binding(1)
var lonely_sampler: sampler;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(lonely, lonely_sampler, uv);
}
"#;
    let err = reflect_program(PLAIN_VERTEX, fragment).unwrap_err();
    assert!(matches!(err, CompileError::Link(_)));
}

#[test]
fn uniform_outside_group_zero_fails_to_link() {
    let vertex = PLAIN_VERTEX.replace("@group(0) @binding(0)", "@group(1) @binding(0)");
    let err = reflect_program(&vertex, PLAIN_FRAGMENT).unwrap_err();
    assert!(matches!(err, CompileError::Link(_)));
}

fn block() -> UniformBlock {
    let members = HashMap::from([
        ("camMatrix".to_string(), UniformLocation { offset: 0, size: 64 }),
        ("alpha".to_string(), UniformLocation { offset: 64, size: 4 }),
        ("enabled".to_string(), UniformLocation { offset: 68, size: 4 }),
        ("count".to_string(), UniformLocation { offset: 72, size: 4 }),
        ("tint".to_string(), UniformLocation { offset: 80, size: 16 }),
    ]);
    UniformBlock::new(members, 96)
}

#[test]
fn uniform_lookups_are_cached_including_misses() {
    let mut block = block();
    assert!(!block.is_cached("alpha"));
    assert!(!block.is_cached("missing"));

    assert_eq!(block.location("alpha"), Some(UniformLocation { offset: 64, size: 4 }));
    assert_eq!(block.location("missing"), None);

    assert!(block.is_cached("alpha"));
    assert!(block.is_cached("missing"));
    assert_eq!(block.location("missing"), None);
}

#[test]
fn setters_write_at_the_member_offset() {
    let mut block = block();

    block.set_mat4("camMatrix", &Matrix4::identity());
    block.set_float("alpha", 0.5);
    block.set_bool("enabled", true);
    block.set_int("count", -3);
    block.set_vec4("tint", [0.1, 0.2, 0.3, 0.4]);

    assert_eq!(block.read_f32(0), Some(1.0));
    assert_eq!(block.read_f32(4), Some(0.0));
    assert_eq!(block.read_f32(20), Some(1.0));
    assert_eq!(block.read_f32(60), Some(1.0));
    assert_eq!(block.read_f32(64), Some(0.5));
    assert_eq!(&block.data()[68..72], &1u32.to_le_bytes());
    assert_eq!(&block.data()[72..76], &(-3i32).to_le_bytes());
    assert_eq!(block.read_f32(88), Some(0.3));
    assert_eq!(block.read_f32(96), None);
}

#[test]
fn oversized_and_unknown_values_are_dropped() {
    let mut block = block();

    block.set_mat4("alpha", &Matrix4::identity());
    block.set_float("missing", 9.0);

    assert!(block.data().iter().all(|b| *b == 0));
    assert_eq!(block.size(), 96);
}
