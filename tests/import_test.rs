mod common;

use std::rc::Rc;

use common::test_utils::{approx3, flat_root, png_bytes, triangle, write_png};
use render_scaffold::{
    ImportOptions,
    data_structures::{model::UploadKey, texture::TextureKind},
    error::ImportError,
    resources::{
        import::{find_first_matching_texture, import_model, import_scene, parse_embedded_locator},
        scene::{
            EmbeddedTexture, SMALL_MESH_VERTICES, SceneGraph, SceneMaterial, SceneNode,
            TextureType,
        },
    },
};

#[test]
fn skipped_meshes_are_dropped_and_do_not_grow_the_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let scene = SceneGraph {
        root: Some(flat_root(2)),
        meshes: vec![
            triangle("Body", [0.0, 0.0, 0.0], None),
            triangle("Body_Collision", [10.0, 10.0, 10.0], None),
        ],
        ..Default::default()
    };

    let imported = import_scene(
        &scene,
        &dir.path().join("model.gltf"),
        &ImportOptions::skipping(["Collision"]),
    )
    .unwrap();

    assert_eq!(imported.meshes.len(), 1);
    assert_eq!(imported.meshes[0].name, "Body");
    assert!(approx3(imported.aabb.min.into(), [0.0, 0.0, 0.0]));
    assert!(approx3(imported.aabb.max.into(), [1.0, 1.0, 0.0]));
    assert_eq!(imported.stats.meshes_seen, 2);
    assert_eq!(imported.stats.meshes_skipped, 1);
}

#[test]
fn skip_matching_is_case_sensitive_substring() {
    let dir = tempfile::tempdir().unwrap();
    let scene = SceneGraph {
        root: Some(flat_root(3)),
        meshes: vec![
            triangle("collision_lower", [0.0; 3], None),
            triangle("MyCollisionHull", [0.0; 3], None),
            triangle("Collision", [0.0; 3], None),
        ],
        ..Default::default()
    };

    let imported = import_scene(
        &scene,
        &dir.path().join("model.gltf"),
        &ImportOptions::skipping(["Collision"]),
    )
    .unwrap();

    let names: Vec<_> = imported.meshes.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["collision_lower"]);
}

#[test]
fn mesh_count_matches_unskipped_meshes_across_the_tree() {
    let dir = tempfile::tempdir().unwrap();
    let names = ["Hull", "Hull_LOD1", "Wheel", "Wheel_LOD1", "Door", "Antenna_LOD1"];
    let root = SceneNode::new("root")
        .with_meshes([0])
        .with_child(
            SceneNode::new("chassis")
                .with_meshes([1, 2])
                .with_child(SceneNode::new("door").with_meshes([4])),
        )
        .with_child(SceneNode::new("roof").with_meshes([3, 5]));
    let scene = SceneGraph {
        root: Some(root),
        meshes: names
            .iter()
            .enumerate()
            .map(|(i, name)| triangle(name, [i as f32, 0.0, 0.0], None))
            .collect(),
        ..Default::default()
    };

    for skip in [vec![], vec!["LOD1"], vec!["LOD1", "Door"], vec!["Wheel", "Hull"]] {
        let imported = import_scene(
            &scene,
            &dir.path().join("model.gltf"),
            &ImportOptions::skipping(skip.clone()),
        )
        .unwrap();
        let expected = names
            .iter()
            .filter(|name| !skip.iter().any(|s| name.contains(s)))
            .count();
        assert_eq!(imported.meshes.len(), expected, "skip list {:?}", skip);
        assert!(imported.aabb.min.x <= imported.aabb.max.x);
        assert!(imported.aabb.min.y <= imported.aabb.max.y);
        assert!(imported.aabb.min.z <= imported.aabb.max.z);
    }
}

#[test]
fn meshes_are_collected_depth_first() {
    let dir = tempfile::tempdir().unwrap();
    let root = SceneNode::new("root")
        .with_meshes([0])
        .with_child(SceneNode::new("a").with_meshes([1]).with_child(SceneNode::new("a1").with_meshes([2])))
        .with_child(SceneNode::new("b").with_meshes([3]));
    let scene = SceneGraph {
        root: Some(root),
        meshes: ["root", "a", "a1", "b"]
            .iter()
            .map(|name| triangle(name, [0.0; 3], None))
            .collect(),
        ..Default::default()
    };

    let imported = import_scene(&scene, &dir.path().join("m.gltf"), &ImportOptions::default()).unwrap();

    let names: Vec<_> = imported.meshes.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["root", "a", "a1", "b"]);
}

#[test]
fn skipping_everything_leaves_an_empty_model() {
    let dir = tempfile::tempdir().unwrap();
    let scene = SceneGraph {
        root: Some(flat_root(2)),
        meshes: vec![
            triangle("Rock", [0.0; 3], None),
            triangle("Tree", [3.0; 3], None),
        ],
        ..Default::default()
    };

    let imported = import_scene(
        &scene,
        &dir.path().join("model.gltf"),
        &ImportOptions::skipping(["Rock", "Tree"]),
    )
    .unwrap();

    assert!(imported.meshes.is_empty());
    assert!(imported.aabb.is_empty());
    assert_eq!(imported.aabb.center(), None);
    assert_eq!(imported.aabb.min.x, f32::INFINITY);
    assert_eq!(imported.aabb.max.x, f32::NEG_INFINITY);
}

#[test]
fn repeated_locator_is_decoded_once_and_shared() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("wood.png"), 4, 2);
    let scene = SceneGraph {
        root: Some(flat_root(1)),
        meshes: vec![triangle("Table", [0.0; 3], Some(0))],
        materials: vec![
            SceneMaterial::new("wood")
                .with_texture(TextureType::Diffuse, "wood.png")
                .with_texture(TextureType::Diffuse, "wood.png"),
        ],
        ..Default::default()
    };

    let imported = import_scene(&scene, &dir.path().join("table.obj"), &ImportOptions::default()).unwrap();

    let textures = &imported.meshes[0].textures;
    assert_eq!(textures.len(), 2);
    assert!(Rc::ptr_eq(&textures[0].source, &textures[1].source));
    assert_eq!(textures[0].slot, 0);
    assert_eq!(textures[1].slot, 1);
    assert!(textures[0].source.is_valid());
    assert_eq!(textures[0].source.dimensions(), Some((4, 2)));
    assert_eq!(imported.stats.textures_decoded, 1);
    assert_eq!(imported.stats.cache_hits, 1);
    assert_eq!(imported.textures.len(), 1);
    assert!(Rc::ptr_eq(&imported.textures["wood.png"], &textures[0].source));
}

#[test]
fn texture_cache_is_shared_between_meshes() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("wood.png"), 2, 2);
    let scene = SceneGraph {
        root: Some(flat_root(2)),
        meshes: vec![
            triangle("Leg", [0.0; 3], Some(0)),
            triangle("Top", [0.0; 3], Some(0)),
        ],
        materials: vec![SceneMaterial::new("wood").with_texture(TextureType::BaseColor, "wood.png")],
        ..Default::default()
    };

    let imported = import_scene(&scene, &dir.path().join("table.obj"), &ImportOptions::default()).unwrap();

    assert!(Rc::ptr_eq(
        &imported.meshes[0].textures[0].source,
        &imported.meshes[1].textures[0].source
    ));
    assert_eq!(imported.stats.textures_decoded, 1);
}

#[test]
fn one_source_used_as_colour_and_normal_needs_two_uploads() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("bumps.png"), 2, 2);
    let scene = SceneGraph {
        root: Some(flat_root(3)),
        meshes: vec![
            triangle("Rock", [0.0; 3], Some(0)),
            triangle("Wall", [0.0; 3], Some(1)),
            triangle("Trim", [0.0; 3], Some(2)),
        ],
        materials: vec![
            SceneMaterial::new("rock").with_texture(TextureType::Normals, "bumps.png"),
            SceneMaterial::new("wall").with_texture(TextureType::BaseColor, "bumps.png"),
            SceneMaterial::new("trim").with_texture(TextureType::Specular, "bumps.png"),
        ],
        ..Default::default()
    };

    let imported = import_scene(&scene, &dir.path().join("cave.obj"), &ImportOptions::default()).unwrap();
    assert_eq!(imported.stats.textures_decoded, 1);

    let key = |mesh: usize| {
        let binding = &imported.meshes[mesh].textures[0];
        UploadKey::new(&binding.source, binding.kind)
    };
    assert_eq!(imported.meshes[0].textures[0].kind, TextureKind::Normal);
    assert_ne!(key(0), key(1));
    assert_eq!(key(1), key(2));
}

#[test]
fn textures_are_bound_in_lookup_order_with_their_kind() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["base.png", "diffuse.png", "spec.png", "normal.png"] {
        write_png(&dir.path().join(name), 1, 1);
    }
    let scene = SceneGraph {
        root: Some(flat_root(1)),
        meshes: vec![triangle("Crate", [0.0; 3], Some(0))],
        // Declared out of order on purpose.
        materials: vec![
            SceneMaterial::new("crate")
                .with_texture(TextureType::Normals, "normal.png")
                .with_texture(TextureType::Specular, "spec.png")
                .with_texture(TextureType::Diffuse, "diffuse.png")
                .with_texture(TextureType::BaseColor, "base.png"),
        ],
        ..Default::default()
    };

    let imported = import_scene(&scene, &dir.path().join("crate.obj"), &ImportOptions::default()).unwrap();

    let bound: Vec<_> = imported.meshes[0]
        .textures
        .iter()
        .map(|t| (t.kind, t.locator.as_str()))
        .collect();
    assert_eq!(
        bound,
        [
            (TextureKind::Diffuse, "base.png"),
            (TextureKind::Diffuse, "diffuse.png"),
            (TextureKind::Specular, "spec.png"),
            (TextureKind::Normal, "normal.png"),
        ]
    );
}

#[test]
fn missing_texture_file_gives_an_invalid_source() {
    let dir = tempfile::tempdir().unwrap();
    let scene = SceneGraph {
        root: Some(flat_root(1)),
        meshes: vec![triangle("Table", [0.0; 3], Some(0))],
        materials: vec![SceneMaterial::new("wood").with_texture(TextureType::Diffuse, "missing.png")],
        ..Default::default()
    };

    let imported = import_scene(&scene, &dir.path().join("table.obj"), &ImportOptions::default()).unwrap();

    let textures = &imported.meshes[0].textures;
    assert_eq!(textures.len(), 1);
    assert!(!textures[0].source.is_valid());
}

#[test]
fn untextured_mesh_falls_back_to_textures_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("textures").join("Albedo_Basecolor.png"), 2, 2);
    let scene = SceneGraph {
        root: Some(flat_root(1)),
        meshes: vec![triangle("Statue", [0.0; 3], None)],
        ..Default::default()
    };

    let imported = import_scene(&scene, &dir.path().join("statue.gltf"), &ImportOptions::default()).unwrap();

    let textures = &imported.meshes[0].textures;
    assert_eq!(textures.len(), 1);
    assert_eq!(textures[0].kind, TextureKind::Diffuse);
    assert!(textures[0].locator.ends_with("Albedo_Basecolor.png"));
    assert!(textures[0].source.is_valid());
    assert_eq!(imported.stats.fallback_textures, 1);
}

#[test]
fn fallback_adds_a_normal_map_and_decodes_once_per_import() {
    let dir = tempfile::tempdir().unwrap();
    let textures_dir = dir.path().join("textures");
    write_png(&textures_dir.join("stone_albedo.png"), 2, 2);
    write_png(&textures_dir.join("stone_nrm.png"), 2, 2);
    let scene = SceneGraph {
        root: Some(flat_root(2)),
        meshes: vec![
            triangle("A", [0.0; 3], None),
            triangle("B", [0.0; 3], None),
        ],
        ..Default::default()
    };

    let imported = import_scene(&scene, &dir.path().join("stone.obj"), &ImportOptions::default()).unwrap();

    for mesh in &imported.meshes {
        let kinds: Vec<_> = mesh.textures.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, [TextureKind::Diffuse, TextureKind::Normal]);
    }
    assert!(Rc::ptr_eq(
        &imported.meshes[0].textures[0].source,
        &imported.meshes[1].textures[0].source
    ));
    assert_eq!(imported.stats.textures_decoded, 2);
    assert_eq!(imported.stats.fallback_textures, 4);
}

#[test]
fn scene_with_embedded_textures_never_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("textures").join("albedo.png"), 2, 2);
    let scene = SceneGraph {
        root: Some(flat_root(1)),
        meshes: vec![triangle("Bare", [0.0; 3], None)],
        embedded_textures: vec![EmbeddedTexture {
            bytes: png_bytes(1, 1),
            format_hint: Some("png".to_string()),
        }],
        ..Default::default()
    };

    let imported = import_scene(&scene, &dir.path().join("m.gltf"), &ImportOptions::default()).unwrap();

    assert!(imported.meshes[0].textures.is_empty());
    assert_eq!(imported.stats.fallback_textures, 0);
}

#[test]
fn fallback_directory_is_configurable() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("maps").join("diffuse.png"), 1, 1);
    let scene = SceneGraph {
        root: Some(flat_root(1)),
        meshes: vec![triangle("Bare", [0.0; 3], None)],
        ..Default::default()
    };
    let options = ImportOptions {
        textures_dir: "maps".to_string(),
        ..Default::default()
    };

    let imported = import_scene(&scene, &dir.path().join("m.obj"), &options).unwrap();

    assert_eq!(imported.meshes[0].textures.len(), 1);
}

#[test]
fn embedded_locator_resolves_by_index() {
    assert_eq!(parse_embedded_locator("*3"), Some(3));
    assert_eq!(parse_embedded_locator("*0"), Some(0));
    assert_eq!(parse_embedded_locator("wood.png"), None);
    assert_eq!(parse_embedded_locator("*"), None);
    assert_eq!(parse_embedded_locator("*x"), None);

    let dir = tempfile::tempdir().unwrap();
    let scene = SceneGraph {
        root: Some(flat_root(1)),
        meshes: vec![triangle("Mug", [0.0; 3], Some(0))],
        materials: vec![SceneMaterial::new("glaze").with_texture(TextureType::BaseColor, "*1")],
        embedded_textures: vec![
            EmbeddedTexture {
                bytes: png_bytes(1, 1),
                format_hint: Some("png".to_string()),
            },
            EmbeddedTexture {
                bytes: png_bytes(3, 1),
                format_hint: None,
            },
        ],
    };

    let imported = import_scene(&scene, &dir.path().join("mug.glb"), &ImportOptions::default()).unwrap();

    let source = &imported.meshes[0].textures[0].source;
    assert!(source.is_valid());
    assert_eq!(source.dimensions(), Some((3, 1)));
}

#[test]
fn embedded_index_out_of_range_gives_an_invalid_source() {
    let dir = tempfile::tempdir().unwrap();
    let scene = SceneGraph {
        root: Some(flat_root(1)),
        meshes: vec![triangle("Mug", [0.0; 3], Some(0))],
        materials: vec![SceneMaterial::new("glaze").with_texture(TextureType::BaseColor, "*5")],
        embedded_textures: vec![EmbeddedTexture {
            bytes: png_bytes(1, 1),
            format_hint: None,
        }],
    };

    let imported = import_scene(&scene, &dir.path().join("mug.glb"), &ImportOptions::default()).unwrap();

    assert!(!imported.meshes[0].textures[0].source.is_valid());
}

#[test]
fn scene_without_root_is_an_import_error() {
    let scene = SceneGraph {
        root: None,
        meshes: vec![triangle("Orphan", [0.0; 3], None)],
        ..Default::default()
    };

    let result = import_scene(&scene, std::path::Path::new("orphan.gltf"), &ImportOptions::default());

    assert!(matches!(result, Err(ImportError::Incomplete { .. })));
}

#[test]
fn dangling_mesh_index_is_an_import_error() {
    let scene = SceneGraph {
        root: Some(flat_root(2)),
        meshes: vec![triangle("Only", [0.0; 3], None)],
        ..Default::default()
    };

    let result = import_scene(&scene, std::path::Path::new("m.gltf"), &ImportOptions::default());

    assert!(matches!(result, Err(ImportError::Incomplete { .. })));
}

#[test]
fn unknown_extension_is_rejected() {
    let result = import_model(std::path::Path::new("scene.fbx"), &ImportOptions::default());
    assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
}

#[test]
fn missing_scene_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = import_model(&dir.path().join("nope.gltf"), &ImportOptions::default());
    assert!(matches!(result, Err(ImportError::Io { .. })));
}

#[test]
fn fallback_scan_picks_the_first_file_by_name() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("b_Albedo.png"), 1, 1);
    write_png(&dir.path().join("a_DIFFUSE.png"), 1, 1);
    write_png(&dir.path().join("c_roughness.png"), 1, 1);

    let found = find_first_matching_texture(dir.path(), &["albedo", "diffuse"]).unwrap();
    assert_eq!(found.file_name().unwrap(), "a_DIFFUSE.png");

    assert_eq!(find_first_matching_texture(dir.path(), &["metal"]), None);
    assert_eq!(find_first_matching_texture(&dir.path().join("missing"), &["albedo"]), None);
}

#[test]
fn small_sibling_meshes_with_one_name_and_material_are_merged() {
    let mut tail = triangle("Body", [2.0, 0.0, 0.0], Some(0));
    tail.tex_coords = None;
    let mut scene = SceneGraph {
        root: Some(flat_root(4)),
        meshes: vec![
            triangle("Body", [0.0, 0.0, 0.0], Some(0)),
            tail,
            triangle("Body", [4.0, 0.0, 0.0], Some(1)),
            triangle("Wheel", [6.0, 0.0, 0.0], Some(1)),
        ],
        materials: vec![SceneMaterial::new("paint"), SceneMaterial::new("rubber")],
        ..Default::default()
    };

    assert_eq!(scene.merge_small_meshes(SMALL_MESH_VERTICES), 1);

    let root = scene.root.as_ref().unwrap();
    assert_eq!(root.meshes, [0, 2, 3]);
    let body = &scene.meshes[0];
    assert_eq!(body.positions.len(), 6);
    assert_eq!(body.triangles, [[0, 1, 2], [3, 4, 5]]);
    let uvs = body.tex_coords.as_ref().unwrap();
    assert_eq!(uvs.len(), 6);
    assert_eq!(uvs[4], [0.0, 0.0]);

    let imported = import_scene(
        &scene,
        &tempfile::tempdir().unwrap().path().join("model.gltf"),
        &ImportOptions::default(),
    )
    .unwrap();
    assert_eq!(imported.meshes.len(), 3);
    assert_eq!(imported.meshes[0].indices, [0, 1, 2, 3, 4, 5]);
    assert!(approx3(imported.aabb.max.into(), [7.0, 1.0, 0.0]));
}

#[test]
fn merging_respects_the_vertex_limit_and_shared_meshes() {
    let meshes = vec![
        triangle("Part", [0.0; 3], None),
        triangle("Part", [1.0, 0.0, 0.0], None),
        triangle("Part", [2.0, 0.0, 0.0], None),
    ];

    let mut limited = SceneGraph {
        root: Some(flat_root(3)),
        meshes: meshes.clone(),
        ..Default::default()
    };
    assert_eq!(limited.merge_small_meshes(6), 1);
    assert_eq!(limited.root.unwrap().meshes, [0, 2]);

    let mut shared = SceneGraph {
        root: Some(flat_root(3).with_child(SceneNode::new("again").with_meshes([1]))),
        meshes,
        ..Default::default()
    };
    assert_eq!(shared.merge_small_meshes(SMALL_MESH_VERTICES), 0);
    assert_eq!(shared.root.unwrap().meshes, [0, 1, 2]);
}
