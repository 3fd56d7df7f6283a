mod common;

use common::test_utils::{png_bytes, solid, write_png};
use render_scaffold::{
    data_structures::cubemap::CubemapFaces,
    error::DecodeError,
    resources::texture::{TextureSource, decode_bytes, decode_file},
};

#[test]
fn png_bytes_decode_to_rgba() {
    let pixels = decode_bytes(&png_bytes(3, 2), "embedded", Some("png")).unwrap();
    assert_eq!(pixels.dimensions(), (3, 2));
    assert_eq!(pixels.get_pixel(0, 0).0, [10, 20, 30, 255]);
}

#[test]
fn format_is_guessed_without_a_hint() {
    let pixels = decode_bytes(&png_bytes(1, 4), "embedded", None).unwrap();
    assert_eq!(pixels.dimensions(), (1, 4));
}

#[test]
fn garbage_bytes_are_a_decode_error() {
    let err = decode_bytes(b"definitely not an image", "junk", None).unwrap_err();
    assert!(matches!(err, DecodeError::Image { ref label, .. } if label == "junk"));
}

#[test]
fn missing_file_is_an_io_error_and_an_invalid_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gone.png");

    assert!(matches!(decode_file(&path), Err(DecodeError::Io { .. })));

    let source = TextureSource::from_file(&path);
    assert!(!source.is_valid());
    assert_eq!(source.dimensions(), None);
    assert!(source.label.ends_with("gone.png"));
}

#[test]
fn file_source_keeps_its_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brick.png");
    write_png(&path, 5, 3);

    let source = TextureSource::from_file(&path);

    assert!(source.is_valid());
    assert_eq!(source.dimensions(), Some((5, 3)));
}

#[test]
fn cubemap_needs_six_equal_faces() {
    let faces = (0..6).map(|_| solid(4, 4, [0, 0, 0, 255])).collect();
    let cube = CubemapFaces::from_images(faces).unwrap();
    assert_eq!(cube.size(), (4, 4));

    let five = (0..5).map(|_| solid(4, 4, [0, 0, 0, 255])).collect();
    assert!(matches!(
        CubemapFaces::from_images(five),
        Err(DecodeError::FaceSizeMismatch { face: 5, .. })
    ));

    let mut uneven: Vec<_> = (0..6).map(|_| solid(4, 4, [0, 0, 0, 255])).collect();
    uneven[3] = solid(4, 2, [0, 0, 0, 255]);
    match CubemapFaces::from_images(uneven) {
        Err(DecodeError::FaceSizeMismatch {
            face,
            expected,
            actual,
        }) => {
            assert_eq!(face, 3);
            assert_eq!(expected, (4, 4));
            assert_eq!(actual, (4, 2));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn cubemap_faces_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<_> = ["right", "left", "top", "bottom", "front", "back"]
        .iter()
        .map(|face| dir.path().join(format!("{}.png", face)))
        .collect();
    for path in &paths {
        write_png(path, 8, 8);
    }

    let faces = CubemapFaces::load([
        paths[0].as_path(),
        paths[1].as_path(),
        paths[2].as_path(),
        paths[3].as_path(),
        paths[4].as_path(),
        paths[5].as_path(),
    ])
    .unwrap();

    assert_eq!(faces.size(), (8, 8));
}
