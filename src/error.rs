//! Error types shared across the crate.
//!
//! Only [`ImportError`] ever aborts an operation. [`DecodeError`] and
//! [`CompileError`] are logged at the call site and turned into an invalid
//! texture or program so the host can keep running.

use std::path::PathBuf;

/// The scene file could not be turned into a model.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("could not read scene file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse glTF scene {path:?}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("could not parse OBJ scene {path:?}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error("unsupported scene format {0:?}, expected .gltf, .glb or .obj")]
    UnsupportedFormat(PathBuf),
    #[error("scene {path:?} is incomplete: {reason}")]
    Incomplete { path: PathBuf, reason: String },
}

/// Image bytes could not be decoded into pixels.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("could not read image {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode image {label}: {source}")]
    Image {
        label: String,
        #[source]
        source: image::ImageError,
    },
    #[error("embedded texture {index} requested but the scene only embeds {available}")]
    MissingEmbedded { index: usize, available: usize },
    #[error("malformed texture locator {0:?}")]
    InvalidLocator(String),
    #[error("cubemap face {face} is {actual:?}, expected {expected:?}")]
    FaceSizeMismatch {
        face: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// A shader stage failed to compile or the stages failed to link.
///
/// `stage` is one of `VERTEX`, `FRAGMENT` or `PROGRAM`.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{stage} shader failed to parse:\n{message}")]
    Parse { stage: &'static str, message: String },
    #[error("{stage} shader failed validation:\n{message}")]
    Validation { stage: &'static str, message: String },
    #[error("{stage} shader has no {stage} entry point")]
    MissingEntryPoint { stage: &'static str },
    #[error("PROGRAM failed to link: {0}")]
    Link(String),
}
