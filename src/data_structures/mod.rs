//! GPU-side data structures: geometry, textures, models and the skybox.
//!
//! - `buffer` owns a vertex buffer and optional index buffer
//! - `texture` wraps GPU textures, their samplers and bind groups
//! - `instance` holds a translation/rotation/scale transform
//! - `model` contains meshes and models built from imported scenes
//! - `cubemap` and `skybox` draw an environment around the camera

pub mod buffer;
pub mod cubemap;
pub mod instance;
pub mod model;
pub mod skybox;
pub mod texture;
