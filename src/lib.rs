//! render-scaffold
//!
//! A small real-time 3D rendering scaffold on top of wgpu. It wraps the GPU
//! objects a forward renderer needs, imports glTF and OBJ scenes into
//! drawable models with a shared texture cache, and drives a free-fly or
//! orbiting camera from window input.
//!
//! High-level modules
//! - `camera`: free/cinema camera, its settings and the input it reads
//! - `context`: window, surface, device/queue and the camera they render with
//! - `data_structures`: GPU-side objects (geometry buffers, textures, models, skybox)
//! - `error`: error types for import, decode and shader compilation
//! - `flow`: the `GraphicsFlow` trait and the winit run loop
//! - `math`: rotation helpers (euler, slerp, easing)
//! - `pipelines`: shader programs, their uniform blocks and render pipelines
//! - `resources`: CPU-side scene loading, texture decoding and the model importer
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod math;
pub mod pipelines;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use camera::{Camera, CameraMode, CameraSettings, InputState};
pub use context::Context;
pub use data_structures::model::{Aabb, Mesh, Model};
pub use flow::{FlowConstructor, GraphicsFlow, run};
pub use pipelines::shader::{ProgramDescriptor, ShaderProgram};
pub use resources::import::{ImportOptions, ImportedModel, import_model};

pub use cgmath;
pub use wgpu;
pub use winit::event::{DeviceEvent, WindowEvent};
