//! Shader programs and the render pipelines they are linked into.

pub mod basic;
pub mod shader;
pub mod uniform;
