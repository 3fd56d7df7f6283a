/**
 * This module contains all logic for loading meshes and textures from external files.
 *
 * Nothing in here touches the GPU: loaders produce a `scene::SceneGraph`, the
 * importer turns it into an `import::ImportedModel` ready for upload.
 */
pub mod gltf_loader;
pub mod import;
pub mod obj_loader;
pub mod scene;
pub mod texture;
