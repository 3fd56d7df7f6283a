use cgmath::{Matrix3, Matrix4};

use crate::{
    camera::Camera,
    data_structures::{buffer::GeometryBuffer, cubemap::Cubemap, model::Vertex},
    pipelines::shader::ShaderProgram,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkyboxVertex {
    pub position: [f32; 3],
}

impl SkyboxVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
}

impl Vertex for SkyboxVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SkyboxVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Unit cube, two counter-clockwise triangles per face seen from outside.
#[rustfmt::skip]
const CUBE: [[f32; 3]; 36] = [
    // -Z
    [-1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0],
    // +Z
    [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0],
    [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, -1.0, 1.0],
    // -X
    [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0], [-1.0, -1.0, -1.0],
    [-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0],
    // +X
    [1.0, 1.0, 1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0],
    [1.0, -1.0, -1.0], [1.0, 1.0, 1.0], [1.0, -1.0, 1.0],
    // -Y
    [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0],
    // +Y
    [-1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0],
    [1.0, 1.0, 1.0], [-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0],
];

/// A cubemap drawn around the camera. Needs a program built with
/// [`ProgramDescriptor::skybox`](crate::pipelines::shader::ProgramDescriptor::skybox).
#[derive(Debug)]
pub struct Skybox {
    geometry: GeometryBuffer,
    environment: Cubemap,
}

impl Skybox {
    pub fn new(device: &wgpu::Device, environment: Cubemap) -> Self {
        let vertices = CUBE.map(|position| SkyboxVertex { position });
        Self {
            geometry: GeometryBuffer::new(device, "skybox", &vertices, None),
            environment,
        }
    }

    pub fn environment(&self) -> &Cubemap {
        &self.environment
    }

    /// The camera's view with its translation dropped, so the box never moves
    /// relative to the eye.
    pub fn view_rotation(camera: &Camera) -> Matrix4<f32> {
        let view = camera.view();
        Matrix4::from(Matrix3::from_cols(view.x.truncate(), view.y.truncate(), view.z.truncate()))
    }

    pub fn draw(
        &self,
        queue: &wgpu::Queue,
        render_pass: &mut wgpu::RenderPass<'_>,
        camera: &Camera,
        program: &mut ShaderProgram,
    ) {
        if !program.bind(render_pass) {
            log::warn!("Skybox not drawn: shader program is invalid");
            return;
        }
        program.set_mat4("view", &Self::view_rotation(camera));
        program.set_mat4("projection", &camera.projection());
        match program.texture_group("environmentMap") {
            Some(group) => {
                if !self.environment.bind(render_pass, group) {
                    log::debug!("Skybox cubemap is invalid, drawing the default");
                }
            }
            None => log::warn!("Program {:?} has no environmentMap texture", program.label()),
        }
        program.commit(queue, render_pass);
        self.geometry.draw(render_pass);
    }
}
