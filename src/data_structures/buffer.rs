use wgpu::util::DeviceExt;

/// Vertex storage plus an optional `u32` index list, uploaded once.
///
/// The buffers are released on [`delete`](Self::delete) or on drop,
/// whichever comes first.
#[derive(Debug)]
pub struct GeometryBuffer {
    label: String,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
    index_count: u32,
}

impl GeometryBuffer {
    pub fn new<V: bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        vertices: &[V],
        indices: Option<&[u32]>,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = indices.map(|indices| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Index Buffer", label)),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });

        Self {
            label: label.to_string(),
            vertex_buffer: Some(vertex_buffer),
            index_buffer,
            vertex_count: vertices.len() as u32,
            index_count: indices.map_or(0, |i| i.len() as u32),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.vertex_buffer.is_none()
    }

    /// Set the vertex buffer on slot 0 and the index buffer, if any.
    ///
    /// There is no matching unbind: pass state ends with the render pass.
    /// Returns false after [`delete`](Self::delete) or for empty geometry.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) -> bool {
        let Some(vertex_buffer) = &self.vertex_buffer else {
            return false;
        };
        if self.vertex_count == 0 {
            return false;
        }
        render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        if let Some(index_buffer) = &self.index_buffer {
            if self.index_count > 0 {
                render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            }
        }
        true
    }

    /// Bind and issue one draw, indexed when an index list was given.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if !self.bind(render_pass) {
            return;
        }
        match &self.index_buffer {
            Some(_) if self.index_count > 0 => render_pass.draw_indexed(0..self.index_count, 0, 0..1),
            Some(_) => {}
            None => render_pass.draw(0..self.vertex_count, 0..1),
        }
    }

    /// Release the GPU buffers. Calling it again does nothing.
    pub fn delete(&mut self) {
        if let Some(buffer) = self.vertex_buffer.take() {
            buffer.destroy();
            log::debug!("Released geometry {:?}", self.label);
        }
        if let Some(buffer) = self.index_buffer.take() {
            buffer.destroy();
        }
    }
}

impl Drop for GeometryBuffer {
    fn drop(&mut self) {
        self.delete();
    }
}
