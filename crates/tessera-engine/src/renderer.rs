use std::rc::Rc;

use crate::buffer::IndexBuffer;
use crate::coords::ColorRgba;
use crate::device::{Device, GpuResult, SharedContext};
use crate::shader::Shader;
use crate::vertex_array::VertexArray;

/// Issues clears and draws; the only place geometry reaches the device.
pub struct Renderer<D: Device> {
    ctx: SharedContext<D>,
}

impl<D: Device> Renderer<D> {
    pub fn new(ctx: &SharedContext<D>) -> Self {
        Self {
            ctx: Rc::clone(ctx),
        }
    }

    pub fn set_clear_color(&self, color: ColorRgba) {
        self.ctx.set_clear_color(color);
    }

    /// Clears the color target with the current clear color.
    #[track_caller]
    pub fn clear(&self) -> GpuResult<()> {
        self.ctx.clear()
    }

    /// Binds the vertex array, the index buffer and the shader (in that order)
    /// and draws `index_buffer.count()` indices.
    #[track_caller]
    pub fn draw(
        &self,
        vertex_array: &VertexArray<D>,
        index_buffer: &IndexBuffer<D>,
        shader: &Shader<D>,
    ) -> GpuResult<()> {
        vertex_array.bind();
        index_buffer.bind();
        shader.bind()?;
        self.ctx.draw_elements(index_buffer.count())
    }
}
