use std::rc::Rc;

use crate::buffer::VertexBuffer;
use crate::device::{Device, GpuResult, SharedContext, VertexArrayId};
use crate::layout::VertexLayout;

/// Binds vertex buffers to attribute slots.
///
/// Each `add_buffer` appends slots after the ones already described, so a
/// second buffer never disturbs the first.
pub struct VertexArray<D: Device> {
    ctx: SharedContext<D>,
    id: VertexArrayId,
    slots: u32,
}

impl<D: Device> VertexArray<D> {
    #[track_caller]
    pub fn new(ctx: &SharedContext<D>) -> GpuResult<Self> {
        let id = ctx.create_vertex_array()?;
        log::trace!("created {id}");
        Ok(Self {
            ctx: Rc::clone(ctx),
            id,
            slots: 0,
        })
    }

    #[inline]
    pub fn id(&self) -> VertexArrayId {
        self.id
    }

    /// Number of attribute slots described so far.
    #[inline]
    pub fn slot_count(&self) -> u32 {
        self.slots
    }

    /// Describes every attribute of `layout` as reading from `buffer`.
    ///
    /// Leaves this array and `buffer` bound.
    #[track_caller]
    pub fn add_buffer(&mut self, buffer: &VertexBuffer<D>, layout: &VertexLayout) -> GpuResult<()> {
        self.bind();
        buffer.bind();
        for index in 0..layout.len() {
            let Some(pointer) = layout.pointer(index) else {
                break;
            };
            let slot = self.slots + index as u32;
            self.ctx.enable_attribute(slot)?;
            self.ctx.attribute_pointer(slot, &pointer)?;
        }
        self.slots += layout.len() as u32;
        Ok(())
    }

    pub fn bind(&self) {
        self.ctx.bind_vertex_array(Some(self.id));
    }

    pub fn unbind(&self) {
        self.ctx.bind_vertex_array(None);
    }
}

impl<D: Device> Drop for VertexArray<D> {
    fn drop(&mut self) {
        log::trace!("destroying {}", self.id);
        let _ = self.ctx.destroy_vertex_array(self.id);
    }
}
