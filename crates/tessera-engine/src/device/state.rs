use crate::coords::ColorRgba;

use super::types::{BufferId, BufferTarget, ProgramId, TextureId, VertexArrayId, MAX_TEXTURE_UNITS};

/// Everything a GL-style API keeps as "currently bound".
///
/// Mutated only through `GpuContext`. Nothing is saved or restored implicitly:
/// a component that needs a different object bound binds it itself.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingState {
    pub vertex_array: Option<VertexArrayId>,
    pub array_buffer: Option<BufferId>,
    pub element_buffer: Option<BufferId>,
    pub program: Option<ProgramId>,
    pub active_unit: u32,
    pub texture_units: [Option<TextureId>; MAX_TEXTURE_UNITS],
    pub clear_color: ColorRgba,
}

impl Default for BindingState {
    fn default() -> Self {
        Self {
            vertex_array: None,
            array_buffer: None,
            element_buffer: None,
            program: None,
            active_unit: 0,
            texture_units: [None; MAX_TEXTURE_UNITS],
            clear_color: ColorRgba::black(),
        }
    }
}

impl BindingState {
    #[inline]
    pub fn buffer(&self, target: BufferTarget) -> Option<BufferId> {
        match target {
            BufferTarget::Array => self.array_buffer,
            BufferTarget::ElementArray => self.element_buffer,
        }
    }

    pub(crate) fn set_buffer(&mut self, target: BufferTarget, id: Option<BufferId>) {
        match target {
            BufferTarget::Array => self.array_buffer = id,
            BufferTarget::ElementArray => self.element_buffer = id,
        }
    }

    /// Drops every reference to a destroyed buffer.
    pub(crate) fn forget_buffer(&mut self, id: BufferId) {
        if self.array_buffer == Some(id) {
            self.array_buffer = None;
        }
        if self.element_buffer == Some(id) {
            self.element_buffer = None;
        }
    }

    pub(crate) fn forget_texture(&mut self, id: TextureId) {
        for unit in self.texture_units.iter_mut() {
            if *unit == Some(id) {
                *unit = None;
            }
        }
    }
}
