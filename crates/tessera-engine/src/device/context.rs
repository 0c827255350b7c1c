use std::cell::{Ref, RefCell, RefMut};
use std::panic::Location;
use std::rc::Rc;

use crate::coords::ColorRgba;

use super::error::{DeviceError, DeviceResult, GpuError, GpuResult};
use super::state::BindingState;
use super::types::{
    AttributePointer, BufferId, BufferTarget, BufferUsage, DrawCall, ProgramId, ShaderId,
    ShaderStage, TextureDesc, TextureId, UniformLocation, UniformValue, VertexArrayId,
    MAX_TEXTURE_UNITS,
};
use super::Device;

/// Context handle shared by every resource wrapper created from it.
pub type SharedContext<D> = Rc<GpuContext<D>>;

/// A device plus its binding state.
///
/// Binding calls only touch `BindingState`; calls that read "the bound X" resolve
/// it here and hand explicit handles to the device. Every device call is checked
/// on the spot: stale errors are drained first, the call runs, pending errors are
/// collected, and a failure is attributed to the caller's source location.
pub struct GpuContext<D: Device> {
    device: RefCell<D>,
    state: RefCell<BindingState>,
}

impl<D: Device> GpuContext<D> {
    pub fn new(device: D) -> Self {
        Self {
            device: RefCell::new(device),
            state: RefCell::new(BindingState::default()),
        }
    }

    /// Creates a context ready to be shared by resource wrappers.
    pub fn shared(device: D) -> SharedContext<D> {
        Rc::new(Self::new(device))
    }

    /// Borrows the device (inspection in tests, frame plumbing in the runtime).
    ///
    /// Must not be held across another call on this context.
    pub fn device(&self) -> Ref<'_, D> {
        self.device.borrow()
    }

    pub fn device_mut(&self) -> RefMut<'_, D> {
        self.device.borrow_mut()
    }

    /// Returns a snapshot of the binding state.
    pub fn binding_state(&self) -> BindingState {
        self.state.borrow().clone()
    }

    // ── binding ───────────────────────────────────────────────────────────

    pub fn bind_buffer(&self, target: BufferTarget, id: Option<BufferId>) {
        self.state.borrow_mut().set_buffer(target, id);
    }

    pub fn bind_vertex_array(&self, id: Option<VertexArrayId>) {
        self.state.borrow_mut().vertex_array = id;
    }

    pub fn use_program(&self, id: Option<ProgramId>) {
        self.state.borrow_mut().program = id;
    }

    /// Selects the texture unit subsequent `bind_texture` calls attach to.
    #[track_caller]
    pub fn active_texture(&self, unit: u32) -> GpuResult<()> {
        if unit as usize >= MAX_TEXTURE_UNITS {
            return Err(self.reject(
                "active_texture",
                DeviceError::InvalidValue(format!(
                    "texture unit {unit} exceeds the {MAX_TEXTURE_UNITS} available"
                )),
            ));
        }
        self.state.borrow_mut().active_unit = unit;
        Ok(())
    }

    /// Attaches `id` to the active texture unit.
    pub fn bind_texture(&self, id: Option<TextureId>) {
        let mut state = self.state.borrow_mut();
        let unit = state.active_unit as usize;
        state.texture_units[unit] = id;
    }

    pub fn set_clear_color(&self, color: ColorRgba) {
        self.state.borrow_mut().clear_color = color;
    }

    // ── buffers ───────────────────────────────────────────────────────────

    #[track_caller]
    pub fn create_buffer(
        &self,
        size: u64,
        data: Option<&[u8]>,
        usage: BufferUsage,
    ) -> GpuResult<BufferId> {
        self.call("create_buffer", |d| d.create_buffer(size, data, usage))
    }

    /// Overwrites part of the buffer bound to `target`.
    #[track_caller]
    pub fn buffer_sub_data(&self, target: BufferTarget, offset: u64, data: &[u8]) -> GpuResult<()> {
        let Some(id) = self.state.borrow().buffer(target) else {
            return Err(self.reject(
                "buffer_sub_data",
                DeviceError::InvalidOperation(format!("no buffer bound to {target:?}")),
            ));
        };
        self.call("buffer_sub_data", |d| d.write_buffer(id, offset, data))
    }

    #[track_caller]
    pub fn destroy_buffer(&self, id: BufferId) -> GpuResult<()> {
        self.state.borrow_mut().forget_buffer(id);
        self.call("destroy_buffer", |d| d.destroy_buffer(id))
    }

    // ── vertex arrays ─────────────────────────────────────────────────────

    #[track_caller]
    pub fn create_vertex_array(&self) -> GpuResult<VertexArrayId> {
        self.call("create_vertex_array", |d| d.create_vertex_array())
    }

    /// Enables `slot` on the bound vertex array.
    #[track_caller]
    pub fn enable_attribute(&self, slot: u32) -> GpuResult<()> {
        let array = self.bound_vertex_array("enable_attribute")?;
        self.call("enable_attribute", |d| d.enable_attribute(array, slot))
    }

    /// Describes `slot` of the bound vertex array as reading from the bound array buffer.
    #[track_caller]
    pub fn attribute_pointer(&self, slot: u32, pointer: &AttributePointer) -> GpuResult<()> {
        let array = self.bound_vertex_array("attribute_pointer")?;
        let Some(buffer) = self.state.borrow().array_buffer else {
            return Err(self.reject(
                "attribute_pointer",
                DeviceError::InvalidOperation("no array buffer bound".into()),
            ));
        };
        self.call("attribute_pointer", |d| {
            d.describe_attribute(array, buffer, slot, pointer)
        })
    }

    #[track_caller]
    pub fn destroy_vertex_array(&self, id: VertexArrayId) -> GpuResult<()> {
        {
            let mut state = self.state.borrow_mut();
            if state.vertex_array == Some(id) {
                state.vertex_array = None;
            }
        }
        self.call("destroy_vertex_array", |d| d.destroy_vertex_array(id))
    }

    // ── shaders ───────────────────────────────────────────────────────────

    #[track_caller]
    pub fn compile_shader(&self, stage: ShaderStage, source: &str) -> GpuResult<ShaderId> {
        self.call("compile_shader", |d| d.compile_shader(stage, source))
    }

    #[track_caller]
    pub fn destroy_shader(&self, id: ShaderId) -> GpuResult<()> {
        self.call("destroy_shader", |d| d.destroy_shader(id))
    }

    #[track_caller]
    pub fn link_program(&self, vertex: ShaderId, fragment: ShaderId) -> GpuResult<ProgramId> {
        self.call("link_program", |d| d.link_program(vertex, fragment))
    }

    #[track_caller]
    pub fn destroy_program(&self, id: ProgramId) -> GpuResult<()> {
        {
            let mut state = self.state.borrow_mut();
            if state.program == Some(id) {
                state.program = None;
            }
        }
        self.call("destroy_program", |d| d.destroy_program(id))
    }

    #[track_caller]
    pub fn uniform_location(
        &self,
        program: ProgramId,
        name: &str,
    ) -> GpuResult<Option<UniformLocation>> {
        self.call("uniform_location", |d| d.uniform_location(program, name))
    }

    #[track_caller]
    pub fn set_uniform(
        &self,
        program: ProgramId,
        location: UniformLocation,
        value: &UniformValue,
    ) -> GpuResult<()> {
        self.call("set_uniform", |d| d.set_uniform(program, location, value))
    }

    // ── textures ──────────────────────────────────────────────────────────

    #[track_caller]
    pub fn create_texture(&self, desc: &TextureDesc, pixels: &[u8]) -> GpuResult<TextureId> {
        self.call("create_texture", |d| d.create_texture(desc, pixels))
    }

    #[track_caller]
    pub fn destroy_texture(&self, id: TextureId) -> GpuResult<()> {
        self.state.borrow_mut().forget_texture(id);
        self.call("destroy_texture", |d| d.destroy_texture(id))
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Clears the color target with the current clear color.
    #[track_caller]
    pub fn clear(&self) -> GpuResult<()> {
        let color = self.state.borrow().clear_color;
        self.call("clear", |d| d.clear(color))
    }

    /// Draws `count` indices from the bound index buffer, reading vertices
    /// through the bound vertex array with the active program.
    #[track_caller]
    pub fn draw_elements(&self, count: u32) -> GpuResult<()> {
        let call = {
            let state = self.state.borrow();
            match (state.vertex_array, state.element_buffer, state.program) {
                (Some(vertex_array), Some(index_buffer), Some(program)) => DrawCall {
                    vertex_array,
                    index_buffer,
                    program,
                    index_count: count,
                    textures: state.texture_units,
                },
                (va, ib, prog) => {
                    let missing = [
                        (va.is_none(), "vertex array"),
                        (ib.is_none(), "index buffer"),
                        (prog.is_none(), "program"),
                    ]
                    .iter()
                    .filter(|(absent, _)| *absent)
                    .map(|(_, name)| *name)
                    .collect::<Vec<_>>()
                    .join(", ");
                    drop(state);
                    return Err(self.reject(
                        "draw_elements",
                        DeviceError::InvalidOperation(format!("nothing bound for: {missing}")),
                    ));
                }
            }
        };
        self.call("draw_elements", |d| d.draw_indexed(&call))
    }

    // ── checking ──────────────────────────────────────────────────────────

    #[track_caller]
    fn bound_vertex_array(&self, call: &'static str) -> GpuResult<VertexArrayId> {
        let bound = self.state.borrow().vertex_array;
        bound.ok_or_else(|| {
            self.reject(
                call,
                DeviceError::InvalidOperation("no vertex array bound".into()),
            )
        })
    }

    #[track_caller]
    fn call<T>(
        &self,
        name: &'static str,
        f: impl FnOnce(&mut D) -> DeviceResult<T>,
    ) -> GpuResult<T> {
        let location = Location::caller();
        let mut device = self.device.borrow_mut();

        while let Some(stale) = device.take_pending_error() {
            log::warn!("{location}: stale device error before {name}: {stale}");
        }

        let result = f(&mut device);

        let mut pending = device.take_pending_error();
        let result = match result {
            Ok(value) => match pending.take() {
                None => Ok(value),
                Some(err) => Err(err),
            },
            Err(err) => Err(err),
        };
        if let Some(extra) = pending {
            log::warn!("{location}: additional device error during {name}: {extra}");
        }
        drop(device);

        result.map_err(|source| self.fail(name, location, source))
    }

    /// Fails a call before it reaches the device, attributed to the caller.
    #[track_caller]
    pub(crate) fn reject(&self, name: &'static str, source: DeviceError) -> GpuError {
        self.fail(name, Location::caller(), source)
    }

    fn fail(
        &self,
        name: &'static str,
        location: &'static Location<'static>,
        source: DeviceError,
    ) -> GpuError {
        log::error!("{location}: {name}: {source}");
        GpuError {
            call: name,
            location,
            source,
        }
    }
}
