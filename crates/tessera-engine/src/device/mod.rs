//! GPU device layer.
//!
//! This module is responsible for:
//! - the `Device` contract every backend implements (resource creation, uniform
//!   upload, clears and indexed draws)
//! - `GpuContext`, the explicit binding-state object that replaces the implicit
//!   "currently bound" globals of a GL-style API
//! - the software device used by tests and the wgpu device used on hardware
//! - window-bound GPU setup (`Gpu`) for the studio runtime

mod context;
mod error;
mod gpu;
mod soft;
mod state;
mod types;
mod wgpu_device;

pub use context::{GpuContext, SharedContext};
pub use error::{DeviceError, DeviceResult, GpuError, GpuResult, SurfaceErrorAction};
pub use gpu::{Gpu, GpuInit};
pub use soft::{DrawRecord, SoftDevice};
pub use state::BindingState;
pub use types::{
    AttributePointer, BufferId, BufferTarget, BufferUsage, ComponentType, DrawCall, ProgramId,
    ShaderId, ShaderStage, TextureDesc, TextureId, UniformLocation, UniformValue, VertexArrayId,
    MAX_TEXTURE_UNITS,
};
pub use wgpu_device::WgpuDevice;

use crate::coords::ColorRgba;

/// Resource backend contract.
///
/// A device owns the actual GPU objects and knows nothing about binding state:
/// every operation receives explicit handles. `GpuContext` resolves
/// "currently bound" objects before calling in here.
///
/// Handles are never zero; zero is reserved for "nothing bound".
pub trait Device {
    /// Creates a buffer of `size` bytes. With `data = None` the storage is
    /// reserved but left unspecified.
    fn create_buffer(
        &mut self,
        size: u64,
        data: Option<&[u8]>,
        usage: BufferUsage,
    ) -> DeviceResult<BufferId>;

    /// Overwrites `data.len()` bytes starting at `offset`. Never reallocates.
    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> DeviceResult<()>;

    fn destroy_buffer(&mut self, id: BufferId) -> DeviceResult<()>;

    fn create_vertex_array(&mut self) -> DeviceResult<VertexArrayId>;

    fn enable_attribute(&mut self, array: VertexArrayId, slot: u32) -> DeviceResult<()>;

    /// Describes how attribute `slot` of `array` reads from `buffer`.
    fn describe_attribute(
        &mut self,
        array: VertexArrayId,
        buffer: BufferId,
        slot: u32,
        pointer: &AttributePointer,
    ) -> DeviceResult<()>;

    fn destroy_vertex_array(&mut self, id: VertexArrayId) -> DeviceResult<()>;

    /// Compiles one shader stage. On failure the stage object is discarded and
    /// the driver diagnostic is returned in `DeviceError::Compile`.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> DeviceResult<ShaderId>;

    fn destroy_shader(&mut self, id: ShaderId) -> DeviceResult<()>;

    /// Links and validates a program from two compiled stages.
    ///
    /// The stage objects stay alive until destroyed by the caller.
    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> DeviceResult<ProgramId>;

    fn destroy_program(&mut self, id: ProgramId) -> DeviceResult<()>;

    /// Looks a uniform up by name. `Ok(None)` means the program has no such uniform.
    fn uniform_location(
        &mut self,
        program: ProgramId,
        name: &str,
    ) -> DeviceResult<Option<UniformLocation>>;

    fn set_uniform(
        &mut self,
        program: ProgramId,
        location: UniformLocation,
        value: &UniformValue,
    ) -> DeviceResult<()>;

    /// Uploads an RGBA8 image. `pixels.len()` must equal `width * height * 4`.
    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> DeviceResult<TextureId>;

    fn destroy_texture(&mut self, id: TextureId) -> DeviceResult<()>;

    /// Clears the color target.
    fn clear(&mut self, color: ColorRgba) -> DeviceResult<()>;

    /// Issues one indexed triangle-list draw.
    fn draw_indexed(&mut self, call: &DrawCall) -> DeviceResult<()>;

    /// Returns a fault reported after the call that caused it, if any.
    ///
    /// Backends with synchronous validation keep the default.
    fn take_pending_error(&mut self) -> Option<DeviceError> {
        None
    }
}
