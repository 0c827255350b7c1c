//! Tessera engine crate.
//!
//! GPU resource wrappers (buffers, vertex layouts, vertex arrays, shaders,
//! textures), quad batching and the renderer, all written against the
//! `device::Device` contract so they run on wgpu or on the software device.

pub mod device;
pub mod logging;
pub mod coords;

pub mod buffer;
pub mod layout;
pub mod vertex_array;
pub mod shader;
pub mod texture;
pub mod batch;
pub mod renderer;
