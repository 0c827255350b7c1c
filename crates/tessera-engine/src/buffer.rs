//! Owned GPU buffers.
//!
//! `GpuBuffer` owns one device buffer and releases it on drop. `VertexBuffer`
//! and `IndexBuffer` pin it to a binding target; the index buffer also tracks
//! how many `u32` indices it currently holds.

use std::rc::Rc;

use crate::device::{
    BufferId, BufferTarget, BufferUsage, Device, DeviceError, GpuResult, SharedContext,
};

/// Size of one index in bytes (indices are always `u32`).
pub const INDEX_SIZE: u64 = std::mem::size_of::<u32>() as u64;

pub struct GpuBuffer<D: Device> {
    ctx: SharedContext<D>,
    id: BufferId,
    size: u64,
    usage: BufferUsage,
    target: BufferTarget,
}

impl<D: Device> GpuBuffer<D> {
    /// Creates a buffer of `size` bytes. `data = None` reserves the storage
    /// without initializing it.
    #[track_caller]
    pub fn new(
        ctx: &SharedContext<D>,
        target: BufferTarget,
        data: Option<&[u8]>,
        size: u64,
        usage: BufferUsage,
    ) -> GpuResult<Self> {
        let id = ctx.create_buffer(size, data, usage)?;
        log::trace!("created {id}: {size} bytes, {usage:?}, {target:?}");
        Ok(Self {
            ctx: Rc::clone(ctx),
            id,
            size,
            usage,
            target,
        })
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Reserved size in bytes; never changes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn bind(&self) {
        self.ctx.bind_buffer(self.target, Some(self.id));
    }

    pub fn unbind(&self) {
        self.ctx.bind_buffer(self.target, None);
    }

    /// Overwrites `data.len()` bytes at `offset` without reallocating.
    ///
    /// Only dynamic buffers accept updates, and the range must lie inside the
    /// reserved size. Binds the buffer to its target as a side effect.
    #[track_caller]
    pub fn update_sub_range(&self, offset: u64, data: &[u8]) -> GpuResult<()> {
        if self.usage != BufferUsage::Dynamic {
            return Err(self.ctx.reject(
                "buffer_sub_data",
                DeviceError::InvalidOperation(format!("{} is static", self.id)),
            ));
        }
        if let Err(err) = DeviceError::check_range(self.id.raw(), offset, data.len(), self.size) {
            return Err(self.ctx.reject("buffer_sub_data", err));
        }
        self.bind();
        self.ctx.buffer_sub_data(self.target, offset, data)
    }
}

impl<D: Device> Drop for GpuBuffer<D> {
    fn drop(&mut self) {
        log::trace!("destroying {}", self.id);
        let _ = self.ctx.destroy_buffer(self.id);
    }
}

/// Vertex attribute storage.
pub struct VertexBuffer<D: Device> {
    buffer: GpuBuffer<D>,
}

impl<D: Device> VertexBuffer<D> {
    /// Uploads `data` once into a static buffer.
    #[track_caller]
    pub fn new(ctx: &SharedContext<D>, data: &[u8]) -> GpuResult<Self> {
        let buffer = GpuBuffer::new(
            ctx,
            BufferTarget::Array,
            Some(data),
            data.len() as u64,
            BufferUsage::Static,
        )?;
        Ok(Self { buffer })
    }

    /// Reserves `size` bytes of dynamic storage.
    #[track_caller]
    pub fn reserve(ctx: &SharedContext<D>, size: u64) -> GpuResult<Self> {
        let buffer = GpuBuffer::new(ctx, BufferTarget::Array, None, size, BufferUsage::Dynamic)?;
        Ok(Self { buffer })
    }

    #[track_caller]
    pub fn update(&self, offset: u64, data: &[u8]) -> GpuResult<()> {
        self.buffer.update_sub_range(offset, data)
    }

    pub fn bind(&self) {
        self.buffer.bind();
    }

    pub fn unbind(&self) {
        self.buffer.unbind();
    }

    pub fn buffer(&self) -> &GpuBuffer<D> {
        &self.buffer
    }
}

/// `u32` index storage plus the number of indices a draw should read.
///
/// `count * 4 <= size` holds at all times.
pub struct IndexBuffer<D: Device> {
    buffer: GpuBuffer<D>,
    count: u32,
}

impl<D: Device> IndexBuffer<D> {
    /// Uploads `indices` once into a static buffer.
    #[track_caller]
    pub fn new(ctx: &SharedContext<D>, indices: &[u32]) -> GpuResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        let buffer = GpuBuffer::new(
            ctx,
            BufferTarget::ElementArray,
            Some(bytes),
            bytes.len() as u64,
            BufferUsage::Static,
        )?;
        Ok(Self {
            buffer,
            count: indices.len() as u32,
        })
    }

    /// Reserves room for `capacity` indices; the buffer starts out empty.
    #[track_caller]
    pub fn reserve(ctx: &SharedContext<D>, capacity: u32) -> GpuResult<Self> {
        let buffer = GpuBuffer::new(
            ctx,
            BufferTarget::ElementArray,
            None,
            capacity as u64 * INDEX_SIZE,
            BufferUsage::Dynamic,
        )?;
        Ok(Self { buffer, count: 0 })
    }

    /// Replaces the contents with `indices` (dynamic buffers only).
    #[track_caller]
    pub fn update(&mut self, indices: &[u32]) -> GpuResult<()> {
        self.buffer.update_sub_range(0, bytemuck::cast_slice(indices))?;
        self.count = indices.len() as u32;
        Ok(())
    }

    /// Number of indices a draw reads.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Number of indices the buffer can hold.
    #[inline]
    pub fn capacity(&self) -> u32 {
        (self.buffer.size() / INDEX_SIZE) as u32
    }

    pub fn bind(&self) {
        self.buffer.bind();
    }

    pub fn unbind(&self) {
        self.buffer.unbind();
    }

    pub fn buffer(&self) -> &GpuBuffer<D> {
        &self.buffer
    }
}
