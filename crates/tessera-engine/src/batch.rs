//! Quad batching.
//!
//! A batch is one vertex block plus one index block covering many quads, so
//! that a single indexed draw renders all of them. Every quad contributes four
//! vertices and the index pattern `[0, 1, 2, 2, 3, 0]` offset by four times its
//! position in the batch.
//!
//! - `StaticBatch` uploads once into static buffers.
//! - `DynamicBatch` reserves both buffers for a fixed number of quads and
//!   rewrites their sub-ranges on every `update`.

use bytemuck::{Pod, Zeroable};

use crate::buffer::{IndexBuffer, VertexBuffer};
use crate::coords::{ColorRgba, Rect};
use crate::device::{Device, GpuError, GpuResult, SharedContext};
use crate::layout::VertexLayout;
use crate::vertex_array::VertexArray;

pub const VERTICES_PER_QUAD: u32 = 4;
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// `tex_index` value of a quad that samples no texture.
pub const NO_TEXTURE: f32 = -1.0;

// ── vertex ────────────────────────────────────────────────────────────────

/// Vertex record shared by all batches (36 bytes).
///
///  offset  0  position   [f32; 2]  slot 0
///  offset  8  color      [f32; 4]  slot 1
///  offset 24  texcoord   [f32; 2]  slot 2
///  offset 32  tex_index  f32       slot 3
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
    pub texcoord: [f32; 2],
    pub tex_index: f32,
}

impl QuadVertex {
    pub fn layout() -> VertexLayout {
        let mut layout = VertexLayout::new();
        layout.push_f32(2).push_f32(4).push_f32(2).push_f32(1);
        layout
    }
}

// ── quad ──────────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quad {
    pub rect: Rect,
    pub color: ColorRgba,
    /// Texture unit sampled by this quad, if any.
    pub texture_slot: Option<u32>,
}

impl Quad {
    pub fn new(rect: Rect, color: ColorRgba) -> Self {
        Self {
            rect,
            color,
            texture_slot: None,
        }
    }

    pub fn with_texture(mut self, slot: u32) -> Self {
        self.texture_slot = Some(slot);
        self
    }

    /// Four vertices, counter-clockwise from the rect origin.
    pub fn vertices(&self) -> [QuadVertex; 4] {
        const TEXCOORDS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let tex_index = self.texture_slot.map_or(NO_TEXTURE, |s| s as f32);
        let color = self.color.to_array();
        let corners = self.rect.corners();
        std::array::from_fn(|i| QuadVertex {
            position: corners[i].to_array(),
            color,
            texcoord: TEXCOORDS[i],
            tex_index,
        })
    }
}

// ── merge ─────────────────────────────────────────────────────────────────

/// Merged vertex and index blocks.
///
/// Every index is below `vertices().len()`, and quad `i` owns vertices
/// `4i..4i+4`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    vertices: Vec<QuadVertex>,
    indices: Vec<u32>,
}

impl Batch {
    pub fn from_quads(quads: &[Quad]) -> Self {
        let mut builder = BatchBuilder::with_capacity(quads.len());
        builder.extend(quads);
        builder.finish()
    }

    pub fn vertices(&self) -> &[QuadVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    #[inline]
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / VERTICES_PER_QUAD as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Appends quads to a batch; reusable across frames through `clear`.
#[derive(Debug, Clone, Default)]
pub struct BatchBuilder {
    batch: Batch,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(quads: usize) -> Self {
        Self {
            batch: Batch {
                vertices: Vec::with_capacity(quads * VERTICES_PER_QUAD as usize),
                indices: Vec::with_capacity(quads * QUAD_INDICES.len()),
            },
        }
    }

    pub fn push(&mut self, quad: &Quad) -> &mut Self {
        let base = self.batch.vertices.len() as u32;
        self.batch.vertices.extend_from_slice(&quad.vertices());
        self.batch
            .indices
            .extend(QUAD_INDICES.iter().map(|i| i + base));
        self
    }

    pub fn extend<'a>(&mut self, quads: impl IntoIterator<Item = &'a Quad>) -> &mut Self {
        for quad in quads {
            self.push(quad);
        }
        self
    }

    /// Empties the batch, keeping its allocations.
    pub fn clear(&mut self) {
        self.batch.vertices.clear();
        self.batch.indices.clear();
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn finish(self) -> Batch {
        self.batch
    }
}

// ── GPU batches ───────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("{requested} quads exceed the {capacity} reserved")]
    CapacityExceeded { requested: usize, capacity: usize },

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// A batch uploaded once; only a shared transform can move it afterwards.
pub struct StaticBatch<D: Device> {
    vertex_array: VertexArray<D>,
    _vertices: VertexBuffer<D>,
    indices: IndexBuffer<D>,
    quads: usize,
}

impl<D: Device> StaticBatch<D> {
    #[track_caller]
    pub fn new(ctx: &SharedContext<D>, quads: &[Quad]) -> GpuResult<Self> {
        let batch = Batch::from_quads(quads);
        let vertices = VertexBuffer::new(ctx, batch.vertex_bytes())?;
        let mut vertex_array = VertexArray::new(ctx)?;
        vertex_array.add_buffer(&vertices, &QuadVertex::layout())?;
        let indices = IndexBuffer::new(ctx, batch.indices())?;
        log::debug!("static batch: {} quads", batch.quad_count());
        Ok(Self {
            vertex_array,
            _vertices: vertices,
            indices,
            quads: batch.quad_count(),
        })
    }

    pub fn vertex_array(&self) -> &VertexArray<D> {
        &self.vertex_array
    }

    pub fn index_buffer(&self) -> &IndexBuffer<D> {
        &self.indices
    }

    pub fn quad_count(&self) -> usize {
        self.quads
    }
}

/// A batch rebuilt from scratch on every `update`.
///
/// Both buffers are reserved once for `max_quads`; updates overwrite their
/// leading sub-ranges and never reallocate.
pub struct DynamicBatch<D: Device> {
    vertex_array: VertexArray<D>,
    vertices: VertexBuffer<D>,
    indices: IndexBuffer<D>,
    builder: BatchBuilder,
    max_quads: usize,
}

impl<D: Device> DynamicBatch<D> {
    #[track_caller]
    pub fn new(ctx: &SharedContext<D>, max_quads: usize) -> GpuResult<Self> {
        let vertex_bytes =
            (max_quads * VERTICES_PER_QUAD as usize * std::mem::size_of::<QuadVertex>()) as u64;
        let vertices = VertexBuffer::reserve(ctx, vertex_bytes)?;
        let mut vertex_array = VertexArray::new(ctx)?;
        vertex_array.add_buffer(&vertices, &QuadVertex::layout())?;
        let indices = IndexBuffer::reserve(ctx, (max_quads * QUAD_INDICES.len()) as u32)?;
        log::debug!("dynamic batch: room for {max_quads} quads");
        Ok(Self {
            vertex_array,
            vertices,
            indices,
            builder: BatchBuilder::with_capacity(max_quads),
            max_quads,
        })
    }

    /// Rebuilds the merged blocks from `quads` and uploads them.
    #[track_caller]
    pub fn update(&mut self, quads: &[Quad]) -> Result<(), BatchError> {
        if quads.len() > self.max_quads {
            return Err(BatchError::CapacityExceeded {
                requested: quads.len(),
                capacity: self.max_quads,
            });
        }
        self.builder.clear();
        self.builder.extend(quads);
        let batch = self.builder.batch();
        self.vertices.update(0, batch.vertex_bytes())?;
        self.indices.update(batch.indices())?;
        Ok(())
    }

    pub fn vertex_array(&self) -> &VertexArray<D> {
        &self.vertex_array
    }

    pub fn index_buffer(&self) -> &IndexBuffer<D> {
        &self.indices
    }

    pub fn vertex_buffer(&self) -> &VertexBuffer<D> {
        &self.vertices
    }

    /// The merge produced by the last `update`.
    pub fn batch(&self) -> &Batch {
        self.builder.batch()
    }

    pub fn max_quads(&self) -> usize {
        self.max_quads
    }
}
