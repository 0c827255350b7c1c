//! Software-simulated device.
//!
//! Keeps buffer contents in memory so tests can read them back, "compiles"
//! stages with structural checks, reflects uniforms from source, and records
//! clears and draws instead of rasterizing them.

use std::collections::{BTreeMap, HashMap};

use crate::coords::ColorRgba;
use crate::shader::UniformBlock;

use super::error::{DeviceError, DeviceResult};
use super::types::{
    AttributePointer, BufferId, BufferUsage, DrawCall, ProgramId, ShaderId, ShaderStage,
    TextureDesc, TextureId, UniformLocation, UniformValue, VertexArrayId,
};
use super::Device;

#[derive(Debug)]
struct SoftBuffer {
    bytes: Vec<u8>,
    usage: BufferUsage,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct SoftSlot {
    enabled: bool,
    source: Option<(BufferId, AttributePointer)>,
}

#[derive(Debug)]
struct SoftShader {
    stage: ShaderStage,
    uniforms: UniformBlock,
}

#[derive(Debug)]
struct SoftProgram {
    uniforms: UniformBlock,
    storage: Vec<u8>,
}

/// A draw as the software device saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub call: DrawCall,
    /// Uniform block bytes at the time of the draw.
    pub uniforms: Vec<u8>,
}

/// In-memory device implementing the full `Device` contract.
#[derive(Debug, Default)]
pub struct SoftDevice {
    next_handle: u32,
    buffers: HashMap<u32, SoftBuffer>,
    vertex_arrays: HashMap<u32, BTreeMap<u32, SoftSlot>>,
    shaders: HashMap<u32, SoftShader>,
    programs: HashMap<u32, SoftProgram>,
    textures: HashMap<u32, (TextureDesc, Vec<u8>)>,

    clears: Vec<ColorRgba>,
    draws: Vec<DrawRecord>,
    uniform_queries: usize,
    uniform_sets: usize,
    reject_next_allocation: bool,
    pending: Vec<DeviceError>,
}

impl SoftDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    // ── inspection ────────────────────────────────────────────────────────

    /// Current contents of a buffer.
    pub fn buffer_contents(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id.raw()).map(|b| b.bytes.as_slice())
    }

    pub fn buffer_usage(&self, id: BufferId) -> Option<BufferUsage> {
        self.buffers.get(&id.raw()).map(|b| b.usage)
    }

    /// `(slot, buffer, pointer)` for every described slot of a vertex array.
    pub fn attributes(&self, id: VertexArrayId) -> Vec<(u32, BufferId, AttributePointer)> {
        self.vertex_arrays
            .get(&id.raw())
            .map(|slots| {
                slots
                    .iter()
                    .filter_map(|(slot, s)| s.source.map(|(b, p)| (*slot, b, p)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_attribute_enabled(&self, id: VertexArrayId, slot: u32) -> bool {
        self.vertex_arrays
            .get(&id.raw())
            .and_then(|slots| slots.get(&slot))
            .is_some_and(|s| s.enabled)
    }

    pub fn texture_pixels(&self, id: TextureId) -> Option<(TextureDesc, &[u8])> {
        self.textures
            .get(&id.raw())
            .map(|(desc, px)| (*desc, px.as_slice()))
    }

    /// Uniform block bytes of a program.
    pub fn uniform_bytes(&self, id: ProgramId) -> Option<&[u8]> {
        self.programs.get(&id.raw()).map(|p| p.storage.as_slice())
    }

    pub fn clears(&self) -> &[ColorRgba] {
        &self.clears
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Number of uniform-location lookups served so far.
    pub fn uniform_queries(&self) -> usize {
        self.uniform_queries
    }

    /// Number of uniform-set calls served so far.
    pub fn uniform_sets(&self) -> usize {
        self.uniform_sets
    }

    /// Live objects of every kind; zero once everything was released.
    pub fn live_objects(&self) -> usize {
        self.buffers.len()
            + self.vertex_arrays.len()
            + self.shaders.len()
            + self.programs.len()
            + self.textures.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    /// Makes the next buffer or texture allocation fail with `OutOfMemory`.
    pub fn reject_next_allocation(&mut self) {
        self.reject_next_allocation = true;
    }

    /// Queues an error the way an asynchronous backend would report one late.
    pub fn inject_pending_error(&mut self, err: DeviceError) {
        self.pending.push(err);
    }

    fn check_allocation(&mut self, size: u64) -> DeviceResult<()> {
        if std::mem::take(&mut self.reject_next_allocation) {
            return Err(DeviceError::OutOfMemory(size));
        }
        Ok(())
    }

    fn program(&self, id: ProgramId) -> DeviceResult<&SoftProgram> {
        self.programs
            .get(&id.raw())
            .ok_or_else(|| DeviceError::unknown(ProgramId::KIND, id.raw()))
    }
}

/// Structural stand-in for a real compiler: the stage's entry point must be
/// present and braces must balance.
fn check_stage(stage: ShaderStage, source: &str) -> Result<(), String> {
    if !source.contains(stage.entry_attribute()) {
        return Err(format!(
            "0:0: error: no `{}` entry point",
            stage.entry_attribute()
        ));
    }
    let mut depth = 0i32;
    for (n, line) in source.lines().enumerate() {
        for c in line.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return Err(format!("{}:0: error: unexpected `}}`", n + 1));
            }
        }
    }
    if depth != 0 {
        return Err("0:0: error: unexpected end of source".into());
    }
    Ok(())
}

impl Device for SoftDevice {
    fn create_buffer(
        &mut self,
        size: u64,
        data: Option<&[u8]>,
        usage: BufferUsage,
    ) -> DeviceResult<BufferId> {
        self.check_allocation(size)?;
        let mut bytes = vec![0u8; size as usize];
        if let Some(data) = data {
            let n = data.len().min(bytes.len());
            bytes[..n].copy_from_slice(&data[..n]);
        }
        let id = self.allocate();
        self.buffers.insert(id, SoftBuffer { bytes, usage });
        Ok(BufferId::from_raw(id))
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> DeviceResult<()> {
        let buffer = self
            .buffers
            .get_mut(&id.raw())
            .ok_or_else(|| DeviceError::unknown(BufferId::KIND, id.raw()))?;
        let end = DeviceError::check_range(id.raw(), offset, data.len(), buffer.bytes.len() as u64)?;
        buffer.bytes[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn destroy_buffer(&mut self, id: BufferId) -> DeviceResult<()> {
        self.buffers
            .remove(&id.raw())
            .map(|_| ())
            .ok_or_else(|| DeviceError::unknown(BufferId::KIND, id.raw()))
    }

    fn create_vertex_array(&mut self) -> DeviceResult<VertexArrayId> {
        let id = self.allocate();
        self.vertex_arrays.insert(id, BTreeMap::new());
        Ok(VertexArrayId::from_raw(id))
    }

    fn enable_attribute(&mut self, array: VertexArrayId, slot: u32) -> DeviceResult<()> {
        let slots = self
            .vertex_arrays
            .get_mut(&array.raw())
            .ok_or_else(|| DeviceError::unknown(VertexArrayId::KIND, array.raw()))?;
        slots.entry(slot).or_default().enabled = true;
        Ok(())
    }

    fn describe_attribute(
        &mut self,
        array: VertexArrayId,
        buffer: BufferId,
        slot: u32,
        pointer: &AttributePointer,
    ) -> DeviceResult<()> {
        if !self.buffers.contains_key(&buffer.raw()) {
            return Err(DeviceError::unknown(BufferId::KIND, buffer.raw()));
        }
        if !(1..=4).contains(&pointer.count) {
            return Err(DeviceError::InvalidValue(format!(
                "attribute component count {} is outside 1..=4",
                pointer.count
            )));
        }
        let slots = self
            .vertex_arrays
            .get_mut(&array.raw())
            .ok_or_else(|| DeviceError::unknown(VertexArrayId::KIND, array.raw()))?;
        slots.entry(slot).or_default().source = Some((buffer, *pointer));
        Ok(())
    }

    fn destroy_vertex_array(&mut self, id: VertexArrayId) -> DeviceResult<()> {
        self.vertex_arrays
            .remove(&id.raw())
            .map(|_| ())
            .ok_or_else(|| DeviceError::unknown(VertexArrayId::KIND, id.raw()))
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> DeviceResult<ShaderId> {
        let uniforms = check_stage(stage, source)
            .and_then(|()| UniformBlock::parse(source))
            .map_err(|log| DeviceError::Compile { stage, log })?;
        let id = self.allocate();
        self.shaders.insert(id, SoftShader { stage, uniforms });
        Ok(ShaderId::from_raw(id))
    }

    fn destroy_shader(&mut self, id: ShaderId) -> DeviceResult<()> {
        self.shaders
            .remove(&id.raw())
            .map(|_| ())
            .ok_or_else(|| DeviceError::unknown(ShaderId::KIND, id.raw()))
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> DeviceResult<ProgramId> {
        let stage = |id: ShaderId| {
            self.shaders
                .get(&id.raw())
                .ok_or_else(|| DeviceError::unknown(ShaderId::KIND, id.raw()))
        };
        let (vs, fs) = (stage(vertex)?, stage(fragment)?);
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err(DeviceError::Link(format!(
                "expected vertex + fragment stages, got {} + {}",
                vs.stage, fs.stage
            )));
        }
        let uniforms = vs.uniforms.link(&fs.uniforms).map_err(DeviceError::Link)?;
        let storage = vec![0u8; uniforms.size() as usize];
        let id = self.allocate();
        self.programs.insert(id, SoftProgram { uniforms, storage });
        Ok(ProgramId::from_raw(id))
    }

    fn destroy_program(&mut self, id: ProgramId) -> DeviceResult<()> {
        self.programs
            .remove(&id.raw())
            .map(|_| ())
            .ok_or_else(|| DeviceError::unknown(ProgramId::KIND, id.raw()))
    }

    fn uniform_location(
        &mut self,
        program: ProgramId,
        name: &str,
    ) -> DeviceResult<Option<UniformLocation>> {
        self.uniform_queries += 1;
        Ok(self.program(program)?.uniforms.position(name).map(UniformLocation))
    }

    fn set_uniform(
        &mut self,
        program: ProgramId,
        location: UniformLocation,
        value: &UniformValue,
    ) -> DeviceResult<()> {
        self.uniform_sets += 1;
        let prog = self
            .programs
            .get_mut(&program.raw())
            .ok_or_else(|| DeviceError::unknown(ProgramId::KIND, program.raw()))?;
        prog.uniforms.write(&mut prog.storage, location.0, value)
    }

    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> DeviceResult<TextureId> {
        let expected = desc.width as usize * desc.height as usize * 4;
        if pixels.len() != expected {
            return Err(DeviceError::InvalidValue(format!(
                "{}x{} RGBA8 texture needs {expected} bytes, got {}",
                desc.width,
                desc.height,
                pixels.len()
            )));
        }
        self.check_allocation(expected as u64)?;
        let id = self.allocate();
        self.textures.insert(id, (*desc, pixels.to_vec()));
        Ok(TextureId::from_raw(id))
    }

    fn destroy_texture(&mut self, id: TextureId) -> DeviceResult<()> {
        self.textures
            .remove(&id.raw())
            .map(|_| ())
            .ok_or_else(|| DeviceError::unknown(TextureId::KIND, id.raw()))
    }

    fn clear(&mut self, color: ColorRgba) -> DeviceResult<()> {
        self.clears.push(color);
        Ok(())
    }

    fn draw_indexed(&mut self, call: &DrawCall) -> DeviceResult<()> {
        if !self.vertex_arrays.contains_key(&call.vertex_array.raw()) {
            return Err(DeviceError::unknown(VertexArrayId::KIND, call.vertex_array.raw()));
        }
        let index_bytes = self
            .buffers
            .get(&call.index_buffer.raw())
            .map(|b| b.bytes.len() as u64)
            .ok_or_else(|| DeviceError::unknown(BufferId::KIND, call.index_buffer.raw()))?;
        let needed = call.index_count as u64 * 4;
        if needed > index_bytes {
            return Err(DeviceError::OutOfBounds {
                id: call.index_buffer.raw(),
                offset: 0,
                end: needed,
                size: index_bytes,
            });
        }
        for unit in call.textures.iter().flatten() {
            if !self.textures.contains_key(&unit.raw()) {
                return Err(DeviceError::unknown(TextureId::KIND, unit.raw()));
            }
        }
        let uniforms = self.program(call.program)?.storage.clone();
        self.draws.push(DrawRecord {
            call: call.clone(),
            uniforms,
        });
        Ok(())
    }

    fn take_pending_error(&mut self) -> Option<DeviceError> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_outside_reservation_is_rejected() {
        let mut dev = SoftDevice::new();
        let id = dev.create_buffer(8, None, BufferUsage::Dynamic).unwrap();
        let err = dev.write_buffer(id, 4, &[0u8; 8]).unwrap_err();
        assert!(matches!(err, DeviceError::OutOfBounds { end: 12, size: 8, .. }));
    }

    #[test]
    fn missing_entry_point_fails_compilation() {
        let mut dev = SoftDevice::new();
        let err = dev
            .compile_shader(ShaderStage::Vertex, "@fragment fn fs_main() {}")
            .unwrap_err();
        assert!(matches!(err, DeviceError::Compile { stage: ShaderStage::Vertex, .. }));
        assert_eq!(dev.live_shaders(), 0);
    }

    #[test]
    fn unbalanced_braces_fail_compilation() {
        let mut dev = SoftDevice::new();
        assert!(dev
            .compile_shader(ShaderStage::Fragment, "@fragment fn fs_main() {")
            .is_err());
    }

    #[test]
    fn link_requires_one_stage_of_each_kind() {
        let mut dev = SoftDevice::new();
        let a = dev.compile_shader(ShaderStage::Vertex, "@vertex fn vs_main() {}").unwrap();
        let b = dev.compile_shader(ShaderStage::Vertex, "@vertex fn vs_main() {}").unwrap();
        assert!(matches!(dev.link_program(a, b), Err(DeviceError::Link(_))));
    }

    #[test]
    fn handles_are_never_zero() {
        let mut dev = SoftDevice::new();
        let id = dev.create_buffer(4, None, BufferUsage::Static).unwrap();
        assert_ne!(id.raw(), 0);
    }
}
