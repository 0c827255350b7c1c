//! Hardware device built on wgpu.
//!
//! GL-style objects map onto wgpu like this:
//! - buffers are `VERTEX | INDEX | COPY_DST` buffers, sizes padded to 4 bytes
//! - a vertex array is a table of attribute slots, turned into
//!   `VertexBufferLayout`s when a draw needs a pipeline
//! - a program is a pair of shader modules plus a CPU-side uniform image;
//!   each draw uploads that image into its own uniform buffer
//! - every clear and draw is one render pass in the current frame's encoder

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use wgpu::util::DeviceExt;

use crate::coords::ColorRgba;
use crate::shader::UniformBlock;

use super::error::{DeviceError, DeviceResult};
use super::types::{
    AttributePointer, BufferId, BufferUsage, ComponentType, DrawCall, ProgramId, ShaderId,
    ShaderStage, TextureDesc, TextureId, UniformLocation, UniformValue, VertexArrayId,
    MAX_TEXTURE_UNITS,
};
use super::Device;

const UNIFORM_BINDING: u32 = 0;
const SAMPLER_BINDING: u32 = 1;
const FIRST_TEXTURE_BINDING: u32 = 2;

// ── resources ─────────────────────────────────────────────────────────────

struct WgpuBuffer {
    buffer: wgpu::Buffer,
    /// Requested size; the wgpu allocation may be padded past it.
    size: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    enabled: bool,
    source: Option<(BufferId, AttributePointer)>,
}

struct Stage {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
    uniforms: UniformBlock,
}

struct Program {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    uniforms: UniformBlock,
    storage: Vec<u8>,
}

struct Texture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct Frame {
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

/// One vertex buffer as a pipeline sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BufferLayoutKey {
    stride: u64,
    attributes: Vec<(u32, wgpu::VertexFormat, u64)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    buffers: Vec<BufferLayoutKey>,
}

// ── device ────────────────────────────────────────────────────────────────

/// `Device` implementation recording into a wgpu command encoder.
///
/// Clears and draws are only legal between `begin_frame` and `end_frame`.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,

    next_handle: u32,
    buffers: HashMap<u32, WgpuBuffer>,
    vertex_arrays: HashMap<u32, BTreeMap<u32, Slot>>,
    shaders: HashMap<u32, Stage>,
    programs: HashMap<u32, Program>,
    textures: HashMap<u32, Texture>,

    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    /// Sampled by units with nothing bound.
    white: Texture,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    frame: Option<Frame>,
    errors: Arc<Mutex<Vec<DeviceError>>>,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, target_format: wgpu::TextureFormat) -> Self {
        let errors: Arc<Mutex<Vec<DeviceError>>> = Arc::default();
        let sink = Arc::clone(&errors);
        device.on_uncaptured_error(Arc::new(move |e: wgpu::Error| {
            if let Ok(mut queue) = sink.lock() {
                queue.push(DeviceError::Backend(e.to_string()));
            }
        }));

        let mut entries = vec![
            wgpu::BindGroupLayoutEntry {
                binding: UNIFORM_BINDING,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: SAMPLER_BINDING,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];
        for unit in 0..MAX_TEXTURE_UNITS as u32 {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: FIRST_TEXTURE_BINDING + unit,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessera bgl"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tessera pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tessera linear clamp sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let white = upload_texture(
            &device,
            &queue,
            "tessera white texture",
            &TextureDesc {
                width: 1,
                height: 1,
            },
            &[255; 4],
        );

        Self {
            device,
            queue,
            target_format,
            next_handle: 0,
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            bind_group_layout,
            pipeline_layout,
            sampler,
            white,
            pipelines: HashMap::new(),
            frame: None,
            errors,
        }
    }

    /// Starts recording a frame that renders into `view`.
    pub fn begin_frame(&mut self, view: wgpu::TextureView) {
        if self.frame.is_some() {
            log::warn!("begin_frame called twice; dropping the unfinished frame");
        }
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tessera frame encoder"),
            });
        self.frame = Some(Frame { view, encoder });
    }

    /// Finishes the current frame. `None` when no frame was started.
    pub fn end_frame(&mut self) -> Option<wgpu::CommandBuffer> {
        self.frame.take().map(|f| f.encoder.finish())
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Vertex buffer layouts read by `array`, in first-use order of the buffers.
    fn layout_of(&self, array: VertexArrayId) -> DeviceResult<Vec<(BufferId, BufferLayoutKey)>> {
        let slots = self
            .vertex_arrays
            .get(&array.raw())
            .ok_or_else(|| DeviceError::unknown(VertexArrayId::KIND, array.raw()))?;

        let mut layouts: Vec<(BufferId, BufferLayoutKey)> = Vec::new();
        for (&slot, s) in slots {
            let Some((buffer, ptr)) = s.source.filter(|_| s.enabled) else {
                continue;
            };
            let format = vertex_format(&ptr)?;
            let attr = (slot, format, ptr.offset as u64);
            match layouts.iter_mut().find(|(b, _)| *b == buffer) {
                Some((_, key)) if key.stride == ptr.stride as u64 => key.attributes.push(attr),
                Some((_, key)) => {
                    return Err(DeviceError::InvalidOperation(format!(
                        "slot {slot} reads {buffer} with stride {}, other slots use {}",
                        ptr.stride, key.stride
                    )));
                }
                None => layouts.push((
                    buffer,
                    BufferLayoutKey {
                        stride: ptr.stride as u64,
                        attributes: vec![attr],
                    },
                )),
            }
        }
        Ok(layouts)
    }

    fn build_pipeline(&self, key: &PipelineKey) -> DeviceResult<wgpu::RenderPipeline> {
        let program = self
            .programs
            .get(&key.program.raw())
            .ok_or_else(|| DeviceError::unknown(ProgramId::KIND, key.program.raw()))?;

        let attributes: Vec<Vec<wgpu::VertexAttribute>> = key
            .buffers
            .iter()
            .map(|b| {
                b.attributes
                    .iter()
                    .map(|&(shader_location, format, offset)| wgpu::VertexAttribute {
                        format,
                        offset,
                        shader_location,
                    })
                    .collect()
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = key
            .buffers
            .iter()
            .zip(&attributes)
            .map(|(b, attrs)| wgpu::VertexBufferLayout {
                array_stride: b.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        log::debug!("building pipeline for {} ({} vertex buffers)", key.program, buffers.len());

        Ok(self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("tessera pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: None,
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: None,
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        }))
    }

    fn bind_group(
        &self,
        uniforms: &wgpu::Buffer,
        units: &[Option<TextureId>],
    ) -> DeviceResult<wgpu::BindGroup> {
        let mut views = Vec::with_capacity(MAX_TEXTURE_UNITS);
        for unit in units {
            let view = match unit {
                Some(id) => {
                    &self
                        .textures
                        .get(&id.raw())
                        .ok_or_else(|| DeviceError::unknown(TextureId::KIND, id.raw()))?
                        .view
                }
                None => &self.white.view,
            };
            views.push(view);
        }

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: UNIFORM_BINDING,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: SAMPLER_BINDING,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
        ];
        for (unit, view) in views.into_iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: FIRST_TEXTURE_BINDING + unit as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }

        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessera draw bind group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        }))
    }

    fn discard_reported_errors(&mut self) {
        if let Ok(mut queue) = self.errors.lock() {
            queue.clear();
        }
    }
}

fn vertex_format(ptr: &AttributePointer) -> DeviceResult<wgpu::VertexFormat> {
    use wgpu::VertexFormat as F;
    let format = match (ptr.component_type, ptr.count, ptr.normalized) {
        (ComponentType::Float, 1, _) => F::Float32,
        (ComponentType::Float, 2, _) => F::Float32x2,
        (ComponentType::Float, 3, _) => F::Float32x3,
        (ComponentType::Float, 4, _) => F::Float32x4,
        (ComponentType::UInt, 1, _) => F::Uint32,
        (ComponentType::UInt, 2, _) => F::Uint32x2,
        (ComponentType::UInt, 3, _) => F::Uint32x3,
        (ComponentType::UInt, 4, _) => F::Uint32x4,
        (ComponentType::UByte, 2, true) => F::Unorm8x2,
        (ComponentType::UByte, 4, true) => F::Unorm8x4,
        (ComponentType::UByte, 2, false) => F::Uint8x2,
        (ComponentType::UByte, 4, false) => F::Uint8x4,
        (ty, count, _) => {
            return Err(DeviceError::InvalidValue(format!(
                "no vertex format for {count} x {ty:?}"
            )));
        }
    };
    Ok(format)
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    desc: &TextureDesc,
    pixels: &[u8],
) -> Texture {
    let size = wgpu::Extent3d {
        width: desc.width,
        height: desc.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(desc.width * 4),
            rows_per_image: Some(desc.height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Texture { texture, view }
}

fn outside_frame(call: &str) -> DeviceError {
    DeviceError::InvalidOperation(format!("{call} outside of begin_frame/end_frame"))
}

#[inline]
fn padded(size: u64) -> u64 {
    size.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT
}

impl Device for WgpuDevice {
    fn create_buffer(
        &mut self,
        size: u64,
        data: Option<&[u8]>,
        usage: BufferUsage,
    ) -> DeviceResult<BufferId> {
        let max = self.device.limits().max_buffer_size;
        if size > max {
            return Err(DeviceError::OutOfMemory(size));
        }
        let alloc = padded(size.max(4));
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(match usage {
                BufferUsage::Static => "tessera static buffer",
                BufferUsage::Dynamic => "tessera dynamic buffer",
            }),
            size: alloc,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::INDEX
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if let Some(data) = data {
            let n = data.len().min(size as usize);
            let mut bytes = data[..n].to_vec();
            bytes.resize(padded(n as u64) as usize, 0);
            self.queue.write_buffer(&buffer, 0, &bytes);
        }
        let id = self.allocate();
        self.buffers.insert(id, WgpuBuffer { buffer, size });
        Ok(BufferId::from_raw(id))
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, data: &[u8]) -> DeviceResult<()> {
        let entry = self
            .buffers
            .get(&id.raw())
            .ok_or_else(|| DeviceError::unknown(BufferId::KIND, id.raw()))?;
        DeviceError::check_range(id.raw(), offset, data.len(), entry.size)?;
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(DeviceError::InvalidValue(format!(
                "buffer write offset {offset} is not {}-byte aligned",
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }
        if data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
            self.queue.write_buffer(&entry.buffer, offset, data);
        } else {
            let mut bytes = data.to_vec();
            bytes.resize(padded(data.len() as u64) as usize, 0);
            self.queue.write_buffer(&entry.buffer, offset, &bytes);
        }
        Ok(())
    }

    fn destroy_buffer(&mut self, id: BufferId) -> DeviceResult<()> {
        let entry = self
            .buffers
            .remove(&id.raw())
            .ok_or_else(|| DeviceError::unknown(BufferId::KIND, id.raw()))?;
        entry.buffer.destroy();
        Ok(())
    }

    fn create_vertex_array(&mut self) -> DeviceResult<VertexArrayId> {
        let id = self.allocate();
        self.vertex_arrays.insert(id, BTreeMap::new());
        Ok(VertexArrayId::from_raw(id))
    }

    fn enable_attribute(&mut self, array: VertexArrayId, slot: u32) -> DeviceResult<()> {
        let max = self.device.limits().max_vertex_attributes;
        if slot >= max {
            return Err(DeviceError::InvalidValue(format!(
                "attribute slot {slot} exceeds the {max} supported"
            )));
        }
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
        vertex_format(pointer)?;
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
        if !source.contains(stage.entry_attribute()) {
            return Err(DeviceError::Compile {
                stage,
                log: format!("no `{}` entry point", stage.entry_attribute()),
            });
        }
        let uniforms =
            UniformBlock::parse(source).map_err(|log| DeviceError::Compile { stage, log })?;

        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(match stage {
                    ShaderStage::Vertex => "tessera vertex stage",
                    ShaderStage::Fragment => "tessera fragment stage",
                }),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let info = pollster::block_on(module.get_compilation_info());
        let log: Vec<String> = info
            .messages
            .iter()
            .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
            .map(|m| match &m.location {
                Some(loc) => format!("{}:{}: error: {}", loc.line_number, loc.line_position, m.message),
                None => format!("error: {}", m.message),
            })
            .collect();
        if !log.is_empty() {
            // The same failure also arrives through the uncaptured-error hook.
            self.discard_reported_errors();
            return Err(DeviceError::Compile {
                stage,
                log: log.join("\n"),
            });
        }

        let id = self.allocate();
        self.shaders.insert(
            id,
            Stage {
                stage,
                module,
                uniforms,
            },
        );
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
        let program = Program {
            vertex: vs.module.clone(),
            fragment: fs.module.clone(),
            storage: vec![0u8; uniforms.size() as usize],
            uniforms,
        };
        let id = self.allocate();
        self.programs.insert(id, program);
        Ok(ProgramId::from_raw(id))
    }

    fn destroy_program(&mut self, id: ProgramId) -> DeviceResult<()> {
        self.programs
            .remove(&id.raw())
            .ok_or_else(|| DeviceError::unknown(ProgramId::KIND, id.raw()))?;
        self.pipelines.retain(|key, _| key.program != id);
        Ok(())
    }

    fn uniform_location(
        &mut self,
        program: ProgramId,
        name: &str,
    ) -> DeviceResult<Option<UniformLocation>> {
        let prog = self
            .programs
            .get(&program.raw())
            .ok_or_else(|| DeviceError::unknown(ProgramId::KIND, program.raw()))?;
        Ok(prog.uniforms.position(name).map(UniformLocation))
    }

    fn set_uniform(
        &mut self,
        program: ProgramId,
        location: UniformLocation,
        value: &UniformValue,
    ) -> DeviceResult<()> {
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
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(DeviceError::InvalidValue(format!(
                "texture size {}x{} is outside 1..={max}",
                desc.width, desc.height
            )));
        }
        let texture = upload_texture(&self.device, &self.queue, "tessera texture", desc, pixels);
        let id = self.allocate();
        self.textures.insert(id, texture);
        Ok(TextureId::from_raw(id))
    }

    fn destroy_texture(&mut self, id: TextureId) -> DeviceResult<()> {
        let texture = self
            .textures
            .remove(&id.raw())
            .ok_or_else(|| DeviceError::unknown(TextureId::KIND, id.raw()))?;
        texture.texture.destroy();
        Ok(())
    }

    fn clear(&mut self, color: ColorRgba) -> DeviceResult<()> {
        let Some(frame) = self.frame.as_mut() else {
            return Err(outside_frame("clear"));
        };
        let _pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tessera clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: color.r as f64,
                        g: color.g as f64,
                        b: color.b as f64,
                        a: color.a as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        Ok(())
    }

    fn draw_indexed(&mut self, call: &DrawCall) -> DeviceResult<()> {
        if self.frame.is_none() {
            return Err(outside_frame("draw_indexed"));
        }

        let index_size = self
            .buffers
            .get(&call.index_buffer.raw())
            .map(|b| b.size)
            .ok_or_else(|| DeviceError::unknown(BufferId::KIND, call.index_buffer.raw()))?;
        let needed = call.index_count as u64 * 4;
        if needed > index_size {
            return Err(DeviceError::OutOfBounds {
                id: call.index_buffer.raw(),
                offset: 0,
                end: needed,
                size: index_size,
            });
        }

        let layouts = self.layout_of(call.vertex_array)?;
        let key = PipelineKey {
            program: call.program,
            buffers: layouts.iter().map(|(_, k)| k.clone()).collect(),
        };
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.build_pipeline(&key)?;
            self.pipelines.insert(key.clone(), pipeline);
        }

        let storage = &self
            .programs
            .get(&call.program.raw())
            .ok_or_else(|| DeviceError::unknown(ProgramId::KIND, call.program.raw()))?
            .storage;
        let mut contents = storage.clone();
        contents.resize(contents.len().max(16), 0);
        let uniforms = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("tessera draw uniforms"),
                contents: &contents,
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.bind_group(&uniforms, &call.textures)?;

        let mut vertex_buffers = Vec::with_capacity(layouts.len());
        for (id, _) in &layouts {
            let entry = self
                .buffers
                .get(&id.raw())
                .ok_or_else(|| DeviceError::unknown(BufferId::KIND, id.raw()))?;
            vertex_buffers.push(&entry.buffer);
        }
        let Some(index_buffer) = self.buffers.get(&call.index_buffer.raw()).map(|b| &b.buffer)
        else {
            return Err(DeviceError::unknown(BufferId::KIND, call.index_buffer.raw()));
        };
        let Some(pipeline) = self.pipelines.get(&key) else {
            return Err(DeviceError::Backend("pipeline cache miss after insert".into()));
        };
        let Some(frame) = self.frame.as_mut() else {
            return Err(outside_frame("draw_indexed"));
        };

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tessera draw pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        for (i, buffer) in vertex_buffers.into_iter().enumerate() {
            pass.set_vertex_buffer(i as u32, buffer.slice(..));
        }
        pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..call.index_count, 0, 0..1);
        Ok(())
    }

    fn take_pending_error(&mut self) -> Option<DeviceError> {
        let mut queue = self.errors.lock().ok()?;
        if queue.is_empty() {
            None
        } else {
            Some(queue.remove(0))
        }
    }
}
