mod common;

use std::sync::Mutex;

use common::{shader, soft, FLAT_SHADER};
use tessera_engine::buffer::{IndexBuffer, VertexBuffer};
use tessera_engine::coords::ColorRgba;
use tessera_engine::device::{BufferUsage, ComponentType, Device, DeviceError, GpuError};
use tessera_engine::layout::VertexLayout;
use tessera_engine::renderer::Renderer;
use tessera_engine::texture::Texture;
use tessera_engine::vertex_array::VertexArray;

fn is_invalid_operation(err: &GpuError) -> bool {
    matches!(err.device_error(), DeviceError::InvalidOperation(_))
}

/// Keeps every `warn` record; tests count the ones mentioning their own names.
struct WarnCapture(Mutex<Vec<String>>);

impl log::Log for WarnCapture {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Warn
    }

    fn log(&self, record: &log::Record) {
        if record.level() == log::Level::Warn {
            if let Ok(mut records) = self.0.lock() {
                records.push(record.args().to_string());
            }
        }
    }

    fn flush(&self) {}
}

static WARNINGS: WarnCapture = WarnCapture(Mutex::new(Vec::new()));

fn capture_warnings() {
    let _ = log::set_logger(&WARNINGS);
    log::set_max_level(log::LevelFilter::Warn);
}

fn warnings_mentioning(needle: &str) -> usize {
    WARNINGS
        .0
        .lock()
        .map(|records| records.iter().filter(|r| r.contains(needle)).count())
        .unwrap_or(0)
}

#[test]
fn binding_twice_equals_binding_once() {
    let ctx = soft();
    let vb = VertexBuffer::new(&ctx, &[0u8; 16]).unwrap();
    let ib = IndexBuffer::new(&ctx, &[0, 1, 2]).unwrap();
    let sh = shader(&ctx, FLAT_SHADER);
    let tex = Texture::from_rgba8(&ctx, 1, 1, &[255; 4], "white").unwrap();

    vb.bind();
    ib.bind();
    sh.bind().unwrap();
    tex.bind(2).unwrap();
    let once = ctx.binding_state();

    vb.bind();
    ib.bind();
    sh.bind().unwrap();
    tex.bind(2).unwrap();
    assert_eq!(ctx.binding_state(), once);
}

#[test]
fn dynamic_update_round_trips_without_reallocation() {
    let ctx = soft();
    let vb = VertexBuffer::reserve(&ctx, 64).unwrap();
    let id = vb.buffer().id();
    let data: Vec<u8> = (0..24).collect();

    vb.update(0, &data).unwrap();

    assert_eq!(vb.buffer().id(), id);
    let dev = ctx.device();
    let contents = dev.buffer_contents(id).unwrap();
    assert_eq!(contents.len(), 64);
    assert_eq!(&contents[..24], &data[..]);
    assert_eq!(dev.buffer_usage(id), Some(BufferUsage::Dynamic));
}

#[test]
fn static_buffer_rejects_updates() {
    let ctx = soft();
    let vb = VertexBuffer::new(&ctx, &[0u8; 16]).unwrap();
    let err = vb.update(0, &[1, 2, 3, 4]).unwrap_err();
    assert!(is_invalid_operation(&err));
    assert_eq!(ctx.device().buffer_contents(vb.buffer().id()).unwrap(), &[0u8; 16]);
}

#[test]
fn update_past_reservation_is_attributed_to_caller() {
    let ctx = soft();
    let vb = VertexBuffer::reserve(&ctx, 8).unwrap();
    let err = vb.update(4, &[0u8; 8]).unwrap_err();
    assert!(matches!(
        err.device_error(),
        DeviceError::OutOfBounds { end: 12, size: 8, .. }
    ));
    assert_eq!(err.call, "buffer_sub_data");
    assert!(err.location.file().ends_with("resources.rs"), "{}", err.location);
}

#[test]
fn update_whose_end_overflows_is_out_of_bounds() {
    let ctx = soft();
    let vb = VertexBuffer::reserve(&ctx, 8).unwrap();
    let err = vb.update(u64::MAX - 2, &[0u8; 8]).unwrap_err();
    assert!(matches!(
        err.device_error(),
        DeviceError::OutOfBounds { end: u64::MAX, size: 8, .. }
    ));

    let mut dev = ctx.device_mut();
    let raw = dev.write_buffer(vb.buffer().id(), u64::MAX, &[1]);
    assert!(matches!(raw, Err(DeviceError::OutOfBounds { .. })));
}

#[test]
fn index_buffer_update_tracks_count() {
    let ctx = soft();
    let mut ib = IndexBuffer::reserve(&ctx, 12).unwrap();
    assert_eq!((ib.count(), ib.capacity()), (0, 12));

    ib.update(&[0, 1, 2, 2, 3, 0]).unwrap();
    assert_eq!(ib.count(), 6);

    let err = ib.update(&[0; 13]).unwrap_err();
    assert!(matches!(err.device_error(), DeviceError::OutOfBounds { .. }));
    assert_eq!(ib.count(), 6);
}

#[test]
fn rejected_allocation_surfaces_as_out_of_memory() {
    let ctx = soft();
    ctx.device_mut().reject_next_allocation();
    let err = VertexBuffer::reserve(&ctx, 1 << 20).err().unwrap();
    assert!(matches!(err.device_error(), DeviceError::OutOfMemory(_)));
    assert_eq!(ctx.device().live_objects(), 0);
}

#[test]
fn stale_errors_are_not_blamed_on_the_next_call() {
    let ctx = soft();
    ctx.device_mut()
        .inject_pending_error(DeviceError::Backend("left over".into()));
    assert!(VertexBuffer::new(&ctx, &[0u8; 4]).is_ok());
}

#[test]
fn vertex_array_appends_slots_per_buffer() {
    let ctx = soft();
    let positions = VertexBuffer::new(&ctx, &[0u8; 32]).unwrap();
    let colors = VertexBuffer::new(&ctx, &[0u8; 16]).unwrap();

    let mut first = VertexLayout::new();
    first.push(ComponentType::Float, 2).push(ComponentType::Float, 2);
    let mut second = VertexLayout::new();
    second.push(ComponentType::UByte, 4);

    let mut va = VertexArray::new(&ctx).unwrap();
    va.add_buffer(&positions, &first).unwrap();
    va.add_buffer(&colors, &second).unwrap();
    assert_eq!(va.slot_count(), 3);

    let dev = ctx.device();
    let attrs = dev.attributes(va.id());
    assert_eq!(attrs.len(), 3);
    assert_eq!(attrs[0].1, positions.buffer().id());
    assert_eq!((attrs[1].2.offset, attrs[1].2.stride), (8, 16));
    assert_eq!(attrs[2].1, colors.buffer().id());
    assert!(attrs[2].2.normalized);
    assert!((0..3).all(|slot| dev.is_attribute_enabled(va.id(), slot)));
}

#[test]
fn describing_attributes_needs_a_bound_array() {
    let ctx = soft();
    let vb = VertexBuffer::new(&ctx, &[0u8; 8]).unwrap();
    let mut layout = VertexLayout::new();
    layout.push_f32(2);
    vb.bind();
    let err = ctx
        .attribute_pointer(0, &layout.pointer(0).unwrap())
        .unwrap_err();
    assert!(is_invalid_operation(&err));
}

#[test]
fn repeated_uniform_set_queries_location_once() {
    let ctx = soft();
    let sh = shader(&ctx, FLAT_SHADER);
    assert!(sh.is_valid());

    sh.set_uniform_4f("u_Color", 0.2, 0.3, 0.8, 1.0).unwrap();
    sh.set_uniform_4f("u_Color", 0.8, 0.3, 0.2, 1.0).unwrap();

    let dev = ctx.device();
    assert_eq!(dev.uniform_queries(), 1);
    assert_eq!(dev.uniform_sets(), 2);
    let bytes = dev.uniform_bytes(sh.program().unwrap()).unwrap();
    assert_eq!(&bytes[64..80], bytemuck::cast_slice::<f32, u8>(&[0.8, 0.3, 0.2, 1.0]));
}

#[test]
fn missing_uniform_is_cached_as_absent() {
    capture_warnings();
    let ctx = soft();
    let sh = shader(&ctx, FLAT_SHADER);

    sh.set_uniform_1i("u_Tint", 0).unwrap();
    sh.set_uniform_1i("u_Tint", 0).unwrap();

    let dev = ctx.device();
    assert_eq!(dev.uniform_queries(), 1);
    assert_eq!(dev.uniform_sets(), 0);
    assert_eq!(sh.cached_locations(), 1);
    assert_eq!(warnings_mentioning("`u_Tint`"), 1);
}

#[test]
fn stages_with_different_uniforms_do_not_link() {
    let ctx = soft();
    let text = r#"
#shader vertex
struct Uniforms {
    u_MVP: mat4x4<f32>,
}
@group(0) @binding(0) var<uniform> u: Uniforms;

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return u.u_MVP * vec4<f32>(position, 0.0, 1.0);
}

#shader fragment
struct Uniforms {
    u_Color: vec4<f32>,
}
@group(0) @binding(0) var<uniform> u: Uniforms;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return u.u_Color;
}
"#;
    let sh = shader(&ctx, text);

    assert!(!sh.is_valid());
    assert_eq!(ctx.device().live_objects(), 0);
    assert!(sh.set_uniform_4f("u_Color", 9.0, 9.0, 9.0, 9.0).is_err());
}

#[test]
fn mismatched_uniform_type_is_rejected() {
    let ctx = soft();
    let sh = shader(&ctx, FLAT_SHADER);
    let err = sh.set_uniform_1i("u_Color", 3).unwrap_err();
    assert!(is_invalid_operation(&err));
}

#[test]
fn failed_compile_leaves_invalid_shader_and_no_leaks() {
    let ctx = soft();
    let broken = FLAT_SHADER.replace("@fragment", "");
    let sh = shader(&ctx, &broken);

    assert!(!sh.is_valid());
    assert_eq!(ctx.device().live_shaders(), 0);
    assert_eq!(ctx.device().live_objects(), 0);

    let err = sh.bind().unwrap_err();
    assert!(is_invalid_operation(&err));
    assert!(sh.set_uniform_4f("u_Color", 0.0, 0.0, 0.0, 1.0).is_err());
    assert_eq!(ctx.binding_state().program, None);
}

#[test]
fn linked_program_releases_its_stages() {
    let ctx = soft();
    let _sh = shader(&ctx, FLAT_SHADER);
    let dev = ctx.device();
    assert_eq!(dev.live_shaders(), 0);
    assert_eq!(dev.live_objects(), 1);
}

#[test]
fn draw_without_bindings_fails() {
    let ctx = soft();
    let err = ctx.draw_elements(6).unwrap_err();
    assert!(is_invalid_operation(&err));
    assert!(err.to_string().contains("vertex array"));
    assert!(ctx.device().draws().is_empty());
}

#[test]
fn texture_bind_targets_requested_unit() {
    let ctx = soft();
    let tex = Texture::from_rgba8(&ctx, 2, 1, &[0; 8], "pair").unwrap();
    tex.bind(1).unwrap();

    let state = ctx.binding_state();
    assert_eq!(state.active_unit, 1);
    assert_eq!(state.texture_units[1], Some(tex.id()));
    assert_eq!(state.texture_units[0], None);

    let err = tex.bind(8).unwrap_err();
    assert!(matches!(err.device_error(), DeviceError::InvalidValue(_)));
}

#[test]
fn texture_with_wrong_pixel_count_is_rejected() {
    let ctx = soft();
    assert!(Texture::from_rgba8(&ctx, 2, 2, &[0; 4], "short").is_err());
}

#[test]
fn clear_uses_current_clear_color() {
    let ctx = soft();
    let renderer = Renderer::new(&ctx);
    renderer.set_clear_color(ColorRgba::new(0.2, 0.3, 0.8, 1.0));
    renderer.clear().unwrap();
    assert_eq!(ctx.device().clears(), &[ColorRgba::new(0.2, 0.3, 0.8, 1.0)]);
}

#[test]
fn dropping_resources_releases_every_handle() {
    let ctx = soft();
    {
        let vb = VertexBuffer::new(&ctx, &[0u8; 36]).unwrap();
        let _ib = IndexBuffer::new(&ctx, &[0, 1, 2]).unwrap();
        let mut va = VertexArray::new(&ctx).unwrap();
        let mut layout = VertexLayout::new();
        layout.push_f32(2);
        va.add_buffer(&vb, &layout).unwrap();
        let _sh = shader(&ctx, FLAT_SHADER);
        let _tex = Texture::from_rgba8(&ctx, 1, 1, &[0; 4], "t").unwrap();
        assert_eq!(ctx.device().live_objects(), 5);
    }
    assert_eq!(ctx.device().live_objects(), 0);
    let state = ctx.binding_state();
    assert_eq!(state.array_buffer, None);
    assert_eq!(state.texture_units, [None; 8]);
}
