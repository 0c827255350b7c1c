mod common;

use std::path::PathBuf;

use common::{shader, soft, FLAT_SHADER, TEXTURED_SHADER};
use tessera_engine::batch::{BatchError, DynamicBatch, Quad, StaticBatch};
use tessera_engine::coords::{ColorRgba, Mat4, Rect};
use tessera_engine::renderer::Renderer;
use tessera_engine::texture::{Texture, TextureError, TextureOptions};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tessera-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn two_quads() -> [Quad; 2] {
    [
        Quad::new(
            Rect::new(100.0, 100.0, 100.0, 100.0),
            ColorRgba::new(0.18, 0.6, 0.96, 1.0),
        ),
        Quad::new(
            Rect::new(300.0, 100.0, 100.0, 100.0),
            ColorRgba::new(1.0, 0.93, 0.24, 1.0),
        ),
    ]
}

#[test]
fn static_batch_draws_both_quads_in_one_call() {
    let ctx = soft();
    let renderer = Renderer::new(&ctx);
    let sh = shader(&ctx, FLAT_SHADER);
    let batch = StaticBatch::new(&ctx, &two_quads()).unwrap();

    let mvp = Mat4::orthographic(0.0, 960.0, 0.0, 720.0, -1.0, 1.0)
        * Mat4::translation(-100.0, 0.0, 0.0)
        * Mat4::translation(400.0, 200.0, 0.0);
    sh.bind().unwrap();
    sh.set_uniform_mat4f("u_MVP", &mvp).unwrap();
    renderer
        .draw(batch.vertex_array(), batch.index_buffer(), &sh)
        .unwrap();

    let dev = ctx.device();
    let draws = dev.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].call.index_count, 12);
    assert_eq!(draws[0].call.vertex_array, batch.vertex_array().id());
    assert_eq!(&draws[0].uniforms[..64], bytemuck::bytes_of(&mvp));

    let indices = dev
        .buffer_contents(batch.index_buffer().buffer().id())
        .unwrap();
    let indices: &[u32] = bytemuck::cast_slice(indices);
    assert_eq!(indices, &[0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
}

#[test]
fn each_draw_captures_its_own_transform() {
    let ctx = soft();
    let renderer = Renderer::new(&ctx);
    let sh = shader(&ctx, FLAT_SHADER);
    let batch = StaticBatch::new(&ctx, &two_quads()[..1]).unwrap();

    let a = Mat4::translation(200.0, 200.0, 0.0);
    let b = Mat4::translation(400.0, 200.0, 0.0);
    for model in [a, b] {
        sh.bind().unwrap();
        sh.set_uniform_mat4f("u_MVP", &model).unwrap();
        renderer
            .draw(batch.vertex_array(), batch.index_buffer(), &sh)
            .unwrap();
    }

    let dev = ctx.device();
    let draws = dev.draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(&draws[0].uniforms[..64], bytemuck::bytes_of(&a));
    assert_eq!(&draws[1].uniforms[..64], bytemuck::bytes_of(&b));
    assert_eq!(dev.uniform_queries(), 1);
}

#[test]
fn draw_with_invalid_shader_reaches_no_device() {
    let ctx = soft();
    let renderer = Renderer::new(&ctx);
    let sh = shader(&ctx, "#shader vertex\n@vertex fn main() {\n");
    let batch = StaticBatch::new(&ctx, &two_quads()).unwrap();

    assert!(renderer
        .draw(batch.vertex_array(), batch.index_buffer(), &sh)
        .is_err());
    assert!(ctx.device().draws().is_empty());
}

#[test]
fn dynamic_batch_rewrites_in_place() {
    let ctx = soft();
    let mut batch = DynamicBatch::new(&ctx, 250).unwrap();
    let vertex_id = batch.vertex_buffer().buffer().id();
    let index_id = batch.index_buffer().buffer().id();
    assert_eq!(batch.vertex_buffer().buffer().size(), 1000 * 36);
    assert_eq!(batch.index_buffer().capacity(), 1500);
    assert_eq!(batch.index_buffer().count(), 0);

    let mut quads = two_quads();
    batch.update(&quads).unwrap();
    quads[0].rect = Rect::new(110.0, 100.0, 100.0, 100.0);
    batch.update(&quads).unwrap();

    assert_eq!(batch.vertex_buffer().buffer().id(), vertex_id);
    assert_eq!(batch.index_buffer().buffer().id(), index_id);
    assert_eq!(batch.index_buffer().count(), 12);

    let dev = ctx.device();
    let bytes = dev.buffer_contents(vertex_id).unwrap();
    let first: [f32; 2] = bytemuck::pod_read_unaligned(&bytes[..8]);
    assert_eq!(first, [110.0, 100.0]);
}

#[test]
fn dynamic_batch_refuses_more_than_reserved() {
    let ctx = soft();
    let mut batch = DynamicBatch::new(&ctx, 1).unwrap();
    let err = batch.update(&two_quads()).unwrap_err();
    assert!(matches!(
        err,
        BatchError::CapacityExceeded {
            requested: 2,
            capacity: 1
        }
    ));
    assert_eq!(batch.index_buffer().count(), 0);
}

#[test]
fn textured_batch_samples_bound_units() {
    let ctx = soft();
    let renderer = Renderer::new(&ctx);
    let sh = shader(&ctx, TEXTURED_SHADER);
    assert!(sh.is_valid());

    let first = Texture::from_rgba8(&ctx, 1, 1, &[255, 0, 0, 255], "red").unwrap();
    let second = Texture::from_rgba8(&ctx, 1, 1, &[0, 0, 255, 255], "blue").unwrap();
    let [a, b] = two_quads();
    let batch = StaticBatch::new(&ctx, &[a.with_texture(0), b.with_texture(1)]).unwrap();

    first.bind(0).unwrap();
    second.bind(1).unwrap();
    sh.bind().unwrap();
    sh.set_uniform_1iv("u_Textures", &[0, 1]).unwrap();
    renderer
        .draw(batch.vertex_array(), batch.index_buffer(), &sh)
        .unwrap();

    let dev = ctx.device();
    let draw = &dev.draws()[0];
    assert_eq!(draw.call.textures[0], Some(first.id()));
    assert_eq!(draw.call.textures[1], Some(second.id()));
    assert_eq!(&draw.uniforms[64..68], &0i32.to_ne_bytes());
    assert_eq!(&draw.uniforms[80..84], &1i32.to_ne_bytes());
}

#[test]
fn png_is_flipped_to_bottom_up_rows() {
    let dir = scratch_dir("flip");
    let path = dir.join("stripes.png");
    // Top row red, bottom row blue.
    image::RgbaImage::from_raw(1, 2, vec![255, 0, 0, 255, 0, 0, 255, 255])
        .unwrap()
        .save(&path)
        .unwrap();

    let ctx = soft();
    let texture = Texture::from_path(&ctx, &path, &TextureOptions::default()).unwrap();
    assert_eq!((texture.width(), texture.height()), (1, 2));

    let dev = ctx.device();
    let (_, pixels) = dev.texture_pixels(texture.id()).unwrap();
    assert_eq!(pixels, &[0, 0, 255, 255, 255, 0, 0, 255]);
    drop(dev);

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn missing_image_is_a_decode_error() {
    let ctx = soft();
    let err = Texture::from_path(&ctx, "does/not/exist.png", &TextureOptions::default())
        .err()
        .unwrap();
    match err {
        TextureError::Decode { path, .. } => assert!(path.ends_with("exist.png")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ctx.device().live_objects(), 0);
}
