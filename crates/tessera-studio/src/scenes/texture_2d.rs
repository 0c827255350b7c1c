use anyhow::{Context, Result};
use tessera_engine::batch::QUAD_INDICES;
use tessera_engine::buffer::{IndexBuffer, VertexBuffer};
use tessera_engine::coords::{ColorRgba, Vec2};
use tessera_engine::device::{Device, SharedContext};
use tessera_engine::layout::VertexLayout;
use tessera_engine::renderer::Renderer;
use tessera_engine::shader::Shader;
use tessera_engine::texture::{Texture, TextureOptions};
use tessera_engine::vertex_array::VertexArray;

use super::{mvp, steer};
use crate::config::Assets;
use crate::input::Input;

/// Position xy and texcoord uv of a 100x100 quad centered on the origin.
#[rustfmt::skip]
const VERTICES: [f32; 16] = [
    -50.0, -50.0, 0.0, 0.0,
     50.0, -50.0, 1.0, 0.0,
     50.0,  50.0, 1.0, 1.0,
    -50.0,  50.0, 0.0, 1.0,
];

/// One textured quad drawn twice, at two independently movable translations.
pub struct Texture2D<D: Device> {
    vertex_array: VertexArray<D>,
    _vertices: VertexBuffer<D>,
    indices: IndexBuffer<D>,
    shader: Shader<D>,
    texture: Texture<D>,
    translations: [Vec2; 2],
    selected: usize,
}

impl<D: Device> Texture2D<D> {
    pub fn new(ctx: &SharedContext<D>, assets: &Assets) -> Result<Self> {
        let vertices = VertexBuffer::new(ctx, bytemuck::cast_slice(&VERTICES))?;
        let mut layout = VertexLayout::new();
        layout.push_f32(2).push_f32(2);
        let mut vertex_array = VertexArray::new(ctx)?;
        vertex_array.add_buffer(&vertices, &layout)?;
        let indices = IndexBuffer::new(ctx, &QUAD_INDICES)?;

        let shader = Shader::from_path(ctx, assets.shader("Basic.shader"))
            .context("loading Basic.shader")?;
        if shader.is_valid() {
            shader.bind()?;
            shader.set_uniform_1i("u_Texture", 0)?;
        }
        let texture = Texture::from_path(
            ctx,
            assets.texture("ChernoLogo.png"),
            &TextureOptions::default(),
        )?;

        Ok(Self {
            vertex_array,
            _vertices: vertices,
            indices,
            shader,
            texture,
            translations: [Vec2::new(200.0, 200.0), Vec2::new(400.0, 200.0)],
            selected: 0,
        })
    }

    pub fn update(&mut self, dt: f32, input: &Input) {
        steer(&mut self.translations, &mut self.selected, dt, input);
    }

    pub fn render(&self, renderer: &Renderer<D>) -> Result<()> {
        renderer.set_clear_color(ColorRgba::black());
        renderer.clear()?;
        if !self.shader.is_valid() {
            return Ok(());
        }

        self.texture.bind(0)?;
        for at in self.translations {
            self.shader.bind()?;
            self.shader.set_uniform_mat4f("u_MVP", &mvp(at))?;
            renderer.draw(&self.vertex_array, &self.indices, &self.shader)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Key;
    use crate::scenes::testing;

    #[test]
    fn draws_the_quad_once_per_translation() {
        let (ctx, renderer, assets) = testing::soft();
        let scene = Texture2D::new(&ctx, &assets).unwrap();
        scene.render(&renderer).unwrap();

        let dev = ctx.device();
        let draws = dev.draws();
        assert_eq!(draws.len(), 2);
        for (draw, at) in draws.iter().zip(scene.translations) {
            assert_eq!(draw.call.index_count, 6);
            assert_eq!(draw.call.textures[0], Some(scene.texture.id()));
            assert_eq!(&draw.uniforms[..64], bytemuck::bytes_of(&mvp(at)));
        }
        // u_Texture once at construction, then u_MVP per draw.
        assert_eq!(dev.uniform_sets(), 3);
        assert_eq!(&draws[0].uniforms[64..68], &0i32.to_ne_bytes());
    }

    #[test]
    fn tab_switches_the_moved_translation() {
        let (ctx, _, assets) = testing::soft();
        let mut scene = Texture2D::new(&ctx, &assets).unwrap();
        let mut input = Input::default();
        input.set_key(Key::Tab, true);
        input.set_key(Key::ArrowUp, true);
        scene.update(0.1, &input);
        assert_eq!(
            scene.translations,
            [Vec2::new(200.0, 200.0), Vec2::new(400.0, 220.0)]
        );
    }
}
