use anyhow::{Context, Result};
use tessera_engine::batch::{DynamicBatch, Quad};
use tessera_engine::coords::{ColorRgba, Vec2};
use tessera_engine::device::{Device, SharedContext};
use tessera_engine::renderer::Renderer;
use tessera_engine::shader::Shader;
use tessera_engine::texture::Texture;

use super::batching_textures::{load_logos, TEXTURE_UNITS};
use super::{mvp, quad_rect, steer, BLUE};
use crate::config::Assets;
use crate::input::Input;

/// Quads reserved up front (1000 vertices).
pub const MAX_QUADS: usize = 250;

const TRANSLATION: usize = 0;

/// The textured batch rebuilt every frame from movable quad positions.
///
/// Tab cycles between the shared translation and the two quads.
pub struct BatchingTexturesDynamic<D: Device> {
    batch: DynamicBatch<D>,
    shader: Shader<D>,
    textures: [Texture<D>; 2],
    /// `[translation, quad 0 origin, quad 1 origin]`
    targets: [Vec2; 3],
    selected: usize,
}

impl<D: Device> BatchingTexturesDynamic<D> {
    pub fn new(ctx: &SharedContext<D>, assets: &Assets) -> Result<Self> {
        let batch = DynamicBatch::new(ctx, MAX_QUADS)?;
        let shader = Shader::from_path(ctx, assets.shader("BatchTextures.shader"))
            .context("loading BatchTextures.shader")?;
        let textures = load_logos(ctx, assets)?;
        Ok(Self {
            batch,
            shader,
            textures,
            targets: [
                Vec2::new(400.0, 200.0),
                Vec2::new(100.0, 100.0),
                Vec2::new(300.0, 100.0),
            ],
            selected: TRANSLATION,
        })
    }

    pub fn quads(&self) -> [Quad; 2] {
        [
            Quad::new(quad_rect(self.targets[1]), BLUE).with_texture(0),
            Quad::new(quad_rect(self.targets[2]), BLUE).with_texture(1),
        ]
    }

    pub fn update(&mut self, dt: f32, input: &Input) {
        steer(&mut self.targets, &mut self.selected, dt, input);
    }

    pub fn render(&mut self, renderer: &Renderer<D>) -> Result<()> {
        self.batch.update(&self.quads())?;

        renderer.set_clear_color(ColorRgba::black());
        renderer.clear()?;
        if !self.shader.is_valid() {
            return Ok(());
        }

        self.shader.bind()?;
        self.shader
            .set_uniform_mat4f("u_MVP", &mvp(self.targets[TRANSLATION]))?;
        for (texture, unit) in self.textures.iter().zip(TEXTURE_UNITS) {
            texture.bind(unit as u32)?;
        }
        self.shader.set_uniform_1iv("u_Textures", &TEXTURE_UNITS)?;
        renderer.draw(self.batch.vertex_array(), self.batch.index_buffer(), &self.shader)?;
        Ok(())
    }
}
