use anyhow::{Context, Result};
use tessera_engine::batch::{Quad, StaticBatch};
use tessera_engine::coords::{ColorRgba, Vec2};
use tessera_engine::device::{Device, SharedContext};
use tessera_engine::renderer::Renderer;
use tessera_engine::shader::Shader;
use tessera_engine::texture::{Texture, TextureOptions};

use super::{mvp, nudge, quad_rect, BLUE, YELLOW};
use crate::config::Assets;
use crate::input::Input;

/// Texture units sampled by the batch; quad `i` reads unit `i`.
pub const TEXTURE_UNITS: [i32; 2] = [0, 1];

/// Loads the two logos bound to units 0 and 1.
pub(crate) fn load_logos<D: Device>(
    ctx: &SharedContext<D>,
    assets: &Assets,
) -> Result<[Texture<D>; 2]> {
    let options = TextureOptions::default();
    Ok([
        Texture::from_path(ctx, assets.texture("ChernoLogo.png"), &options)?,
        Texture::from_path(ctx, assets.texture("HazelLogo.png"), &options)?,
    ])
}

/// Two quads sampling different textures, still a single static batch.
pub struct BatchingTextures<D: Device> {
    batch: StaticBatch<D>,
    shader: Shader<D>,
    textures: [Texture<D>; 2],
    translation: Vec2,
}

impl<D: Device> BatchingTextures<D> {
    pub fn new(ctx: &SharedContext<D>, assets: &Assets) -> Result<Self> {
        let quads = [
            Quad::new(quad_rect(Vec2::new(100.0, 100.0)), BLUE).with_texture(0),
            Quad::new(quad_rect(Vec2::new(300.0, 100.0)), YELLOW).with_texture(1),
        ];
        let batch = StaticBatch::new(ctx, &quads)?;
        let shader = Shader::from_path(ctx, assets.shader("BatchTextures.shader"))
            .context("loading BatchTextures.shader")?;
        let textures = load_logos(ctx, assets)?;
        Ok(Self {
            batch,
            shader,
            textures,
            translation: Vec2::new(400.0, 200.0),
        })
    }

    pub fn update(&mut self, dt: f32, input: &Input) {
        nudge(&mut self.translation, dt, input);
    }

    pub fn render(&self, renderer: &Renderer<D>) -> Result<()> {
        renderer.set_clear_color(ColorRgba::black());
        renderer.clear()?;
        if !self.shader.is_valid() {
            return Ok(());
        }

        self.shader.bind()?;
        self.shader
            .set_uniform_mat4f("u_MVP", &mvp(self.translation))?;
        for (texture, unit) in self.textures.iter().zip(TEXTURE_UNITS) {
            texture.bind(unit as u32)?;
        }
        self.shader.set_uniform_1iv("u_Textures", &TEXTURE_UNITS)?;
        renderer.draw(self.batch.vertex_array(), self.batch.index_buffer(), &self.shader)?;
        Ok(())
    }
}
