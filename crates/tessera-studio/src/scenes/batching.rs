use anyhow::{Context, Result};
use tessera_engine::batch::{Quad, StaticBatch};
use tessera_engine::coords::{ColorRgba, Vec2};
use tessera_engine::device::{Device, SharedContext};
use tessera_engine::renderer::Renderer;
use tessera_engine::shader::Shader;

use super::{mvp, nudge, quad_rect, BLUE, YELLOW};
use crate::config::Assets;
use crate::input::Input;

/// Two flat-colored quads merged into one static batch and drawn once.
pub struct Batching<D: Device> {
    batch: StaticBatch<D>,
    shader: Shader<D>,
    translation: Vec2,
}

impl<D: Device> Batching<D> {
    pub fn new(ctx: &SharedContext<D>, assets: &Assets) -> Result<Self> {
        let quads = [
            Quad::new(quad_rect(Vec2::new(100.0, 100.0)), BLUE),
            Quad::new(quad_rect(Vec2::new(300.0, 100.0)), YELLOW),
        ];
        let batch = StaticBatch::new(ctx, &quads)?;
        let shader = Shader::from_path(ctx, assets.shader("Batch.shader"))
            .context("loading Batch.shader")?;
        Ok(Self {
            batch,
            shader,
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
        renderer.draw(self.batch.vertex_array(), self.batch.index_buffer(), &self.shader)?;
        Ok(())
    }
}
