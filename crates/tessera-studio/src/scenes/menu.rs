use tessera_engine::coords::ColorRgba;
use tessera_engine::device::{Device, GpuResult};
use tessera_engine::renderer::Renderer;

use super::SceneKind;

/// Scene picker. Draws nothing; the digits shown in the log select a scene.
#[derive(Debug)]
pub struct Menu;

impl Menu {
    pub fn new() -> Self {
        for (n, kind) in SceneKind::TESTS.iter().enumerate() {
            log::info!("[{}] {kind}", n + 1);
        }
        Menu
    }

    pub fn render<D: Device>(&self, renderer: &Renderer<D>) -> GpuResult<()> {
        renderer.set_clear_color(ColorRgba::black());
        renderer.clear()
    }
}
