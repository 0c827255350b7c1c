use tessera_engine::coords::ColorRgba;
use tessera_engine::device::{Device, GpuResult};
use tessera_engine::renderer::Renderer;

use crate::input::{Input, Key};

/// Colors C cycles through; the first is the initial one.
pub const PALETTE: [ColorRgba; 4] = [
    ColorRgba::new(0.2, 0.3, 0.8, 1.0),
    ColorRgba::new(0.8, 0.3, 0.2, 1.0),
    ColorRgba::new(0.2, 0.7, 0.3, 1.0),
    ColorRgba::new(0.1, 0.1, 0.1, 1.0),
];

#[derive(Debug)]
pub struct ClearColor {
    index: usize,
}

impl ClearColor {
    pub fn new() -> Self {
        Self { index: 0 }
    }

    pub fn color(&self) -> ColorRgba {
        PALETTE[self.index]
    }

    pub fn update(&mut self, input: &Input) {
        if input.was_pressed(Key::C) {
            self.index = (self.index + 1) % PALETTE.len();
            log::info!("clear color {:?}", self.color());
        }
    }

    pub fn render<D: Device>(&self, renderer: &Renderer<D>) -> GpuResult<()> {
        renderer.set_clear_color(self.color());
        renderer.clear()
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes::testing;

    #[test]
    fn clears_with_selected_color() {
        let (ctx, renderer, _) = testing::soft();
        let mut scene = ClearColor::new();
        scene.render(&renderer).unwrap();

        let mut input = Input::default();
        input.set_key(Key::C, true);
        scene.update(&input);
        scene.render(&renderer).unwrap();

        assert_eq!(ctx.device().clears(), &[PALETTE[0], PALETTE[1]]);
    }

    #[test]
    fn palette_wraps() {
        let mut scene = ClearColor::new();
        let mut input = Input::default();
        for _ in 0..PALETTE.len() {
            input.set_key(Key::C, true);
            scene.update(&input);
            input.end_frame();
            input.set_key(Key::C, false);
        }
        assert_eq!(scene.color(), PALETTE[0]);
    }
}
