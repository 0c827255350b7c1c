//! Demo scenes.
//!
//! The set is closed: `SceneKind` lists every scene and `Scene` holds the
//! live one. Each scene owns its GPU resources, so dropping a `Scene`
//! releases everything it built.
//!
//! All scenes share one camera: an orthographic 960x720 projection with the
//! origin bottom-left, a view shifted 100 px left, and a per-scene model
//! translation.

mod batching;
mod batching_textures;
mod batching_textures_dynamic;
mod clear_color;
mod menu;
mod texture_2d;

pub use batching::Batching;
pub use batching_textures::BatchingTextures;
pub use batching_textures_dynamic::BatchingTexturesDynamic;
pub use clear_color::ClearColor;
pub use menu::Menu;
pub use texture_2d::Texture2D;

use std::fmt;

use anyhow::Result;
use tessera_engine::coords::{ColorRgba, Mat4, Rect, Vec2};
use tessera_engine::device::{Device, SharedContext};
use tessera_engine::renderer::Renderer;

use crate::config::Assets;
use crate::input::{Input, Key};

/// Arrow-key speed in pixels per second.
pub const MOVE_SPEED: f32 = 200.0;

/// Largest coordinate a moved position may reach.
pub const MOVE_LIMIT: f32 = 960.0;

pub const QUAD_SIZE: f32 = 100.0;
pub const BLUE: ColorRgba = ColorRgba::new(0.18, 0.6, 0.96, 1.0);
pub const YELLOW: ColorRgba = ColorRgba::new(1.0, 0.93, 0.24, 1.0);

pub fn projection() -> Mat4 {
    Mat4::orthographic(0.0, 960.0, 0.0, 720.0, -1.0, 1.0)
}

pub fn view() -> Mat4 {
    Mat4::translation(-100.0, 0.0, 0.0)
}

/// `projection * view * model` for a model translated by `at`.
pub fn mvp(at: Vec2) -> Mat4 {
    projection() * view() * Mat4::translation(at.x, at.y, 0.0)
}

pub fn quad_rect(origin: Vec2) -> Rect {
    Rect::new(origin.x, origin.y, QUAD_SIZE, QUAD_SIZE)
}

/// Moves `targets[*selected]` with the arrow keys; Tab selects the next target.
pub(crate) fn steer(targets: &mut [Vec2], selected: &mut usize, dt: f32, input: &Input) {
    if targets.is_empty() {
        return;
    }
    if input.was_pressed(Key::Tab) {
        *selected = (*selected + 1) % targets.len();
        log::info!("moving target {}", *selected);
    }
    nudge(&mut targets[*selected], dt, input);
}

/// Moves `target` with the arrow keys, clamped to the slider range.
pub(crate) fn nudge(target: &mut Vec2, dt: f32, input: &Input) {
    let moved = *target + input.arrows() * (MOVE_SPEED * dt);
    *target = Vec2::new(
        moved.x.clamp(0.0, MOVE_LIMIT),
        moved.y.clamp(0.0, MOVE_LIMIT),
    );
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SceneKind {
    Menu,
    ClearColor,
    Texture2D,
    Batching,
    BatchingTextures,
    BatchingTexturesDynamic,
}

impl SceneKind {
    /// Selectable scenes in menu order; digit `n` picks `TESTS[n - 1]`.
    pub const TESTS: [SceneKind; 5] = [
        SceneKind::ClearColor,
        SceneKind::Texture2D,
        SceneKind::Batching,
        SceneKind::BatchingTextures,
        SceneKind::BatchingTexturesDynamic,
    ];

    pub fn from_digit(digit: u8) -> Option<SceneKind> {
        match digit {
            0 => Some(SceneKind::Menu),
            n => Self::TESTS.get(n as usize - 1).copied(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SceneKind::Menu => "Menu",
            SceneKind::ClearColor => "Clear Color",
            SceneKind::Texture2D => "Texture 2D",
            SceneKind::Batching => "Batching",
            SceneKind::BatchingTextures => "Batching Textures",
            SceneKind::BatchingTexturesDynamic => "Batching Textures Dynamic",
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The live scene.
pub enum Scene<D: Device> {
    Menu(Menu),
    ClearColor(ClearColor),
    Texture2D(Texture2D<D>),
    Batching(Batching<D>),
    BatchingTextures(BatchingTextures<D>),
    BatchingTexturesDynamic(BatchingTexturesDynamic<D>),
}

impl<D: Device> Scene<D> {
    /// Builds `kind`, loading whatever files it needs from `assets`.
    pub fn build(kind: SceneKind, ctx: &SharedContext<D>, assets: &Assets) -> Result<Self> {
        Ok(match kind {
            SceneKind::Menu => Scene::Menu(Menu::new()),
            SceneKind::ClearColor => Scene::ClearColor(ClearColor::new()),
            SceneKind::Texture2D => Scene::Texture2D(Texture2D::new(ctx, assets)?),
            SceneKind::Batching => Scene::Batching(Batching::new(ctx, assets)?),
            SceneKind::BatchingTextures => {
                Scene::BatchingTextures(BatchingTextures::new(ctx, assets)?)
            }
            SceneKind::BatchingTexturesDynamic => {
                Scene::BatchingTexturesDynamic(BatchingTexturesDynamic::new(ctx, assets)?)
            }
        })
    }

    pub fn kind(&self) -> SceneKind {
        match self {
            Scene::Menu(_) => SceneKind::Menu,
            Scene::ClearColor(_) => SceneKind::ClearColor,
            Scene::Texture2D(_) => SceneKind::Texture2D,
            Scene::Batching(_) => SceneKind::Batching,
            Scene::BatchingTextures(_) => SceneKind::BatchingTextures,
            Scene::BatchingTexturesDynamic(_) => SceneKind::BatchingTexturesDynamic,
        }
    }

    pub fn update(&mut self, dt: f32, input: &Input) {
        match self {
            Scene::Menu(_) => {}
            Scene::ClearColor(s) => s.update(input),
            Scene::Texture2D(s) => s.update(dt, input),
            Scene::Batching(s) => s.update(dt, input),
            Scene::BatchingTextures(s) => s.update(dt, input),
            Scene::BatchingTexturesDynamic(s) => s.update(dt, input),
        }
    }

    pub fn render(&mut self, renderer: &Renderer<D>) -> Result<()> {
        match self {
            Scene::Menu(s) => s.render(renderer)?,
            Scene::ClearColor(s) => s.render(renderer)?,
            Scene::Texture2D(s) => s.render(renderer)?,
            Scene::Batching(s) => s.render(renderer)?,
            Scene::BatchingTextures(s) => s.render(renderer)?,
            Scene::BatchingTexturesDynamic(s) => s.render(renderer)?,
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use tessera_engine::device::{GpuContext, SharedContext, SoftDevice};
    use tessera_engine::renderer::Renderer;

    use crate::config::Assets;

    pub fn soft() -> (SharedContext<SoftDevice>, Renderer<SoftDevice>, Assets) {
        let ctx = GpuContext::shared(SoftDevice::new());
        let renderer = Renderer::new(&ctx);
        (ctx, renderer, Assets::bundled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_engine::device::SoftDevice;

    #[test]
    fn digits_pick_scenes_in_menu_order() {
        assert_eq!(SceneKind::from_digit(0), Some(SceneKind::Menu));
        assert_eq!(SceneKind::from_digit(1), Some(SceneKind::ClearColor));
        assert_eq!(
            SceneKind::from_digit(5),
            Some(SceneKind::BatchingTexturesDynamic)
        );
        assert_eq!(SceneKind::from_digit(6), None);
    }

    #[test]
    fn mvp_maps_model_origin_through_camera() {
        let clip = mvp(Vec2::new(580.0, 360.0)).transform_point([0.0, 0.0, 0.0]);
        assert!((clip[0] - 0.0).abs() < 1e-5);
        assert!((clip[1] - 0.0).abs() < 1e-5);
    }

    #[test]
    fn steer_moves_selected_target_only() {
        let mut targets = [Vec2::new(10.0, 10.0), Vec2::new(20.0, 20.0)];
        let mut selected = 0;
        let mut input = Input::default();
        input.set_key(Key::Tab, true);
        input.set_key(Key::ArrowRight, true);
        steer(&mut targets, &mut selected, 0.5, &input);
        assert_eq!(selected, 1);
        assert_eq!(targets[0], Vec2::new(10.0, 10.0));
        assert_eq!(targets[1], Vec2::new(120.0, 20.0));
    }

    #[test]
    fn steer_stays_in_range() {
        let mut targets = [Vec2::new(5.0, 5.0)];
        let mut selected = 0;
        let mut input = Input::default();
        input.set_key(Key::ArrowDown, true);
        steer(&mut targets, &mut selected, 0.25, &input);
        assert_eq!(targets[0], Vec2::new(5.0, 0.0));
    }

    #[test]
    fn nudge_ignores_tab_and_clamps() {
        let mut at = Vec2::new(950.0, 100.0);
        let mut input = Input::default();
        input.set_key(Key::Tab, true);
        input.set_key(Key::ArrowRight, true);
        nudge(&mut at, 0.5, &input);
        assert_eq!(at, Vec2::new(MOVE_LIMIT, 100.0));
    }

    #[test]
    fn every_scene_builds_and_renders() {
        let (ctx, renderer, assets) = testing::soft();
        for kind in std::iter::once(SceneKind::Menu).chain(SceneKind::TESTS) {
            let mut scene = Scene::<SoftDevice>::build(kind, &ctx, &assets).unwrap();
            assert_eq!(scene.kind(), kind);
            scene.update(0.016, &Input::default());
            scene.render(&renderer).unwrap();
            drop(scene);
            assert_eq!(ctx.device().live_objects(), 0, "{kind} leaked");
        }
        assert_eq!(ctx.device().clears().len(), 6);
    }
}
