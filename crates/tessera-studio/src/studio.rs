use anyhow::{Context, Result};
use tessera_engine::device::{Device, SharedContext};
use tessera_engine::renderer::Renderer;

use crate::config::Assets;
use crate::input::{Input, Key};
use crate::scenes::{Menu, Scene, SceneKind};

/// Scene host: owns the live scene and switches scenes on key presses.
///
/// Field order is drop order: the scene goes first, so its GPU resources are
/// released while the context is still alive.
pub struct Studio<D: Device> {
    scene: Scene<D>,
    renderer: Renderer<D>,
    ctx: SharedContext<D>,
    assets: Assets,
}

impl<D: Device> Studio<D> {
    pub fn new(ctx: SharedContext<D>, assets: Assets) -> Self {
        log::info!("assets: {}", assets.root().display());
        Self {
            scene: Scene::Menu(Menu::new()),
            renderer: Renderer::new(&ctx),
            ctx,
            assets,
        }
    }

    pub fn context(&self) -> &SharedContext<D> {
        &self.ctx
    }

    pub fn scene_kind(&self) -> SceneKind {
        self.scene.kind()
    }

    /// Replaces the live scene. The old scene is dropped before the new one
    /// is built, so the two never hold GPU resources at the same time.
    pub fn switch(&mut self, kind: SceneKind) -> Result<()> {
        if kind == self.scene.kind() {
            return Ok(());
        }
        log::info!("scene: {} -> {kind}", self.scene.kind());
        self.scene = Scene::Menu(Menu::new());
        if kind != SceneKind::Menu {
            self.scene = Scene::build(kind, &self.ctx, &self.assets)
                .with_context(|| format!("building scene `{kind}`"))?;
        }
        Ok(())
    }

    /// Runs one frame: scene selection, then update and render of the live scene.
    pub fn frame(&mut self, dt: f32, input: &Input) -> Result<()> {
        if input.was_pressed(Key::Escape) {
            self.switch(SceneKind::Menu)?;
        } else if let Some(kind) = input.pressed_digit().and_then(SceneKind::from_digit) {
            self.switch(kind)?;
        }

        self.scene.update(dt, input);
        self.scene
            .render(&self.renderer)
            .with_context(|| format!("rendering scene `{}`", self.scene.kind()))
    }
}
