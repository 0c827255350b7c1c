use anyhow::{Context, Result};
use ouroboros::self_referencing;
use tessera_engine::device::{Gpu, GpuContext, GpuInit, SurfaceErrorAction, WgpuDevice};

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::clock::FrameClock;
use crate::config::RuntimeConfig;
use crate::input::Input;
use crate::studio::Studio;

/// Entry point for the windowed studio.
pub struct Runtime;

impl Runtime {
    pub fn run(config: RuntimeConfig, gpu_init: GpuInit) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState {
    config: RuntimeConfig,
    gpu_init: GpuInit,

    // Dropped before `window`: scene resources go before the surface.
    studio: Option<Studio<WgpuDevice>>,
    window: Option<WindowEntry>,

    input: Input,
    clock: FrameClock,
    fatal: Option<anyhow::Error>,
}

impl AppState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit) -> Self {
        Self {
            config,
            gpu_init,
            studio: None,
            window: None,
            input: Input::default(),
            clock: FrameClock::default(),
            fatal: None,
        }
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntry::try_new(window, |w| {
            pollster::block_on(Gpu::new(w, gpu_init)).context("GPU initialization failed")
        })?;

        let info = entry.borrow_gpu().adapter_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);
        log::info!("surface format: {:?}", entry.borrow_gpu().surface_format());

        let ctx = GpuContext::shared(entry.borrow_gpu().create_device());
        self.studio = Some(Studio::new(ctx, self.config.assets.clone()));
        self.window = Some(entry);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.studio = None;
        self.window = None;
        event_loop.exit();
    }

    fn redraw(&mut self) -> Result<()> {
        let (Some(entry), Some(studio)) = (self.window.as_mut(), self.studio.as_mut()) else {
            return Ok(());
        };

        let size = entry.borrow_gpu().size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        let frame = match entry.with_gpu_mut(|gpu| gpu.acquire()) {
            Ok(frame) => frame,
            Err(SurfaceErrorAction::Fatal) => anyhow::bail!("the surface ran out of memory"),
            Err(SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame) => return Ok(()),
        };

        let dt = self.clock.tick();
        studio.context().device_mut().begin_frame(frame.view.clone());
        let result = studio.frame(dt, &self.input);
        let commands = studio.context().device_mut().end_frame();
        entry.borrow_gpu().present(frame, commands);

        self.input.end_frame();
        result
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.create_window(event_loop) {
            self.fail(event_loop, err);
            return;
        }
        if let Some(entry) = &self.window {
            entry.borrow_window().request_redraw();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw; Fifo presentation paces the loop.
        if let Some(entry) = &self.window {
            entry.borrow_window().request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::KeyboardInput { event, .. } => self.input.key_event(&event),

            WindowEvent::Focused(false) => self.input.focus_lost(),

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.window.as_mut() {
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                    entry.borrow_window().request_redraw();
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.window.as_mut() {
                    let new_size = entry.borrow_window().inner_size();
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err);
                }
            }

            _ => {}
        }
    }
}
