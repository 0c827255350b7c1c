use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::error::SurfaceErrorAction;
use super::wgpu_device::WgpuDevice;

/// Window-bound GPU settings.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Wait for vertical sync (Fifo). This is the only backpressure the
    /// render loop has; without it frames are presented as fast as possible.
    pub vsync: bool,

    /// Render into an sRGB surface when one is offered. Off means colors are
    /// written to the framebuffer unconverted.
    pub srgb: bool,

    pub power_preference: wgpu::PowerPreference,

    /// Frames the surface may queue ahead of presentation.
    pub frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            vsync: true,
            srgb: false,
            power_preference: wgpu::PowerPreference::HighPerformance,
            frame_latency: 2,
        }
    }
}

/// The surface of one window plus the wgpu device rendering into it.
///
/// `Gpu` only deals with the swapchain: configuration, resize, acquire and
/// present. Drawing goes through the `WgpuDevice` from `create_device`.
pub struct Gpu<'w> {
    /// Borrows the window; the window must outlive `Gpu`.
    surface: wgpu::Surface<'w>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
}

/// One acquired swapchain image; hand it back through `Gpu::present`.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl<'w> Gpu<'w> {
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(
            size.width > 0 && size.height > 0,
            "cannot render into a {}x{} window",
            size.width,
            size.height
        );

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .context("creating the window surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter can present to this window")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("tessera"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("requesting the GPU device")?;

        let config = surface_config(&surface.get_capabilities(&adapter), size, &init)?;
        surface.configure(&device, &config);
        log::debug!(
            "surface {:?} {}x{} {:?}",
            config.format,
            config.width,
            config.height,
            config.present_mode
        );

        Ok(Self {
            surface,
            adapter,
            device,
            queue,
            config,
            size,
        })
    }

    /// A device backend drawing in this surface's format.
    pub fn create_device(&self) -> WgpuDevice {
        WgpuDevice::new(self.device.clone(), self.queue.clone(), self.config.format)
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Follows the window size. A minimized (0x0) window keeps the old
    /// configuration until it is restored.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        if size.width > 0 && size.height > 0 {
            self.config.width = size.width;
            self.config.height = size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Acquires the next swapchain image.
    ///
    /// On failure the surface is repaired where possible and the caller learns
    /// whether to skip this frame or stop.
    pub fn acquire(&mut self) -> std::result::Result<GpuFrame, SurfaceErrorAction> {
        match self.surface.get_current_texture() {
            Ok(surface_texture) => {
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(GpuFrame {
                    surface_texture,
                    view,
                })
            }
            Err(err) => {
                let action = self.triage(&err);
                log::warn!("surface error: {err} ({action:?})");
                Err(action)
            }
        }
    }

    /// Submits `commands` and shows the frame.
    pub fn present(&self, frame: GpuFrame, commands: Option<wgpu::CommandBuffer>) {
        self.queue.submit(commands);
        drop(frame.view);
        frame.surface_texture.present();
    }

    fn triage(&mut self, err: &SurfaceError) -> SurfaceErrorAction {
        match err {
            SurfaceError::Lost | SurfaceError::Outdated => {
                let size = self.size;
                self.resize(size);
                SurfaceErrorAction::Reconfigured
            }
            SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
            SurfaceError::Timeout | SurfaceError::Other => SurfaceErrorAction::SkipFrame,
        }
    }
}

fn surface_config(
    caps: &wgpu::SurfaceCapabilities,
    size: PhysicalSize<u32>,
    init: &GpuInit,
) -> Result<wgpu::SurfaceConfiguration> {
    let format = caps
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb() == init.srgb)
        .or_else(|| caps.formats.first().copied())
        .context("the surface supports no texture formats")?;

    let present_mode = if init.vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::AutoNoVsync
    };

    Ok(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width,
        height: size.height,
        present_mode,
        alpha_mode: caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
        view_formats: Vec::new(),
        desired_maximum_frame_latency: init.frame_latency,
    })
}
