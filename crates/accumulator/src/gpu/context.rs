use std::sync::Arc;

use crate::diagnostics::DiagnosticSink;
use crate::error::RendererError;
use crate::types::{GpuPowerPreference, RendererConfig, VsyncMode};

use super::backend::WgpuBackend;

/// Instance, surface, device and queue for one window.
///
/// The context owns presentation: it configures the surface, hands out
/// frames to draw into and keeps the surface in step with the window size.
/// Rendering goes through the [`WgpuBackend`] returned by
/// [`backend`](Self::backend).
pub struct RenderContext {
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    adapter_info: wgpu::AdapterInfo,
}

impl RenderContext {
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: (u32, u32),
        renderer: &RendererConfig,
    ) -> Result<Self, RendererError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance
            .create_surface(target)
            .map_err(|err| init_failure("failed to create rendering surface", err))?;

        let power_preference = match renderer.power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| init_failure("failed to find a suitable GPU adapter", err))?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "selected GPU adapter"
        );

        if renderer.variant.accumulates() {
            let downlevel = adapter.get_downlevel_capabilities();
            if !downlevel
                .flags
                .contains(wgpu::DownlevelFlags::FRAGMENT_WRITABLE_STORAGE)
            {
                return Err(RendererError::InitializationFailure(format!(
                    "adapter {} cannot write storage textures from fragment shaders",
                    adapter_info.name
                )));
            }
        }

        let (width, height) = (size.0.max(1), size.1.max(1));
        let max_dimension = limits.max_texture_dimension_2d;
        if width > max_dimension || height > max_dimension {
            return Err(RendererError::exhausted(
                "surface",
                format!("{width}x{height} exceeds the device limit of {max_dimension}"),
            ));
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&first_format) = surface_caps.formats.first() else {
            return Err(RendererError::InitializationFailure(
                "surface is incompatible with the selected adapter".into(),
            ));
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or_else(|| {
                tracing::warn!(
                    fallback = ?first_format,
                    "no linear (non-sRGB) surface format available; falling back"
                );
                first_format
            });

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("accumulator device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| init_failure("failed to create GPU device", err))?;

        let desired_maximum_frame_latency = renderer.frame_latency.clamp(1, 3);
        if desired_maximum_frame_latency != renderer.frame_latency {
            tracing::warn!(
                requested = renderer.frame_latency,
                clamped = desired_maximum_frame_latency,
                "GPU frame latency clamped to valid range (1-3)"
            );
        }

        let present_mode = select_present_mode(&surface_caps.present_modes, renderer.vsync);
        tracing::debug!(?present_mode, vsync = ?renderer.vsync, "using present mode");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            adapter_info,
        })
    }

    /// Rendering backend sharing this context's device and queue. Device
    /// errors and device loss are reported to `diagnostics`.
    pub fn backend(&self, diagnostics: Arc<dyn DiagnosticSink>) -> WgpuBackend {
        WgpuBackend::new(self.device.clone(), self.queue.clone(), diagnostics)
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Reconfigures the surface for a new window size. Zero-sized requests
    /// (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
    }

    /// Applies the current configuration again, e.g. after the surface was
    /// lost or became outdated.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Next surface texture to render into and present.
    pub fn acquire_frame(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }
}

fn init_failure(context: &str, err: impl std::fmt::Display) -> RendererError {
    RendererError::InitializationFailure(format!("{context}: {err}"))
}

/// Present mode for `vsync` among the modes the surface supports. `Fifo` is
/// always available, so it is the final fallback.
fn select_present_mode(available: &[wgpu::PresentMode], vsync: VsyncMode) -> wgpu::PresentMode {
    let preferred: &[wgpu::PresentMode] = match vsync {
        VsyncMode::Enabled => &[wgpu::PresentMode::Fifo],
        VsyncMode::Disabled => &[wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox],
    };
    preferred
        .iter()
        .copied()
        .find(|mode| available.contains(mode))
        .unwrap_or(wgpu::PresentMode::Fifo)
}
