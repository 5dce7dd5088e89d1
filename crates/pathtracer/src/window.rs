use std::sync::Arc;
use std::time::{Duration, Instant};

use accumulator::{
    ChannelSink, DeviceDiagnostic, DiagnosticKind, DiagnosticSink, FrameRenderer, RenderContext,
    RendererError, ShaderProgram, WgpuBackend,
};
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::Receiver;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::config::AppConfig;

const STATS_INTERVAL: Duration = Duration::from_secs(1);

/// Opens the preview window and renders until it is closed.
pub fn run(config: AppConfig) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title(config.window.title.as_str())
        .with_inner_size(PhysicalSize::new(config.window.width, config.window.height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let mut renderer_config = config.to_renderer_config();
    let inner = window.inner_size();
    if inner.width > 0 && inner.height > 0 {
        renderer_config.surface_size = (inner.width, inner.height);
    }

    let program = match config.render.shader.as_deref() {
        Some(path) => ShaderProgram::load(path).context("failed to load shader")?,
        None => ShaderProgram::builtin(renderer_config.variant),
    };

    let mut context = RenderContext::new(
        Arc::clone(&window),
        renderer_config.surface_size,
        &renderer_config,
    )
    .context("failed to initialise GPU context")?;
    tracing::info!(
        adapter = %context.adapter_info().name,
        format = ?context.surface_format(),
        size = ?context.size(),
        mode = ?renderer_config.variant,
        "preview window ready"
    );

    let (diagnostics_tx, diagnostics_rx) = crossbeam_channel::unbounded();
    let sink: Arc<dyn DiagnosticSink> = Arc::new(ChannelSink::new(diagnostics_tx));
    let backend = context.backend(Arc::clone(&sink));
    let mut renderer = FrameRenderer::new(backend, renderer_config, sink);
    renderer
        .initialize(&program, context.surface_format())
        .context("failed to initialise frame renderer")?;

    let mut frame_rate = FrameRateCounter::new(Instant::now());
    let mut result = Ok(());
    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                elwt.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                match event.logical_key {
                    Key::Named(NamedKey::Escape) => elwt.exit(),
                    Key::Character(ref value) if value.as_str().eq_ignore_ascii_case("r") => {
                        renderer.reset_accumulation();
                        tracing::info!("accumulation restarted");
                    }
                    _ => {}
                }
            }
            WindowEvent::Resized(new_size) => {
                context.resize(new_size.width, new_size.height);
                if let Err(err) = renderer.resize(new_size.width, new_size.height) {
                    tracing::error!(
                        error = %err,
                        width = new_size.width,
                        height = new_size.height,
                        "resize rejected; keeping previous accumulation targets"
                    );
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = redraw(&context, &mut renderer, &mut frame_rate) {
                    result = Err(err);
                    elwt.exit();
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            if let Err(err) = drain_diagnostics(&diagnostics_rx) {
                result = Err(err);
                elwt.exit();
                return;
            }
            window.request_redraw();
            elwt.set_control_flow(ControlFlow::Wait);
        }
        _ => {}
    });

    if let Err(err) = run_result {
        result = Err(anyhow!("window event loop error: {err}"));
    }

    let stats = renderer.stats();
    tracing::info!(
        submitted = stats.submitted,
        lost = stats.lost,
        "preview closed"
    );
    result
}

fn redraw(
    context: &RenderContext,
    renderer: &mut FrameRenderer<WgpuBackend>,
    frame_rate: &mut FrameRateCounter,
) -> Result<()> {
    let frame = match context.acquire_frame() {
        Ok(frame) => frame,
        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
            context.reconfigure();
            return Ok(());
        }
        Err(wgpu::SurfaceError::OutOfMemory) => {
            return Err(anyhow!("surface out of memory; exiting preview"));
        }
        Err(wgpu::SurfaceError::Timeout) => {
            tracing::debug!("surface timeout; retrying next frame");
            return Ok(());
        }
        Err(other) => {
            tracing::warn!(error = ?other, "surface error; retrying next frame");
            return Ok(());
        }
    };

    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());
    match renderer.render_frame(&view) {
        Ok(report) => {
            if let Some(fps) = frame_rate.record(Instant::now()) {
                tracing::debug!(
                    fps = format_args!("{fps:.1}"),
                    frame = report.frame_index,
                    lost = renderer.stats().lost,
                    "render stats"
                );
            }
        }
        Err(err) if err.is_recoverable() => {
            tracing::warn!(error = %err, "frame dropped");
        }
        Err(err) => return Err(render_failure(err)),
    }
    frame.present();
    Ok(())
}

fn render_failure(err: RendererError) -> anyhow::Error {
    anyhow::Error::new(err).context("frame rendering failed")
}

/// Logs queued device events; device loss ends the preview.
fn drain_diagnostics(receiver: &Receiver<DeviceDiagnostic>) -> Result<()> {
    for diagnostic in receiver.try_iter() {
        match diagnostic.kind {
            DiagnosticKind::DeviceLost => {
                return Err(anyhow!("{}", diagnostic.message));
            }
            DiagnosticKind::FrameLost => {
                tracing::debug!(frame = ?diagnostic.frame_index, "{}", diagnostic.message);
            }
            kind => {
                tracing::warn!(?kind, "{}", diagnostic.message);
            }
        }
    }
    Ok(())
}

/// Counts presented frames and yields a rate once per interval.
struct FrameRateCounter {
    window_start: Instant,
    frames: u32,
}

impl FrameRateCounter {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
        }
    }

    fn record(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < STATS_INTERVAL {
            return None;
        }
        let fps = f64::from(self.frames) / elapsed.as_secs_f64();
        self.window_start = now;
        self.frames = 0;
        Some(fps)
    }
}
