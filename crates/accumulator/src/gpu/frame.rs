use std::sync::Arc;

use crate::diagnostics::{DeviceDiagnostic, DiagnosticSink};
use crate::error::RendererError;
use crate::types::RendererConfig;

use super::backend::{DisplayPass, GpuBackend};
use super::bindings::{self, BindGroupRotator};
use super::pipeline::{DisplayPipeline, FULLSCREEN_VERTEX_COUNT};
use super::program::ShaderProgram;
use super::textures::AccumulationTextureSet;
use super::uniforms::{UniformLayout, UniformState, UniformTracker};

/// Outcome of one successfully submitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame_index: u32,
    pub parity: usize,
    /// Whether the pass cleared the target before drawing.
    pub cleared: bool,
}

/// Frame counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub submitted: u64,
    pub lost: u64,
}

/// Everything that only exists after a successful `initialize`.
struct FrameResources<B: GpuBackend> {
    pipeline: DisplayPipeline<B>,
    uniform_buffer: B::Buffer,
    uniform_layout: UniformLayout,
    textures: Option<AccumulationTextureSet<B>>,
    bind_groups: BindGroupRotator<B>,
    uniforms: UniformTracker,
    needs_clear: bool,
}

/// Drives the display pass frame after frame.
///
/// Each `render_frame` call runs one `Idle -> FrameInProgress -> Idle` cycle:
/// take the next uniform snapshot, upload it, pick the bind group for the
/// frame's parity, then record and submit a single full-screen pass. Methods
/// take `&mut self`, so frames, resizes and pipeline rebuilds on one renderer
/// are strictly sequential.
pub struct FrameRenderer<B: GpuBackend> {
    backend: B,
    config: RendererConfig,
    diagnostics: Arc<dyn DiagnosticSink>,
    resources: Option<FrameResources<B>>,
    stats: FrameStats,
}

impl<B: GpuBackend> FrameRenderer<B> {
    /// Creates an uninitialized renderer; no GPU work happens until
    /// [`initialize`](Self::initialize).
    pub fn new(backend: B, config: RendererConfig, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            backend,
            config,
            diagnostics,
            resources: None,
            stats: FrameStats::default(),
        }
    }

    /// Compiles the display pipeline and allocates the uniform buffer, the
    /// accumulation textures and their bind groups at the configured size.
    pub fn initialize(
        &mut self,
        program: &ShaderProgram,
        target_format: wgpu::TextureFormat,
    ) -> Result<(), RendererError> {
        let variant = self.config.variant;
        let (width, height) = self.config.surface_size;
        let (width, height) = (width.max(1), height.max(1));
        let uniform_layout = variant.uniform_layout();

        let pipeline = DisplayPipeline::build(&self.backend, program, target_format, variant)?;
        let uniform_buffer = self
            .backend
            .create_uniform_buffer("frame uniforms", uniform_layout.byte_len() as u64)?;
        let textures = if variant.accumulates() {
            Some(AccumulationTextureSet::create(&self.backend, width, height)?)
        } else {
            None
        };
        let bind_groups = BindGroupRotator::build(
            &self.backend,
            &pipeline.layout,
            &uniform_buffer,
            textures.as_ref(),
        )?;

        tracing::debug!(width, height, ?variant, "frame renderer initialized");

        self.resources = Some(FrameResources {
            pipeline,
            uniform_buffer,
            uniform_layout,
            textures,
            bind_groups,
            uniforms: UniformTracker::new(width, height),
            needs_clear: true,
        });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.resources.is_some()
    }

    /// Renders one frame into `target`.
    ///
    /// A failed submission is reported once to the diagnostic sink and
    /// returned as `DeviceOperationFailed`; the frame counter stays advanced
    /// and the next call proceeds normally.
    pub fn render_frame(&mut self, target: &B::TextureView) -> Result<FrameReport, RendererError> {
        let Some(resources) = self.resources.as_mut() else {
            return Err(RendererError::InitializationFailure(
                "render_frame called before initialize".into(),
            ));
        };

        let state = resources.uniforms.advance();
        let encoded = state.encode();
        self.backend.write_uniforms(
            &resources.uniform_buffer,
            &encoded[..resources.uniform_layout.byte_len()],
        );

        let parity = bindings::select(state.frame_index);
        let cleared = resources.needs_clear;
        let load = if cleared {
            wgpu::LoadOp::Clear(self.config.clear_color)
        } else {
            wgpu::LoadOp::Load
        };

        let submitted = self.backend.submit_display_pass(DisplayPass {
            label: "display pass",
            target,
            load,
            pipeline: &resources.pipeline.pipeline,
            bind_group: resources.bind_groups.bind_group(state.frame_index),
            vertex_count: FULLSCREEN_VERTEX_COUNT,
        });

        if let Err(err) = submitted {
            self.stats.lost += 1;
            self.diagnostics
                .report(DeviceDiagnostic::frame_lost(state.frame_index, &err));
            return Err(err);
        }

        resources.needs_clear = false;
        self.stats.submitted += 1;
        tracing::trace!(frame = state.frame_index, parity, cleared, "submitted frame");

        Ok(FrameReport {
            frame_index: state.frame_index,
            parity,
            cleared,
        })
    }

    /// Reallocates the accumulation textures at the new size and restarts
    /// accumulation. Zero-sized requests are ignored. On failure the previous
    /// textures and bind groups stay in place.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RendererError> {
        if width == 0 || height == 0 {
            tracing::debug!(width, height, "ignoring zero-sized resize");
            return Ok(());
        }
        let Some(resources) = self.resources.as_mut() else {
            self.config.surface_size = (width, height);
            return Ok(());
        };

        let textures = if resources.textures.is_some() {
            Some(AccumulationTextureSet::create(&self.backend, width, height)?)
        } else {
            None
        };
        let bind_groups = BindGroupRotator::build(
            &self.backend,
            &resources.pipeline.layout,
            &resources.uniform_buffer,
            textures.as_ref(),
        )?;

        resources.textures = textures;
        resources.bind_groups = bind_groups;
        resources.uniforms.resize(width, height);
        resources.needs_clear = true;
        self.config.surface_size = (width, height);

        tracing::debug!(width, height, "resized accumulation targets");
        Ok(())
    }

    /// Rebuilds the display pipeline for a new shader or surface format and
    /// restarts accumulation.
    pub fn rebuild_pipeline(
        &mut self,
        program: &ShaderProgram,
        target_format: wgpu::TextureFormat,
    ) -> Result<(), RendererError> {
        let Some(resources) = self.resources.as_mut() else {
            return self.initialize(program, target_format);
        };

        let pipeline =
            DisplayPipeline::build(&self.backend, program, target_format, self.config.variant)?;
        let bind_groups = BindGroupRotator::build(
            &self.backend,
            &pipeline.layout,
            &resources.uniform_buffer,
            resources.textures.as_ref(),
        )?;

        resources.pipeline = pipeline;
        resources.bind_groups = bind_groups;
        resources.uniforms.reset();
        resources.needs_clear = true;
        Ok(())
    }

    /// Restarts accumulation at the current size without reallocating.
    pub fn reset_accumulation(&mut self) {
        if let Some(resources) = self.resources.as_mut() {
            resources.uniforms.reset();
            resources.needs_clear = true;
            tracing::debug!("accumulation reset");
        }
    }

    /// Frames rendered in the current accumulation run.
    pub fn frame_index(&self) -> u32 {
        self.resources
            .as_ref()
            .map(|resources| resources.uniforms.frames())
            .unwrap_or(0)
    }

    /// Uniform snapshot the next frame will upload.
    pub fn uniform_state(&self) -> Option<UniformState> {
        self.resources
            .as_ref()
            .map(|resources| resources.uniforms.current())
    }

    /// Size of the current accumulation textures, if any.
    pub fn accumulation_size(&self) -> Option<(u32, u32)> {
        self.resources
            .as_ref()
            .and_then(|resources| resources.textures.as_ref())
            .map(AccumulationTextureSet::size)
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
