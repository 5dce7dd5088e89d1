//! The seam between frame orchestration and the graphics API.
//!
//! Everything above this trait decides *what* to allocate and submit; the
//! implementation decides *how*. [`WgpuBackend`] is the production
//! implementation. Descriptors stay in `wgpu` vocabulary so the orchestration
//! code reads the same with either side of the seam.

use std::sync::Arc;

use crate::diagnostics::{DeviceDiagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::RendererError;

use super::program::ShaderProgram;

/// Shape of one accumulation texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulationDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

/// Resources bound into one display bind group. `history` and `target` are
/// present only for accumulating layouts and are always distinct textures.
pub struct BindingResources<'a, B: GpuBackend + ?Sized> {
    pub uniforms: &'a B::Buffer,
    pub history: Option<&'a B::TextureView>,
    pub target: Option<&'a B::TextureView>,
}

/// Static description of the display pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPipelineDescriptor<'a> {
    pub label: &'a str,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    pub target_format: wgpu::TextureFormat,
}

/// One frame's worth of commands: a single render pass drawing the
/// full-screen quad.
pub struct DisplayPass<'a, B: GpuBackend + ?Sized> {
    pub label: &'a str,
    pub target: &'a B::TextureView,
    pub load: wgpu::LoadOp<wgpu::Color>,
    pub pipeline: &'a B::Pipeline,
    pub bind_group: &'a B::BindGroup,
    pub vertex_count: u32,
}

pub trait GpuBackend {
    type Buffer;
    type Texture;
    type TextureView;
    type ShaderModule;
    type BindGroupLayout;
    type BindGroup;
    type Pipeline;

    /// Largest width or height a 2D texture may have on this device.
    fn max_texture_dimension(&self) -> u32;

    fn create_uniform_buffer(
        &self,
        label: &'static str,
        size: u64,
    ) -> Result<Self::Buffer, RendererError>;

    fn create_accumulation_texture(
        &self,
        label: &'static str,
        descriptor: &AccumulationDescriptor,
    ) -> Result<Self::Texture, RendererError>;

    fn create_texture_view(&self, texture: &Self::Texture) -> Self::TextureView;

    fn compile_shader(&self, program: &ShaderProgram) -> Result<Self::ShaderModule, RendererError>;

    fn create_bind_group_layout(
        &self,
        label: &'static str,
        entries: &[wgpu::BindGroupLayoutEntry],
    ) -> Result<Self::BindGroupLayout, RendererError>;

    fn create_bind_group(
        &self,
        label: &'static str,
        layout: &Self::BindGroupLayout,
        resources: &BindingResources<'_, Self>,
    ) -> Result<Self::BindGroup, RendererError>;

    fn create_display_pipeline(
        &self,
        module: &Self::ShaderModule,
        layout: &Self::BindGroupLayout,
        descriptor: &DisplayPipelineDescriptor<'_>,
    ) -> Result<Self::Pipeline, RendererError>;

    /// Queues a uniform upload ordered before any later submission.
    fn write_uniforms(&self, buffer: &Self::Buffer, bytes: &[u8]);

    /// Records and submits one display pass.
    fn submit_display_pass(&self, pass: DisplayPass<'_, Self>) -> Result<(), RendererError>;
}

/// [`GpuBackend`] over a `wgpu` device and queue.
///
/// Holds clones of the handles owned by [`RenderContext`](super::RenderContext);
/// the surface and instance stay with the context.
#[derive(Clone)]
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuBackend {
    /// Wraps the handles and routes device-level errors that escape every
    /// error scope, plus device loss, to `diagnostics`.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let uncaptured = Arc::clone(&diagnostics);
        device.on_uncaptured_error(Box::new(move |error| {
            uncaptured.report(DeviceDiagnostic::from_wgpu(&error));
        }));
        device.set_device_lost_callback(move |reason, message| {
            diagnostics.report(DeviceDiagnostic::new(
                DiagnosticKind::DeviceLost,
                format!("device lost ({reason:?}): {message}"),
            ));
        });
        Self { device, queue }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Runs `create` inside out-of-memory and validation scopes and maps any
    /// captured error through `on_error`.
    fn scoped<T>(
        &self,
        create: impl FnOnce(&wgpu::Device) -> T,
        on_error: impl FnOnce(wgpu::Error) -> RendererError,
    ) -> Result<T, RendererError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        match out_of_memory.or(validation) {
            Some(error) => Err(on_error(error)),
            None => Ok(value),
        }
    }

    fn allocate<T>(
        &self,
        resource: &'static str,
        create: impl FnOnce(&wgpu::Device) -> T,
    ) -> Result<T, RendererError> {
        self.scoped(create, |error| {
            RendererError::exhausted(resource, error.to_string())
        })
    }
}

impl GpuBackend for WgpuBackend {
    type Buffer = wgpu::Buffer;
    type Texture = wgpu::Texture;
    type TextureView = wgpu::TextureView;
    type ShaderModule = wgpu::ShaderModule;
    type BindGroupLayout = wgpu::BindGroupLayout;
    type BindGroup = wgpu::BindGroup;
    type Pipeline = wgpu::RenderPipeline;

    fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn create_uniform_buffer(
        &self,
        label: &'static str,
        size: u64,
    ) -> Result<wgpu::Buffer, RendererError> {
        self.allocate(label, |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })
    }

    fn create_accumulation_texture(
        &self,
        label: &'static str,
        descriptor: &AccumulationDescriptor,
    ) -> Result<wgpu::Texture, RendererError> {
        self.allocate(label, |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: descriptor.width,
                    height: descriptor.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: descriptor.format,
                usage: descriptor.usage,
                view_formats: &[],
            })
        })
    }

    fn create_texture_view(&self, texture: &wgpu::Texture) -> wgpu::TextureView {
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn compile_shader(&self, program: &ShaderProgram) -> Result<wgpu::ShaderModule, RendererError> {
        self.scoped(
            |device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(program.label()),
                    source: wgpu::ShaderSource::Wgsl(program.source().into()),
                })
            },
            |error| {
                RendererError::InitializationFailure(format!(
                    "shader `{}` was rejected: {error}",
                    program.label()
                ))
            },
        )
    }

    fn create_bind_group_layout(
        &self,
        label: &'static str,
        entries: &[wgpu::BindGroupLayoutEntry],
    ) -> Result<wgpu::BindGroupLayout, RendererError> {
        self.allocate(label, |device| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries,
            })
        })
    }

    fn create_bind_group(
        &self,
        label: &'static str,
        layout: &wgpu::BindGroupLayout,
        resources: &BindingResources<'_, Self>,
    ) -> Result<wgpu::BindGroup, RendererError> {
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: super::pipeline::UNIFORM_BINDING,
            resource: resources.uniforms.as_entire_binding(),
        }];
        if let Some(history) = resources.history {
            entries.push(wgpu::BindGroupEntry {
                binding: super::pipeline::HISTORY_BINDING,
                resource: wgpu::BindingResource::TextureView(history),
            });
        }
        if let Some(target) = resources.target {
            entries.push(wgpu::BindGroupEntry {
                binding: super::pipeline::TARGET_BINDING,
                resource: wgpu::BindingResource::TextureView(target),
            });
        }
        self.allocate(label, |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &entries,
            })
        })
    }

    fn create_display_pipeline(
        &self,
        module: &wgpu::ShaderModule,
        layout: &wgpu::BindGroupLayout,
        descriptor: &DisplayPipelineDescriptor<'_>,
    ) -> Result<wgpu::RenderPipeline, RendererError> {
        self.scoped(
            |device| {
                let pipeline_layout =
                    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("display pipeline layout"),
                        bind_group_layouts: &[layout],
                        push_constant_ranges: &[],
                    });
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(descriptor.label),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module,
                        entry_point: Some(descriptor.vertex_entry),
                        buffers: &[],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        strip_index_format: None,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: None,
                        polygon_mode: wgpu::PolygonMode::Fill,
                        unclipped_depth: false,
                        conservative: false,
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    fragment: Some(wgpu::FragmentState {
                        module,
                        entry_point: Some(descriptor.fragment_entry),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: descriptor.target_format,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }),
                    multiview: None,
                    cache: None,
                })
            },
            |error| match error {
                wgpu::Error::OutOfMemory { .. } => {
                    RendererError::exhausted("display pipeline", error.to_string())
                }
                other => RendererError::InitializationFailure(format!(
                    "display pipeline `{}` is invalid: {other}",
                    descriptor.label
                )),
            },
        )
    }

    fn write_uniforms(&self, buffer: &wgpu::Buffer, bytes: &[u8]) {
        self.queue.write_buffer(buffer, 0, bytes);
    }

    fn submit_display_pass(&self, pass: DisplayPass<'_, Self>) -> Result<(), RendererError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(pass.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: pass.target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: pass.load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(pass.pipeline);
            render_pass.set_bind_group(0, pass.bind_group, &[]);
            render_pass.draw(0..pass.vertex_count, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(RendererError::DeviceOperationFailed(error.to_string())),
            None => Ok(()),
        }
    }
}
