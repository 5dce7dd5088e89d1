//! In-memory [`GpuBackend`] that logs every call, for orchestration tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::error::RendererError;

use super::backend::{
    AccumulationDescriptor, BindingResources, DisplayPass, DisplayPipelineDescriptor, GpuBackend,
};
use super::program::ShaderProgram;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BufferHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TextureHandle {
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ViewHandle {
    pub texture: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordedBindGroup {
    pub id: u32,
    pub history: Option<u32>,
    pub target: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedSubmit {
    pub target: u32,
    pub clear: bool,
    pub pipeline: u32,
    pub bind_group: RecordedBindGroup,
    pub vertex_count: u32,
    /// Uniform buffer contents at the moment of submission.
    pub uniforms: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateBuffer { id: u32, size: u64 },
    CreateTexture { id: u32, descriptor: AccumulationDescriptor },
    CreateView { texture: u32 },
    CompileShader { label: String },
    CreateLayout { id: u32, entries: usize },
    CreateBindGroup(RecordedBindGroup),
    CreatePipeline { id: u32, format: wgpu::TextureFormat },
    WriteUniforms { buffer: u32, bytes: Vec<u8> },
    Submit(RecordedSubmit),
}

pub(crate) struct RecordingBackend {
    calls: RefCell<Vec<Call>>,
    next_id: Cell<u32>,
    buffers: RefCell<HashMap<u32, Vec<u8>>>,
    max_dimension: u32,
    fail_textures: Cell<bool>,
    failing_submissions: RefCell<Vec<usize>>,
    submissions: Cell<usize>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::with_max_dimension(8192)
    }

    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            buffers: RefCell::new(HashMap::new()),
            max_dimension,
            fail_textures: Cell::new(false),
            failing_submissions: RefCell::new(Vec::new()),
            submissions: Cell::new(0),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn submits(&self) -> Vec<RecordedSubmit> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Submit(submit) => Some(submit.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn created_textures(&self) -> Vec<(u32, AccumulationDescriptor)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::CreateTexture { id, descriptor } => Some((*id, *descriptor)),
                _ => None,
            })
            .collect()
    }

    /// Raw contents of a uniform buffer.
    pub fn buffer_contents(&self, buffer: &BufferHandle) -> Vec<u8> {
        self.buffers
            .borrow()
            .get(&buffer.0)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_texture_allocation(&self, fail: bool) {
        self.fail_textures.set(fail);
    }

    /// Makes the `ordinal`-th submission attempt (1-based) fail.
    pub fn fail_submission(&self, ordinal: usize) {
        self.failing_submissions.borrow_mut().push(ordinal);
    }

    /// A stand-in for a surface view handed to `render_frame`.
    pub fn surface_view(&self) -> ViewHandle {
        ViewHandle { texture: 0 }
    }

    fn next_id(&self) -> u32 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl GpuBackend for RecordingBackend {
    type Buffer = BufferHandle;
    type Texture = TextureHandle;
    type TextureView = ViewHandle;
    type ShaderModule = u32;
    type BindGroupLayout = u32;
    type BindGroup = RecordedBindGroup;
    type Pipeline = u32;

    fn max_texture_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn create_uniform_buffer(
        &self,
        _label: &'static str,
        size: u64,
    ) -> Result<BufferHandle, RendererError> {
        let id = self.next_id();
        self.buffers
            .borrow_mut()
            .insert(id, vec![0; size as usize]);
        self.record(Call::CreateBuffer { id, size });
        Ok(BufferHandle(id))
    }

    fn create_accumulation_texture(
        &self,
        label: &'static str,
        descriptor: &AccumulationDescriptor,
    ) -> Result<TextureHandle, RendererError> {
        if self.fail_textures.get() {
            return Err(RendererError::exhausted(label, "simulated out of memory"));
        }
        let id = self.next_id();
        self.record(Call::CreateTexture {
            id,
            descriptor: *descriptor,
        });
        Ok(TextureHandle {
            id,
            width: descriptor.width,
            height: descriptor.height,
        })
    }

    fn create_texture_view(&self, texture: &TextureHandle) -> ViewHandle {
        self.record(Call::CreateView {
            texture: texture.id,
        });
        ViewHandle {
            texture: texture.id,
        }
    }

    fn compile_shader(&self, program: &ShaderProgram) -> Result<u32, RendererError> {
        self.record(Call::CompileShader {
            label: program.label().to_string(),
        });
        Ok(self.next_id())
    }

    fn create_bind_group_layout(
        &self,
        _label: &'static str,
        entries: &[wgpu::BindGroupLayoutEntry],
    ) -> Result<u32, RendererError> {
        let id = self.next_id();
        self.record(Call::CreateLayout {
            id,
            entries: entries.len(),
        });
        Ok(id)
    }

    fn create_bind_group(
        &self,
        _label: &'static str,
        _layout: &u32,
        resources: &BindingResources<'_, Self>,
    ) -> Result<RecordedBindGroup, RendererError> {
        let group = RecordedBindGroup {
            id: self.next_id(),
            history: resources.history.map(|view| view.texture),
            target: resources.target.map(|view| view.texture),
        };
        self.record(Call::CreateBindGroup(group));
        Ok(group)
    }

    fn create_display_pipeline(
        &self,
        _module: &u32,
        _layout: &u32,
        descriptor: &DisplayPipelineDescriptor<'_>,
    ) -> Result<u32, RendererError> {
        let id = self.next_id();
        self.record(Call::CreatePipeline {
            id,
            format: descriptor.target_format,
        });
        Ok(id)
    }

    fn write_uniforms(&self, buffer: &BufferHandle, bytes: &[u8]) {
        if let Some(contents) = self.buffers.borrow_mut().get_mut(&buffer.0) {
            contents[..bytes.len()].copy_from_slice(bytes);
        }
        self.record(Call::WriteUniforms {
            buffer: buffer.0,
            bytes: bytes.to_vec(),
        });
    }

    fn submit_display_pass(&self, pass: DisplayPass<'_, Self>) -> Result<(), RendererError> {
        let ordinal = self.submissions.get() + 1;
        self.submissions.set(ordinal);
        if self.failing_submissions.borrow().contains(&ordinal) {
            return Err(RendererError::DeviceOperationFailed(format!(
                "simulated failure on submission {ordinal}"
            )));
        }

        // The recording backend only knows one uniform buffer per renderer.
        let uniforms = self
            .buffers
            .borrow()
            .values()
            .next()
            .cloned()
            .unwrap_or_default();
        self.record(Call::Submit(RecordedSubmit {
            target: pass.target.texture,
            clear: matches!(pass.load, wgpu::LoadOp::Clear(_)),
            pipeline: *pass.pipeline,
            bind_group: *pass.bind_group,
            vertex_count: pass.vertex_count,
            uniforms,
        }));
        Ok(())
    }
}
