//! GPU side of the progressive renderer.
//!
//! - `context` owns the wgpu instance, surface, device and queue, and keeps
//!   the swapchain in step with the window.
//! - `backend` is the seam between frame orchestration and wgpu: the
//!   [`GpuBackend`] trait plus its wgpu implementation.
//! - `uniforms` holds the per-frame uniform snapshot and its byte encoding.
//! - `textures` allocates the two accumulation textures.
//! - `bindings` precomputes one bind group per frame parity and picks the
//!   right one each frame.
//! - `pipeline` and `program` compile the display program and describe its
//!   binding layout.
//! - `frame` glues everything together in [`FrameRenderer`].

mod backend;
mod bindings;
mod context;
mod frame;
mod pipeline;
mod program;
mod textures;
mod uniforms;

#[cfg(test)]
pub(crate) mod recording;

pub use backend::{
    AccumulationDescriptor, BindingResources, DisplayPass, DisplayPipelineDescriptor, GpuBackend,
    WgpuBackend,
};
pub use bindings::{roles, select, BindGroupRotator, TextureRoles};
pub use context::RenderContext;
pub use frame::{FrameRenderer, FrameReport, FrameStats};
pub use pipeline::{
    DisplayPipeline, FULLSCREEN_VERTEX_COUNT, HISTORY_BINDING, TARGET_BINDING, UNIFORM_BINDING,
};
pub use program::{ShaderProgram, DEFAULT_FRAGMENT_ENTRY, DEFAULT_VERTEX_ENTRY};
pub use textures::{AccumulationTextureSet, ACCUMULATION_FORMAT};
pub use uniforms::{UniformLayout, UniformState, FRAME_UNIFORM_SIZE};
