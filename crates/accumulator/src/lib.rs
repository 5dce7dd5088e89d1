//! Frame orchestration for a progressive accumulation renderer.
//!
//! Every frame the renderer uploads a small uniform block, binds the previous
//! running average as history, and draws a full-screen pass that both writes
//! the next average into the second accumulation texture and presents it.
//! The two textures swap roles each frame:
//!
//! ```text
//!   RendererConfig
//!        │
//!        ▼
//!   RenderContext ──▶ WgpuBackend ──▶ FrameRenderer::render_frame()
//!                                          │
//!          UniformTracker::advance() ◀─────┤
//!          BindGroupRotator (parity) ◀─────┤
//!                                          ▼
//!              frame K:   read A ─▶ write B ─▶ surface
//!              frame K+1: read B ─▶ write A ─▶ surface
//! ```
//!
//! GPU work goes through the [`GpuBackend`] trait so the orchestration can be
//! driven without a device. Device errors that surface asynchronously reach
//! the application through a [`DiagnosticSink`] instead of aborting the
//! process.

pub mod diagnostics;
pub mod error;
pub mod gpu;
pub mod types;

pub use diagnostics::{ChannelSink, DeviceDiagnostic, DiagnosticKind, DiagnosticSink, TracingSink};
pub use error::RendererError;
pub use gpu::{
    FrameRenderer, FrameReport, FrameStats, GpuBackend, RenderContext, ShaderProgram,
    UniformLayout, UniformState, WgpuBackend,
};
pub use types::{DisplayVariant, GpuPowerPreference, RendererConfig, VsyncMode};
