//! Asynchronous device error reporting.
//!
//! Errors raised by the device after a call has already returned (validation
//! failures resolved late, device loss, frames rejected at submission) are not
//! thrown back into the render loop. They are handed to a [`DiagnosticSink`]
//! supplied by the caller when the backend is built.

use crossbeam_channel::Sender;

use crate::error::RendererError;

/// Category of a reported device event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Validation,
    OutOfMemory,
    Internal,
    /// A frame was dropped because its submission failed.
    FrameLost,
    DeviceLost,
}

/// A single event delivered through the diagnostic channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDiagnostic {
    pub kind: DiagnosticKind,
    /// Frame whose submission failed, when the event belongs to one.
    pub frame_index: Option<u32>,
    pub message: String,
}

impl DeviceDiagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            frame_index: None,
            message: message.into(),
        }
    }

    pub(crate) fn frame_lost(frame_index: u32, error: &RendererError) -> Self {
        Self {
            kind: DiagnosticKind::FrameLost,
            frame_index: Some(frame_index),
            message: error.to_string(),
        }
    }

    pub(crate) fn from_wgpu(error: &wgpu::Error) -> Self {
        let kind = match error {
            wgpu::Error::OutOfMemory { .. } => DiagnosticKind::OutOfMemory,
            wgpu::Error::Validation { .. } => DiagnosticKind::Validation,
            _ => DiagnosticKind::Internal,
        };
        Self::new(kind, error.to_string())
    }
}

/// Receiver for device events. Implementations must tolerate being called
/// from whichever thread the device reports on.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: DeviceDiagnostic);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: DeviceDiagnostic) {
        tracing::error!(
            kind = ?diagnostic.kind,
            frame = ?diagnostic.frame_index,
            "{}",
            diagnostic.message
        );
    }
}

/// Forwards events into a channel so the render loop can drain them between
/// frames.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<DeviceDiagnostic>,
}

impl ChannelSink {
    pub fn new(sender: Sender<DeviceDiagnostic>) -> Self {
        Self { sender }
    }
}

impl DiagnosticSink for ChannelSink {
    fn report(&self, diagnostic: DeviceDiagnostic) {
        if let Err(err) = self.sender.send(diagnostic) {
            // Receiver gone; keep the event visible in the log instead.
            TracingSink.report(err.into_inner());
        }
    }
}
