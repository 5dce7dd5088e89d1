/// Failures surfaced by the renderer.
///
/// Construction-time problems (`InitializationFailure`, `ResourceExhausted`)
/// are returned synchronously and leave the renderer unusable for the current
/// configuration. `DeviceOperationFailed` only costs the frame that hit it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RendererError {
    #[error("initialization failed: {0}")]
    InitializationFailure(String),
    #[error("failed to allocate {resource}: {reason}")]
    ResourceExhausted {
        resource: &'static str,
        reason: String,
    },
    #[error("device operation failed: {0}")]
    DeviceOperationFailed(String),
}

impl RendererError {
    pub(crate) fn exhausted(resource: &'static str, reason: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            resource,
            reason: reason.into(),
        }
    }

    /// Returns true when the render loop can keep calling `render_frame`.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DeviceOperationFailed(_))
    }
}
