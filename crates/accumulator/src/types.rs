use crate::gpu::UniformLayout;

/// Which display program family the renderer drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayVariant {
    /// Ping-pong accumulation: the display pass reads the previous running
    /// average and writes the next one while presenting it.
    #[default]
    Accumulate,
    /// Plain display pass bound to the viewport uniforms only.
    Direct,
}

impl DisplayVariant {
    pub fn accumulates(self) -> bool {
        matches!(self, Self::Accumulate)
    }

    pub fn uniform_layout(self) -> UniformLayout {
        match self {
            Self::Accumulate => UniformLayout::Frame,
            Self::Direct => UniformLayout::Viewport,
        }
    }
}

/// Adapter selection hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

/// Presentation pacing requested for the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VsyncMode {
    /// Prefer `Fifo` for tear-free presentation.
    #[default]
    Enabled,
    /// Prefer `Immediate`, then `Mailbox`, for the lowest latency.
    Disabled,
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Initial output size in physical pixels.
    pub surface_size: (u32, u32),
    /// Program family and binding layout.
    pub variant: DisplayVariant,
    /// Color the target is cleared to at the start of an accumulation run.
    pub clear_color: wgpu::Color,
    pub power: GpuPowerPreference,
    pub vsync: VsyncMode,
    /// Frames the surface may queue ahead (clamped to 1-3).
    pub frame_latency: u32,
}

impl Default for RendererConfig {
    /// Provides a 720p accumulating configuration.
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            variant: DisplayVariant::default(),
            clear_color: wgpu::Color::BLACK,
            power: GpuPowerPreference::default(),
            vsync: VsyncMode::default(),
            frame_latency: 2,
        }
    }
}
