use std::fs;
use std::path::Path;

use crate::error::RendererError;
use crate::types::DisplayVariant;

const ACCUMULATE_WGSL: &str = include_str!("../../shaders/accumulate.wgsl");
const DIRECT_WGSL: &str = include_str!("../../shaders/direct.wgsl");

pub const DEFAULT_VERTEX_ENTRY: &str = "display_vs";
pub const DEFAULT_FRAGMENT_ENTRY: &str = "display_fs";

/// WGSL source for the display pass together with its entry points.
///
/// The vertex entry must emit the full-screen quad from `vertex_index` alone;
/// the fragment entry must consume the binding layout of the chosen
/// [`DisplayVariant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    label: String,
    source: String,
    vertex_entry: String,
    fragment_entry: String,
}

impl ShaderProgram {
    pub fn from_wgsl(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
            vertex_entry: DEFAULT_VERTEX_ENTRY.to_string(),
            fragment_entry: DEFAULT_FRAGMENT_ENTRY.to_string(),
        }
    }

    /// The program shipped with the crate for `variant`.
    pub fn builtin(variant: DisplayVariant) -> Self {
        match variant {
            DisplayVariant::Accumulate => Self::from_wgsl("builtin accumulate", ACCUMULATE_WGSL),
            DisplayVariant::Direct => Self::from_wgsl("builtin direct", DIRECT_WGSL),
        }
    }

    pub fn load(path: &Path) -> Result<Self, RendererError> {
        let source = fs::read_to_string(path).map_err(|err| {
            RendererError::InitializationFailure(format!(
                "failed to read shader at {}: {err}",
                path.display()
            ))
        })?;
        Ok(Self::from_wgsl(path.display().to_string(), source))
    }

    pub fn with_entry_points(
        mut self,
        vertex_entry: impl Into<String>,
        fragment_entry: impl Into<String>,
    ) -> Self {
        self.vertex_entry = vertex_entry.into();
        self.fragment_entry = fragment_entry.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn vertex_entry(&self) -> &str {
        &self.vertex_entry
    }

    pub fn fragment_entry(&self) -> &str {
        &self.fragment_entry
    }
}
