use std::fs;
use std::path::{Path, PathBuf};

use accumulator::{DisplayVariant, GpuPowerPreference, RendererConfig, VsyncMode};
use serde::{Deserialize, Serialize};

use crate::cli::Args;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Accumulate,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    Low,
    #[default]
    High,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSection {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            title: "pathtracer".into(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderSection {
    pub mode: RenderMode,
    /// WGSL file replacing the built-in program for `mode`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shader: Option<PathBuf>,
    /// Linear RGBA in `0.0..=1.0`.
    pub clear_color: [f64; 4],
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            mode: RenderMode::default(),
            shader: None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpuSection {
    pub power: PowerSetting,
    pub vsync: bool,
    pub frame_latency: u32,
}

impl Default for GpuSection {
    fn default() -> Self {
        Self {
            power: PowerSetting::default(),
            vsync: true,
            frame_latency: 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub window: WindowSection,
    pub render: RenderSection,
    pub gpu: GpuSection,
}

impl AppConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: AppConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Loads `--config` when given, otherwise the defaults, then applies the
    /// remaining flags on top and validates the result.
    pub fn resolve(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config.as_deref() {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some((width, height)) = args.size {
            self.window.width = width;
            self.window.height = height;
        }
        if let Some(mode) = args.mode {
            self.render.mode = mode;
        }
        if let Some(shader) = &args.shader {
            self.render.shader = Some(shader.clone());
        }
        if let Some(power) = args.power {
            self.gpu.power = power;
        }
        if args.no_vsync {
            self.gpu.vsync = false;
        }
        if let Some(latency) = args.frame_latency {
            self.gpu.frame_latency = latency;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} must be greater than zero",
                self.window.width, self.window.height
            )));
        }

        if !(1..=3).contains(&self.gpu.frame_latency) {
            return Err(ConfigError::Invalid(format!(
                "gpu.frame_latency {} out of range; expected 1-3",
                self.gpu.frame_latency
            )));
        }

        if let Some(component) = self
            .render
            .clear_color
            .iter()
            .find(|component| !(0.0..=1.0).contains(*component))
        {
            return Err(ConfigError::Invalid(format!(
                "render.clear_color component {component} must be within 0.0-1.0"
            )));
        }

        if let Some(shader) = &self.render.shader {
            if shader.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "render.shader must not be empty".into(),
                ));
            }
        }

        Ok(())
    }

    pub fn to_renderer_config(&self) -> RendererConfig {
        let [r, g, b, a] = self.render.clear_color;
        RendererConfig {
            surface_size: (self.window.width, self.window.height),
            variant: match self.render.mode {
                RenderMode::Accumulate => DisplayVariant::Accumulate,
                RenderMode::Direct => DisplayVariant::Direct,
            },
            clear_color: wgpu::Color { r, g, b, a },
            power: match self.gpu.power {
                PowerSetting::Low => GpuPowerPreference::Low,
                PowerSetting::High => GpuPowerPreference::High,
            },
            vsync: if self.gpu.vsync {
                VsyncMode::Enabled
            } else {
                VsyncMode::Disabled
            },
            frame_latency: self.gpu.frame_latency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[window]
title = "cornell"
width = 800
height = 600

[render]
mode = "direct"
clear_color = [0.1, 0.2, 0.3, 1.0]

[gpu]
power = "low"
vsync = false
frame_latency = 1
"#;

    #[test]
    fn parses_sample_config() {
        let config = AppConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.window.title, "cornell");
        assert_eq!((config.window.width, config.window.height), (800, 600));
        assert_eq!(config.render.mode, RenderMode::Direct);
        assert_eq!(config.gpu.power, PowerSetting::Low);
        assert!(!config.gpu.vsync);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = AppConfig::from_toml_str("[window]\nwidth = 320\n").unwrap();
        assert_eq!(config.window.width, 320);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.render, RenderSection::default());
        assert_eq!(config.gpu, GpuSection::default());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = AppConfig::from_toml_str("[gpu]\nframe_latency = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AppConfig::from_toml_str("[render]\nclear_color = [0.0, 2.0, 0.0, 1.0]\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = AppConfig::from_toml_str("[window]\nheight = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = AppConfig::from_toml_str("[render]\nsamples = 4\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn cli_flags_override_file_values() {
        let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
        let args = Args {
            size: Some((1024, 768)),
            mode: Some(RenderMode::Accumulate),
            frame_latency: Some(3),
            ..Args::default()
        };
        config.apply_args(&args);
        config.validate().unwrap();

        assert_eq!((config.window.width, config.window.height), (1024, 768));
        assert_eq!(config.render.mode, RenderMode::Accumulate);
        assert_eq!(config.gpu.frame_latency, 3);
        assert!(!config.gpu.vsync);
        assert_eq!(config.window.title, "cornell");
    }

    #[test]
    fn maps_onto_renderer_config() {
        let renderer = AppConfig::from_toml_str(SAMPLE)
            .unwrap()
            .to_renderer_config();
        assert_eq!(renderer.surface_size, (800, 600));
        assert_eq!(renderer.variant, DisplayVariant::Direct);
        assert_eq!(renderer.power, GpuPowerPreference::Low);
        assert_eq!(renderer.vsync, VsyncMode::Disabled);
        assert_eq!(renderer.frame_latency, 1);
        assert_eq!(renderer.clear_color.b, 0.3);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = AppConfig::load(Path::new("/nonexistent/pathtracer.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
