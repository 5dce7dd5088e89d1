use std::path::PathBuf;

use clap::Parser;

use crate::config::{PowerSetting, RenderMode};

#[derive(Parser, Debug, Default)]
#[command(
    name = "pathtracer",
    author,
    version,
    about = "Progressive path tracer preview",
    arg_required_else_help = false
)]
pub struct Args {
    /// TOML configuration file; CLI flags override its values.
    #[arg(long, value_name = "FILE", env = "PATHTRACER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Display program family: `accumulate` or `direct`.
    #[arg(long, value_name = "MODE", value_parser = parse_render_mode)]
    pub mode: Option<RenderMode>,

    /// WGSL file to use instead of the built-in program.
    #[arg(long, value_name = "PATH")]
    pub shader: Option<PathBuf>,

    /// Adapter preference: `low` or `high`.
    #[arg(long, value_name = "POWER", value_parser = parse_power)]
    pub power: Option<PowerSetting>,

    /// Present without waiting for vertical sync.
    #[arg(long)]
    pub no_vsync: bool,

    /// Frames the surface may queue ahead (1-3).
    #[arg(long, value_name = "FRAMES")]
    pub frame_latency: Option<u32>,

    /// Print the merged configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32), String> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1920x1080".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".into());
    }

    Ok((width, height))
}

pub fn parse_render_mode(value: &str) -> Result<RenderMode, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("render mode must not be empty".to_string());
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "accumulate" | "progressive" => Ok(RenderMode::Accumulate),
        "direct" | "display" => Ok(RenderMode::Direct),
        other => Err(format!(
            "unknown render mode '{other}'; expected accumulate or direct"
        )),
    }
}

pub fn parse_power(value: &str) -> Result<PowerSetting, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" | "integrated" => Ok(PowerSetting::Low),
        "high" | "high-performance" | "discrete" => Ok(PowerSetting::High),
        other => Err(format!("unknown power preference '{other}'; expected low or high")),
    }
}
