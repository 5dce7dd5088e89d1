mod cli;
mod config;
mod window;

use anyhow::{Context, Result};
use config::AppConfig;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = cli::parse();
    initialise_tracing();

    let config = AppConfig::resolve(&args).context("failed to load configuration")?;
    if args.print_config {
        let rendered =
            toml::to_string_pretty(&config).context("failed to serialise configuration")?;
        print!("{rendered}");
        return Ok(());
    }

    tracing::debug!(?config, "resolved configuration");
    window::run(config)
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
