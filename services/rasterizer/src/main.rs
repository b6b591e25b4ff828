//! `rasterize` command-line entry point.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use rasterizer::{load_config, run, Cli, LogFormat, ServiceConfig};

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    let config = config.with_env_overrides().with_overrides(&cli.overrides());
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    info!(
        zoom_level = config.raster.zoom_level,
        bands = ?config.raster.columns(),
        compression = %config.raster.compression,
        "Starting rasterizer"
    );

    let summary = run(&config, &cli.input, &cli.output)?;
    if !summary.is_success() {
        for failure in &summary.failures {
            error!(input = %failure.input.display(), error = %format!("{:#}", failure.error), "Failed");
        }
        anyhow::bail!(
            "{} of {} inputs failed",
            summary.failures.len(),
            summary.total()
        );
    }
    Ok(())
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .json()
            .init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .init(),
    }
}
