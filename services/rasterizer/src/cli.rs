//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use grid_raster::{BandSpec, BigTiffMode, BoundsSource, Compression};

use crate::config::Overrides;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}

/// Rasterize quadkey-indexed speedtest tiles into GeoTIFF.
#[derive(Parser, Debug, Clone)]
#[command(name = "rasterize", version)]
#[command(about = "Rasterize Ookla speedtest tiles into GeoTIFF")]
pub struct Cli {
    /// Parquet file, or a directory searched for *.parquet
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output .tif file, or a directory for directory input
    #[arg(short, long)]
    pub output: PathBuf,

    /// YAML configuration file
    #[arg(short, long, env = "RASTERIZE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output zoom level
    #[arg(short, long)]
    pub zoom: Option<u8>,

    /// Band as COLUMN[:DTYPE], repeatable; replaces the configured bands
    #[arg(long = "band", value_name = "COLUMN[:DTYPE]")]
    pub bands: Vec<BandSpec>,

    /// full, data, or left,bottom,right,top
    #[arg(long)]
    pub bounds: Option<BoundsSource>,

    /// none or deflate
    #[arg(long)]
    pub compression: Option<Compression>,

    /// auto, always or never
    #[arg(long)]
    pub bigtiff: Option<BigTiffMode>,

    /// Read only the first N rows of each input
    #[arg(long)]
    pub limit: Option<usize>,

    /// Quadkey column name
    #[arg(long)]
    pub quadkey_column: Option<String>,

    /// Fold quadkeys from other zoom levels into the grid instead of skipping them
    #[arg(long)]
    pub allow_zoom_mismatch: bool,

    /// Decode quadkeys in parallel
    #[arg(long)]
    pub parallel_decode: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            zoom_level: self.zoom,
            bands: self.bands.clone(),
            bounds: self.bounds,
            compression: self.compression,
            bigtiff: self.bigtiff,
            limit: self.limit,
            quadkey_column: self.quadkey_column.clone(),
            allow_zoom_mismatch: self.allow_zoom_mismatch,
            parallel_decode: self.parallel_decode,
        }
    }
}
