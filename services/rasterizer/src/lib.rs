//! Ookla speedtest tile rasterizer service.
//!
//! Reads Parquet tile files, rasterizes the configured attribute columns
//! onto a quadkey grid and writes one multi-band GeoTIFF (plus a JSON
//! sidecar) per input.

pub mod cli;
pub mod config;
pub mod config_loader;
pub mod pipeline;

pub use cli::{Cli, LogFormat};
pub use config::{InputConfig, Overrides, ServiceConfig};
pub use config_loader::{load_config, parse_config};
pub use pipeline::{rasterize_file, run, Failure, RunSummary};
