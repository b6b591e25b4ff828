//! Quadkey-to-grid rasterization.
//!
//! Turns quadkey-indexed tile records into georeferenced multi-band rasters:
//!
//! - **Band builder**: scatters one attribute column onto a grid indexed by
//!   decoded quadkey, last write wins
//! - **Band stacker**: one band per column, in request order, built eagerly
//!   or one at a time for streaming
//! - **Profile builder**: affine transform, CRS and storage type for the file
//! - **Writer**: flips to north-up and streams bands into a GeoTIFF
//!
//! # Architecture
//!
//! ```text
//! TileTable (quadkey + attribute columns)
//!      │
//!      ├─► RasterProfile::for_config ─► (RasterProfile, GridLayout)
//!      │
//!      ▼
//! BandStacker::lazy ─► BandBuilder::build (per column)
//!      │
//!      ▼
//! GeoTiffWriter::write_streaming ─► <output>.tif
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_raster::{build_band, make_profile, write, NumericType};
//!
//! let grid = build_band(&records, "avg_d_kbps", 1 << 16, NumericType::UInt32)?;
//! let profile = make_profile(bounds, 1 << 16, 1, NumericType::UInt32)?;
//! write(grid, &profile, Path::new("speeds.tif"))?;
//! ```

pub mod band;
pub mod config;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod profile;
pub mod stack;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use band::{build_band, BandBuilder};
pub use config::{
    BandSpec, BigTiffMode, BoundsSource, Compression, RasterConfig, ZoomMismatchPolicy,
};
pub use error::{RasterError, Result};
pub use layout::{GridExtent, GridLayout};
pub use metadata::{BandMetadata, RasterMetadata};
pub use profile::{make_profile, GeoTransform, RasterProfile};
pub use stack::{stack_bands, BandStacker, LazyBands};
pub use types::{Band, BandStack, BandStats, Grid, GridData, NumericType, Sample};
pub use writer::{write, BandSummary, GeoTiffWriter, RasterInput, WriteError, WriteReport};
