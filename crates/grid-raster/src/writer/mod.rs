//! Raster writer: flips bands to north-up and streams them into a GeoTIFF.
//!
//! Band grids keep row 0 at the southern edge; the file wants row 0 at the
//! top, so every band is written bottom row first.

mod geotiff_writer;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::config::Compression;
use crate::error::RasterError;
use crate::profile::RasterProfile;
use crate::types::{BandStack, BandStats, Grid, NumericType};

pub use geotiff_writer::GeoTiffWriter;

/// Errors from producing the output file.
///
/// A failure after the file was created leaves it partially written.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF encoding failed: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Data does not match the profile and cannot be reconciled.
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    /// A band would lose information in the file's storage type.
    #[error("band '{band}' is {band_dtype}, wider than the file type {file_dtype}")]
    Narrowing {
        band: String,
        band_dtype: NumericType,
        file_dtype: NumericType,
    },

    /// A band could not be built while streaming.
    #[error("failed to build band: {0}")]
    Band(#[source] Box<RasterError>),
}

impl WriteError {
    pub fn shape_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// What the writer accepts: a bare 2D grid or a band stack.
#[derive(Debug, Clone)]
pub enum RasterInput {
    Grid(Grid),
    Stack(BandStack),
}

impl RasterInput {
    /// Normalize to a stack; a bare grid becomes a single band.
    pub fn into_stack(self) -> BandStack {
        match self {
            Self::Grid(grid) => BandStack::from_grid("band_1", grid),
            Self::Stack(stack) => stack,
        }
    }
}

impl From<Grid> for RasterInput {
    fn from(grid: Grid) -> Self {
        Self::Grid(grid)
    }
}

impl From<BandStack> for RasterInput {
    fn from(stack: BandStack) -> Self {
        Self::Stack(stack)
    }
}

/// One written band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandSummary {
    /// 1-based band index in the file.
    pub index: usize,
    pub name: String,
    /// Storage type the band was built with, before widening.
    pub source_dtype: NumericType,
    pub stats: BandStats,
}

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteReport {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub dtype: NumericType,
    pub compression: Compression,
    pub bigtiff: bool,
    pub bytes_written: u64,
    pub bands: Vec<BandSummary>,
}

/// Write a grid or stack to `path` as described by `profile`.
pub fn write(
    input: impl Into<RasterInput>,
    profile: &RasterProfile,
    path: &Path,
) -> Result<WriteReport, WriteError> {
    GeoTiffWriter::new(*profile).write(input, path)
}
