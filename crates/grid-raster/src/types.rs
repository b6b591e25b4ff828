//! Core types for band rasterization.

use std::fmt;
use std::str::FromStr;

use num_traits::NumCast;
use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};

/// Storage type of a band grid.
///
/// Variants are ordered by width so the widest of several types is their max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericType {
    UInt16,
    UInt32,
    Float32,
}

impl NumericType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::Float32 => "float32",
        }
    }

    /// Bytes per sample.
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::UInt16 => 2,
            Self::UInt32 | Self::Float32 => 4,
        }
    }

    /// Value of the TIFF `BitsPerSample` tag.
    pub fn bits_per_sample(&self) -> u16 {
        (self.size_bytes() * 8) as u16
    }

    /// Value of the TIFF `SampleFormat` tag (1 = unsigned int, 3 = IEEE float).
    pub fn sample_format(&self) -> u16 {
        match self {
            Self::UInt16 | Self::UInt32 => 1,
            Self::Float32 => 3,
        }
    }

    /// No-data sentinel: 0 for integer types, NaN for floats.
    pub fn nodata(&self) -> f64 {
        match self {
            Self::UInt16 | Self::UInt32 => 0.0,
            Self::Float32 => f64::NAN,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32)
    }

    /// Widest of the given types, or `None` for an empty iterator.
    pub fn widest(types: impl IntoIterator<Item = NumericType>) -> Option<NumericType> {
        types.into_iter().max()
    }
}

impl FromStr for NumericType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uint16" | "u16" => Ok(Self::UInt16),
            "uint32" | "u32" => Ok(Self::UInt32),
            "float32" | "f32" => Ok(Self::Float32),
            other => Err(format!(
                "unsupported dtype '{}' (expected uint16, uint32 or float32)",
                other
            )),
        }
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A cell value type a band grid can hold.
pub trait Sample: bytemuck::Pod + NumCast + Send + Sync + 'static {
    const TYPE: NumericType;
    const NODATA: Self;

    fn is_nodata(&self) -> bool;

    /// Cast an attribute value into this type.
    ///
    /// Integers truncate toward zero; NaN and out-of-range values give `None`.
    fn cast_from(value: f64) -> Option<Self> {
        <Self as NumCast>::from(value)
    }
}

impl Sample for u16 {
    const TYPE: NumericType = NumericType::UInt16;
    const NODATA: Self = 0;

    fn is_nodata(&self) -> bool {
        *self == 0
    }
}

impl Sample for u32 {
    const TYPE: NumericType = NumericType::UInt32;
    const NODATA: Self = 0;

    fn is_nodata(&self) -> bool {
        *self == 0
    }
}

impl Sample for f32 {
    const TYPE: NumericType = NumericType::Float32;
    const NODATA: Self = f32::NAN;

    fn is_nodata(&self) -> bool {
        self.is_nan()
    }

    fn cast_from(value: f64) -> Option<Self> {
        // Values beyond f32 range saturate to infinity rather than fail.
        Some(value as f32)
    }
}

/// Typed cell storage of a grid, row-major with row 0 southernmost.
#[derive(Debug, Clone)]
pub enum GridData {
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    Float32(Vec<f32>),
}

impl GridData {
    fn filled(dtype: NumericType, len: usize) -> Self {
        match dtype {
            NumericType::UInt16 => Self::UInt16(vec![u16::NODATA; len]),
            NumericType::UInt32 => Self::UInt32(vec![u32::NODATA; len]),
            NumericType::Float32 => Self::Float32(vec![f32::NODATA; len]),
        }
    }

    pub fn dtype(&self) -> NumericType {
        match self {
            Self::UInt16(_) => NumericType::UInt16,
            Self::UInt32(_) => NumericType::UInt32,
            Self::Float32(_) => NumericType::Float32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::UInt16(v) => v.len(),
            Self::UInt32(v) => v.len(),
            Self::Float32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell value widened to f64.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            Self::UInt16(v) => v.get(index).map(|&x| x.into()),
            Self::UInt32(v) => v.get(index).map(|&x| x.into()),
            Self::Float32(v) => v.get(index).map(|&x| x.into()),
        }
    }

    /// Number of cells not holding the no-data sentinel.
    pub fn count_valid(&self) -> usize {
        match self {
            Self::UInt16(v) => v.iter().filter(|x| !x.is_nodata()).count(),
            Self::UInt32(v) => v.iter().filter(|x| !x.is_nodata()).count(),
            Self::Float32(v) => v.iter().filter(|x| !x.is_nodata()).count(),
        }
    }
}

/// Cell-wise equality where the float no-data NaN matches itself.
impl PartialEq for GridData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::UInt16(a), Self::UInt16(b)) => a == b,
            (Self::UInt32(a), Self::UInt32(b)) => a == b,
            (Self::Float32(a), Self::Float32(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            _ => false,
        }
    }
}

/// A single-band 2D grid.
///
/// Cell `(col, row)` lives at index `row * width + col`; row 0 is the
/// southernmost row of the extent.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    data: GridData,
}

impl Grid {
    /// Create a grid with every cell set to the no-data sentinel of `dtype`.
    pub fn new(width: usize, height: usize, dtype: NumericType) -> Self {
        Self {
            width,
            height,
            data: GridData::filled(dtype, width * height),
        }
    }

    /// Wrap existing cell data.
    pub fn from_data(width: usize, height: usize, data: GridData) -> Result<Self> {
        if data.len() != width * height {
            return Err(RasterError::shape_mismatch(
                format!("{} cells ({}x{})", width * height, width, height),
                format!("{} cells", data.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn dtype(&self) -> NumericType {
        self.data.dtype()
    }

    pub fn data(&self) -> &GridData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut GridData {
        &mut self.data
    }

    pub fn into_data(self) -> GridData {
        self.data
    }

    /// Value at `(col, row)` widened to f64.
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col)
    }
}

/// Per-band record accounting from one build pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandStats {
    /// Records visited.
    pub records: usize,
    /// Values cast and written to a cell.
    pub written: usize,
    /// Writes onto a cell that already held data (last write wins).
    ///
    /// In integer bands a stored `0` is indistinguishable from no-data, so a
    /// collision with an earlier real zero is not counted.
    pub overwrites: usize,
    /// Records without a value for this column; the cell gets the sentinel.
    pub missing_values: usize,
    /// Records skipped because the quadkey did not decode.
    pub invalid_quadkeys: usize,
    /// Records skipped because their quadkey zoom differs from the grid zoom.
    pub zoom_rejected: usize,
    /// Records at another zoom that were wrapped onto the grid.
    pub zoom_wrapped: usize,
    /// Records skipped because the value does not fit the storage type.
    pub cast_failures: usize,
    /// Records decoding to a cell outside the output extent.
    pub outside_extent: usize,
}

impl BandStats {
    /// Records that left no trace in the grid.
    pub fn skipped(&self) -> usize {
        self.invalid_quadkeys + self.zoom_rejected + self.cast_failures + self.outside_extent
    }
}

/// A named band grid plus the accounting from building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub name: String,
    pub grid: Grid,
    pub stats: BandStats,
}

impl Band {
    pub fn new(name: impl Into<String>, grid: Grid) -> Self {
        Self {
            name: name.into(),
            grid,
            stats: BandStats::default(),
        }
    }

    pub fn with_stats(mut self, stats: BandStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn dtype(&self) -> NumericType {
        self.grid.dtype()
    }
}

/// Ordered bands of identical dimensions.
///
/// Band `i` is the i-th requested column; the order is what the file layout
/// and the band descriptions follow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandStack {
    bands: Vec<Band>,
}

impl BandStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stack, checking every band against the first one's dimensions.
    pub fn from_bands(bands: Vec<Band>) -> Result<Self> {
        let mut stack = Self::with_capacity(bands.len());
        for band in bands {
            stack.push(band)?;
        }
        Ok(stack)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bands: Vec::with_capacity(capacity),
        }
    }

    /// Promote a single 2D grid to a one-band stack.
    pub fn from_grid(name: impl Into<String>, grid: Grid) -> Self {
        Self {
            bands: vec![Band::new(name, grid)],
        }
    }

    /// Append a band; its dimensions must match the stack.
    pub fn push(&mut self, band: Band) -> Result<()> {
        if let Some((width, height)) = self.dims() {
            if band.grid.dims() != (width, height) {
                return Err(RasterError::shape_mismatch(
                    format!("{}x{}", width, height),
                    format!(
                        "{}x{} for band '{}'",
                        band.grid.width(),
                        band.grid.height(),
                        band.name
                    ),
                ));
            }
        }
        self.bands.push(band);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// `(width, height)` shared by every band.
    pub fn dims(&self) -> Option<(usize, usize)> {
        self.bands.first().map(|b| b.grid.dims())
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band(&self, index: usize) -> Option<&Band> {
        self.bands.get(index)
    }

    pub fn into_bands(self) -> Vec<Band> {
        self.bands
    }

    pub fn names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    /// Widest storage type across the bands.
    pub fn widest_dtype(&self) -> Option<NumericType> {
        NumericType::widest(self.bands.iter().map(Band::dtype))
    }
}

impl IntoIterator for BandStack {
    type Item = Band;
    type IntoIter = std::vec::IntoIter<Band>;

    fn into_iter(self) -> Self::IntoIter {
        self.bands.into_iter()
    }
}
