//! Raster profile: everything the writer needs besides the cells.

use serde::{Deserialize, Serialize};
use tile_common::{BoundingBox, CrsCode, TileTable};
use tracing::info;

use crate::config::{BigTiffMode, BoundsSource, Compression, RasterConfig};
use crate::error::{RasterError, Result};
use crate::layout::GridLayout;
use crate::types::NumericType;

/// Uncompressed payload size above which `BigTiffMode::Auto` switches to
/// 64-bit offsets. Kept below 4 GiB to leave room for tags and strip tables.
pub const BIGTIFF_THRESHOLD_BYTES: u64 = 4_000_000_000;

/// Affine map from pixel (col, row) to projected coordinates.
///
/// `x = a * col + b * row + c`, `y = d * col + e * row + f`; with north-up
/// bounds `e` is negative and `(c, f)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    /// Map `bounds` onto a `width` x `height` pixel grid, top-left origin.
    pub fn from_bounds(bounds: &BoundingBox, width: u32, height: u32) -> Self {
        Self {
            a: bounds.width() / f64::from(width),
            b: 0.0,
            c: bounds.min_x,
            d: 0.0,
            e: -bounds.height() / f64::from(height),
            f: bounds.max_y,
        }
    }

    /// Projected coordinates of the top-left corner of pixel `(col, row)`.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Pixel size as positive (x, y) resolution.
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.a.abs(), self.e.abs())
    }

    /// Coefficients in GDAL order: (c, a, b, f, d, e).
    pub fn to_gdal(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }
}

/// Output file description.
///
/// A value type: `with_*` methods return a modified copy and leave the
/// original untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterProfile {
    width: u32,
    height: u32,
    band_count: usize,
    dtype: NumericType,
    crs: CrsCode,
    bounds: BoundingBox,
    transform: GeoTransform,
    compression: Compression,
    bigtiff: BigTiffMode,
}

/// Profile for a `grid_size` x `grid_size` grid spanning `bounds`.
pub fn make_profile(
    bounds: (f64, f64, f64, f64),
    grid_size: u32,
    band_count: usize,
    dtype: NumericType,
) -> Result<RasterProfile> {
    RasterProfile::new(BoundingBox::from(bounds), grid_size, grid_size, band_count, dtype)
}

impl RasterProfile {
    pub fn new(
        bounds: BoundingBox,
        width: u32,
        height: u32,
        band_count: usize,
        dtype: NumericType,
    ) -> Result<Self> {
        if !bounds.is_valid() {
            return Err(RasterError::config(format!(
                "bounds have no area: {:?}",
                bounds
            )));
        }
        if width == 0 || height == 0 {
            return Err(RasterError::config(format!(
                "raster must have at least one pixel, got {}x{}",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            band_count,
            dtype,
            crs: CrsCode::Epsg3857,
            bounds,
            transform: GeoTransform::from_bounds(&bounds, width, height),
            compression: Compression::default(),
            bigtiff: BigTiffMode::default(),
        })
    }

    /// Profile for `config`, with bounds resolved from its bounds source.
    ///
    /// Returns the layout the bands must be built on alongside the profile.
    pub fn for_config(config: &RasterConfig, records: &TileTable) -> Result<(Self, GridLayout)> {
        config.validate().map_err(RasterError::ConfigError)?;

        let (layout, world) = match config.bounds {
            BoundsSource::Fixed { bbox } => (GridLayout::full(config.zoom_level), bbox),
            BoundsSource::DataDerived => (
                GridLayout::data_derived(config.zoom_level, records, config.zoom_mismatch)?,
                CrsCode::Epsg3857.valid_bounds(),
            ),
        };

        let dtype = NumericType::widest(config.bands.iter().map(|b| b.dtype))
            .ok_or_else(|| RasterError::config("no bands configured"))?;
        let bounds = layout.bounds_within(&world);
        let profile = Self::new(
            bounds,
            layout.extent.width,
            layout.extent.height,
            config.bands.len(),
            dtype,
        )?
        .with_compression(config.compression)
        .with_bigtiff(config.bigtiff);

        info!(
            width = profile.width,
            height = profile.height,
            bands = profile.band_count,
            dtype = %profile.dtype,
            bounds = ?profile.bounds.as_tuple(),
            bigtiff = profile.use_bigtiff(),
            "Resolved raster profile"
        );
        Ok((profile, layout))
    }

    pub fn with_band_count(&self, band_count: usize) -> Self {
        Self {
            band_count,
            ..*self
        }
    }

    pub fn with_dtype(&self, dtype: NumericType) -> Self {
        Self { dtype, ..*self }
    }

    pub fn with_crs(&self, crs: CrsCode) -> Self {
        Self { crs, ..*self }
    }

    pub fn with_compression(&self, compression: Compression) -> Self {
        Self {
            compression,
            ..*self
        }
    }

    pub fn with_bigtiff(&self, bigtiff: BigTiffMode) -> Self {
        Self { bigtiff, ..*self }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn dtype(&self) -> NumericType {
        self.dtype
    }

    pub fn crs(&self) -> CrsCode {
        self.crs
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn bigtiff(&self) -> BigTiffMode {
        self.bigtiff
    }

    pub fn nodata(&self) -> f64 {
        self.dtype.nodata()
    }

    /// Uncompressed size of all band samples.
    pub fn payload_bytes(&self) -> u64 {
        u64::from(self.width)
            * u64::from(self.height)
            * self.band_count as u64
            * self.dtype.size_bytes() as u64
    }

    /// Whether the file needs 64-bit offsets.
    pub fn use_bigtiff(&self) -> bool {
        match self.bigtiff {
            BigTiffMode::Always => true,
            BigTiffMode::Never => false,
            BigTiffMode::Auto => self.payload_bytes() > BIGTIFF_THRESHOLD_BYTES,
        }
    }
}
