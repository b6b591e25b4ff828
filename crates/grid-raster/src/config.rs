//! Configuration for a rasterization run.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tile_common::BoundingBox;

use crate::types::NumericType;

/// Deepest zoom accepted for output grids.
///
/// Zoom 16 already means 65536 x 65536 cells per band.
pub const MAX_ZOOM_LEVEL: u8 = 24;

/// Configuration for one rasterization run.
///
/// Passed explicitly into every component; nothing reads global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Output zoom level; the grid side is `2^zoom_level`.
    pub zoom_level: u8,

    /// Attribute columns to rasterize, in band order.
    pub bands: Vec<BandSpec>,

    /// Where the georeferenced extent comes from.
    pub bounds: BoundsSource,

    /// Strip compression for the output file.
    pub compression: Compression,

    /// Large-file (BigTIFF) addressing.
    pub bigtiff: BigTiffMode,

    /// What to do with quadkeys at a zoom other than `zoom_level`.
    pub zoom_mismatch: ZoomMismatchPolicy,

    /// Decode quadkeys on the rayon pool before the (sequential) write pass.
    pub parallel_decode: bool,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            zoom_level: 16,
            bands: Vec::new(),
            bounds: BoundsSource::default(),
            compression: Compression::Deflate,
            bigtiff: BigTiffMode::Auto,
            zoom_mismatch: ZoomMismatchPolicy::Reject,
            parallel_decode: false,
        }
    }
}

impl RasterConfig {
    /// The five Ookla performance-tile bands.
    ///
    /// Throughput columns need 32 bits; latency and counts fit in 16.
    pub fn ookla_default() -> Self {
        Self {
            bands: vec![
                BandSpec::new("avg_d_kbps", NumericType::UInt32),
                BandSpec::new("avg_u_kbps", NumericType::UInt32),
                BandSpec::new("avg_lat_ms", NumericType::UInt16),
                BandSpec::new("tests", NumericType::UInt16),
                BandSpec::new("devices", NumericType::UInt16),
            ],
            ..Self::default()
        }
    }

    /// Apply overrides from environment variables.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("RASTER_ZOOM_LEVEL") {
            if let Ok(zoom) = val.parse() {
                self.zoom_level = zoom;
            }
        }

        if let Ok(val) = std::env::var("RASTER_COMPRESSION") {
            if let Ok(compression) = val.parse() {
                self.compression = compression;
            }
        }

        if let Ok(val) = std::env::var("RASTER_BIGTIFF") {
            if let Ok(mode) = val.parse() {
                self.bigtiff = mode;
            }
        }

        if let Ok(val) = std::env::var("RASTER_PARALLEL_DECODE") {
            self.parallel_decode = val.to_lowercase() == "true" || val == "1";
        }

        self
    }

    /// Load the Ookla defaults, then apply environment overrides.
    pub fn from_env() -> Self {
        Self::ookla_default().with_env_overrides()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.zoom_level > MAX_ZOOM_LEVEL {
            return Err(format!(
                "zoom_level must be <= {}, got {}",
                MAX_ZOOM_LEVEL, self.zoom_level
            ));
        }

        if self.bands.is_empty() {
            return Err("at least one band must be configured".to_string());
        }

        for (i, band) in self.bands.iter().enumerate() {
            if band.column.trim().is_empty() {
                return Err(format!("band {} has an empty column name", i + 1));
            }
            if self.bands[..i].iter().any(|b| b.column == band.column) {
                return Err(format!("column '{}' is configured twice", band.column));
            }
        }

        if let BoundsSource::Fixed { bbox } = &self.bounds {
            if !bbox.is_valid() {
                return Err(format!("fixed bounds have no area: {:?}", bbox));
            }
        }

        Ok(())
    }

    /// Grid side length for the configured zoom.
    pub fn grid_size(&self) -> u32 {
        tile_common::grid_size_for_zoom(self.zoom_level)
    }

    /// Configured column names, in band order.
    pub fn columns(&self) -> Vec<String> {
        self.bands.iter().map(|b| b.column.clone()).collect()
    }
}

/// One output band: a source column and its in-memory storage type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandSpec {
    pub column: String,
    pub dtype: NumericType,
}

impl BandSpec {
    pub fn new(column: impl Into<String>, dtype: NumericType) -> Self {
        Self {
            column: column.into(),
            dtype,
        }
    }
}

impl FromStr for BandSpec {
    type Err = String;

    /// Parse "column" or "column:dtype"; the dtype defaults to float32.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, dtype) = match s.rsplit_once(':') {
            Some((column, dtype)) => (column, dtype.parse()?),
            None => (s, NumericType::Float32),
        };
        if column.trim().is_empty() {
            return Err(format!("band spec '{}' has no column name", s));
        }
        Ok(Self::new(column.trim(), dtype))
    }
}

/// Source of the real-world extent the grid is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BoundsSource {
    /// The full addressable tile space mapped onto fixed bounds.
    Fixed { bbox: BoundingBox },
    /// The tightest tile window covering the records (exploratory runs).
    DataDerived,
}

impl Default for BoundsSource {
    fn default() -> Self {
        Self::Fixed {
            bbox: BoundingBox::web_mercator(),
        }
    }
}

impl FromStr for BoundsSource {
    type Err = String;

    /// Parse "full", "data", or "left,bottom,right,top".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" | "fixed" => Ok(Self::default()),
            "data" | "data_derived" => Ok(Self::DataDerived),
            _ => s
                .parse::<BoundingBox>()
                .map(|bbox| Self::Fixed { bbox })
                .map_err(|e| e.to_string()),
        }
    }
}

/// Strip compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    /// Adobe Deflate (zlib stream).
    #[default]
    Deflate,
}

impl Compression {
    /// Value of the TIFF `Compression` tag.
    pub fn tiff_code(&self) -> u16 {
        match self {
            Self::None => 1,
            Self::Deflate => 8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Deflate => "deflate",
        }
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Self::None),
            "deflate" | "zlib" => Ok(Self::Deflate),
            other => Err(format!("unknown compression '{}'", other)),
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// When to use 64-bit (BigTIFF) offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BigTiffMode {
    /// Only when the uncompressed payload could overflow 32-bit offsets.
    #[default]
    Auto,
    Always,
    Never,
}

impl FromStr for BigTiffMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "if_needed" => Ok(Self::Auto),
            "always" | "yes" | "true" => Ok(Self::Always),
            "never" | "no" | "false" => Ok(Self::Never),
            other => Err(format!("unknown bigtiff mode '{}'", other)),
        }
    }
}

/// Handling of quadkeys whose length differs from the output zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomMismatchPolicy {
    /// Treat the record like an undecodable quadkey.
    #[default]
    Reject,
    /// Reduce tile indices modulo the grid size and keep the record.
    Wrap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RasterConfig::default();
        assert_eq!(config.zoom_level, 16);
        assert_eq!(config.grid_size(), 65536);
        assert_eq!(config.compression, Compression::Deflate);
        assert_eq!(config.bigtiff, BigTiffMode::Auto);
        assert_eq!(config.zoom_mismatch, ZoomMismatchPolicy::Reject);
        assert!(!config.parallel_decode);
        assert_eq!(
            config.bounds,
            BoundsSource::Fixed {
                bbox: BoundingBox::web_mercator()
            }
        );
    }

    #[test]
    fn test_ookla_default_bands() {
        let config = RasterConfig::ookla_default();
        assert_eq!(
            config.columns(),
            vec!["avg_d_kbps", "avg_u_kbps", "avg_lat_ms", "tests", "devices"]
        );
        assert_eq!(config.bands[0].dtype, NumericType::UInt32);
        assert_eq!(config.bands[4].dtype, NumericType::UInt16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RasterConfig::ookla_default();
        config.zoom_level = 25;
        assert!(config.validate().is_err());

        config = RasterConfig::default();
        assert!(config.validate().is_err(), "no bands");

        config = RasterConfig::ookla_default();
        config.bands.push(BandSpec::new("tests", NumericType::UInt32));
        assert!(config.validate().is_err(), "duplicate column");

        config = RasterConfig::ookla_default();
        config.bounds = BoundsSource::Fixed {
            bbox: BoundingBox::new(0.0, 0.0, 0.0, 10.0),
        };
        assert!(config.validate().is_err(), "zero-width bounds");
    }

    #[test]
    fn test_band_spec_from_str() {
        assert_eq!(
            "avg_lat_ms:uint16".parse::<BandSpec>().unwrap(),
            BandSpec::new("avg_lat_ms", NumericType::UInt16)
        );
        assert_eq!(
            "speed".parse::<BandSpec>().unwrap(),
            BandSpec::new("speed", NumericType::Float32)
        );
        assert!("speed:int8".parse::<BandSpec>().is_err());
        assert!(":uint16".parse::<BandSpec>().is_err());
    }

    #[test]
    fn test_bounds_source_from_str() {
        assert_eq!("full".parse::<BoundsSource>().unwrap(), BoundsSource::default());
        assert_eq!(
            "data".parse::<BoundsSource>().unwrap(),
            BoundsSource::DataDerived
        );
        assert_eq!(
            "0,0,100,100".parse::<BoundsSource>().unwrap(),
            BoundsSource::Fixed {
                bbox: BoundingBox::new(0.0, 0.0, 100.0, 100.0)
            }
        );
        assert!("nowhere".parse::<BoundsSource>().is_err());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("NONE".parse::<Compression>().unwrap(), Compression::None);
        assert_eq!("deflate".parse::<Compression>().unwrap(), Compression::Deflate);
        assert!("lzw".parse::<Compression>().is_err());
        assert_eq!("yes".parse::<BigTiffMode>().unwrap(), BigTiffMode::Always);
        assert_eq!("if_needed".parse::<BigTiffMode>().unwrap(), BigTiffMode::Auto);
    }

    #[test]
    fn test_yaml_round_trip_with_defaults() {
        let yaml = r#"
zoom_level: 4
bands:
  - column: speed
    dtype: uint16
bounds:
  mode: data_derived
"#;
        let config: RasterConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.zoom_level, 4);
        assert_eq!(config.bounds, BoundsSource::DataDerived);
        assert_eq!(config.compression, Compression::Deflate);
        assert_eq!(config.bands, vec![BandSpec::new("speed", NumericType::UInt16)]);
    }
}
