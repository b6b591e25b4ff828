//! Rasterizer service configuration.
//!
//! Resolution order: built-in Ookla defaults, then the YAML file, then
//! `RASTER_*` environment variables, then command-line flags.

use serde::{Deserialize, Serialize};

use grid_raster::{
    BandSpec, BigTiffMode, BoundsSource, Compression, RasterConfig, ZoomMismatchPolicy,
};
use ingestion::DEFAULT_QUADKEY_COLUMN;

/// Complete configuration for a `rasterize` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub raster: RasterConfig,
    pub input: InputConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            raster: RasterConfig::ookla_default(),
            input: InputConfig::default(),
        }
    }
}

/// How input files are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Name of the quadkey column.
    pub quadkey_column: String,

    /// Read only the first `limit` rows of each file.
    pub limit: Option<usize>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            quadkey_column: DEFAULT_QUADKEY_COLUMN.to_string(),
            limit: None,
        }
    }
}

/// Values given on the command line. `None` leaves the configured value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub zoom_level: Option<u8>,
    pub bands: Vec<BandSpec>,
    pub bounds: Option<BoundsSource>,
    pub compression: Option<Compression>,
    pub bigtiff: Option<BigTiffMode>,
    pub limit: Option<usize>,
    pub quadkey_column: Option<String>,
    pub allow_zoom_mismatch: bool,
    pub parallel_decode: bool,
}

impl ServiceConfig {
    /// Apply `RASTER_*` environment variables.
    pub fn with_env_overrides(mut self) -> Self {
        self.raster = self.raster.with_env_overrides();
        self
    }

    /// Apply command-line overrides. Any `--band` replaces the configured list.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(zoom) = overrides.zoom_level {
            self.raster.zoom_level = zoom;
        }
        if !overrides.bands.is_empty() {
            self.raster.bands = overrides.bands.clone();
        }
        if let Some(bounds) = overrides.bounds {
            self.raster.bounds = bounds;
        }
        if let Some(compression) = overrides.compression {
            self.raster.compression = compression;
        }
        if let Some(bigtiff) = overrides.bigtiff {
            self.raster.bigtiff = bigtiff;
        }
        if overrides.limit.is_some() {
            self.input.limit = overrides.limit;
        }
        if let Some(column) = &overrides.quadkey_column {
            self.input.quadkey_column = column.clone();
        }
        if overrides.allow_zoom_mismatch {
            self.raster.zoom_mismatch = ZoomMismatchPolicy::Wrap;
        }
        if overrides.parallel_decode {
            self.raster.parallel_decode = true;
        }
        self
    }

    /// A file that configures `raster` without listing bands gets the Ookla bands.
    pub(crate) fn fill_default_bands(mut self) -> Self {
        if self.raster.bands.is_empty() {
            self.raster.bands = RasterConfig::ookla_default().bands;
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        self.raster.validate()?;
        if self.input.quadkey_column.trim().is_empty() {
            return Err("input.quadkey_column cannot be empty".to_string());
        }
        if self.input.limit == Some(0) {
            return Err("input.limit must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_raster::NumericType;

    #[test]
    fn test_default_is_ookla() {
        let config = ServiceConfig::default();
        assert_eq!(config.raster.bands.len(), 5);
        assert_eq!(config.input.quadkey_column, "quadkey");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_replace_only_given_values() {
        let overrides = Overrides {
            zoom_level: Some(10),
            bands: vec![BandSpec::new("avg_d_kbps", NumericType::UInt32)],
            allow_zoom_mismatch: true,
            limit: Some(500),
            ..Overrides::default()
        };
        let config = ServiceConfig::default().with_overrides(&overrides);

        assert_eq!(config.raster.zoom_level, 10);
        assert_eq!(config.raster.columns(), vec!["avg_d_kbps"]);
        assert_eq!(config.raster.zoom_mismatch, ZoomMismatchPolicy::Wrap);
        assert_eq!(config.input.limit, Some(500));
        assert_eq!(config.raster.compression, Compression::Deflate);
        assert!(!config.raster.parallel_decode);
    }

    #[test]
    fn test_zero_limit_is_invalid() {
        let mut config = ServiceConfig::default();
        config.input.limit = Some(0);
        assert!(config.validate().is_err());
    }
}
