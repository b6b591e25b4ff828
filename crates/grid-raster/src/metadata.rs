//! JSON sidecar describing a written raster.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tile_common::BoundingBox;

use crate::profile::RasterProfile;
use crate::types::{BandStats, NumericType};
use crate::writer::WriteReport;

/// Contents of `<output>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMetadata {
    pub raster: PathBuf,
    pub crs: String,
    pub width: u32,
    pub height: u32,
    pub dtype: NumericType,
    /// `null` in JSON when the no-data value is NaN.
    pub nodata: Option<f64>,
    pub bounds: BoundingBox,
    /// GDAL order: (origin x, pixel width, row rotation, origin y, column rotation, pixel height).
    pub geotransform: [f64; 6],
    pub compression: String,
    pub bigtiff: bool,
    pub bytes_written: u64,
    pub bands: Vec<BandMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandMetadata {
    pub index: usize,
    pub name: String,
    pub source_dtype: NumericType,
    pub stats: BandStats,
}

impl RasterMetadata {
    pub fn new(profile: &RasterProfile, report: &WriteReport) -> Self {
        let nodata = profile.nodata();
        Self {
            raster: report.path.clone(),
            crs: profile.crs().to_string(),
            width: report.width,
            height: report.height,
            dtype: report.dtype,
            nodata: (!nodata.is_nan()).then_some(nodata),
            bounds: *profile.bounds(),
            geotransform: profile.transform().to_gdal(),
            compression: report.compression.to_string(),
            bigtiff: report.bigtiff,
            bytes_written: report.bytes_written,
            bands: report
                .bands
                .iter()
                .map(|b| BandMetadata {
                    index: b.index,
                    name: b.name.clone(),
                    source_dtype: b.source_dtype,
                    stats: b.stats.clone(),
                })
                .collect(),
        }
    }

    /// Sidecar path for a raster: the raster path with `.json` appended.
    pub fn sidecar_path(raster: &Path) -> PathBuf {
        let mut name = raster.as_os_str().to_os_string();
        name.push(".json");
        PathBuf::from(name)
    }

    /// Write pretty-printed JSON to `path`.
    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Compression;
    use crate::profile::make_profile;
    use crate::writer::BandSummary;

    fn report() -> WriteReport {
        WriteReport {
            path: PathBuf::from("/tmp/out.tif"),
            width: 16,
            height: 16,
            dtype: NumericType::UInt32,
            compression: Compression::Deflate,
            bigtiff: false,
            bytes_written: 1234,
            bands: vec![BandSummary {
                index: 1,
                name: "avg_d_kbps".into(),
                source_dtype: NumericType::UInt16,
                stats: BandStats {
                    records: 3,
                    written: 3,
                    ..Default::default()
                },
            }],
        }
    }

    #[test]
    fn test_metadata_from_report() {
        let profile = make_profile((0.0, 0.0, 160.0, 160.0), 16, 1, NumericType::UInt32).unwrap();
        let meta = RasterMetadata::new(&profile, &report());

        assert_eq!(meta.crs, "EPSG:3857");
        assert_eq!(meta.nodata, Some(0.0));
        assert_eq!(meta.geotransform, [0.0, 10.0, 0.0, 160.0, 0.0, -10.0]);
        assert_eq!(meta.compression, "deflate");
        assert_eq!(meta.bands[0].name, "avg_d_kbps");
        assert_eq!(meta.bands[0].source_dtype, NumericType::UInt16);
    }

    #[test]
    fn test_float_nodata_serializes_as_null() {
        let profile = make_profile((0.0, 0.0, 1.0, 1.0), 16, 1, NumericType::Float32).unwrap();
        let meta = RasterMetadata::new(&profile, &report());
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json["nodata"].is_null());
        assert_eq!(json["bands"][0]["stats"]["written"], 3);
    }

    #[test]
    fn test_sidecar_path_and_write() {
        assert_eq!(
            RasterMetadata::sidecar_path(Path::new("/data/tiles.tif")),
            PathBuf::from("/data/tiles.tif.json")
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        let profile = make_profile((0.0, 0.0, 1.0, 1.0), 16, 1, NumericType::UInt32).unwrap();
        let meta = RasterMetadata::new(&profile, &report());
        meta.write_json(&path).unwrap();

        let read: RasterMetadata =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read, meta);
    }
}
