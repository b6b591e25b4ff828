//! End-to-end runs: Parquet in, GeoTIFF and JSON sidecar out.

use std::fs;

use grid_raster::{BandSpec, NumericType, RasterMetadata};
use rasterizer::{parse_config, rasterize_file, run, Overrides, ServiceConfig};
use test_utils::{speed_records, tile_records, write_parquet_fixture, TiffInspector, OOKLA_COLUMNS};

fn speed_config(zoom: u8) -> ServiceConfig {
    ServiceConfig::default().with_overrides(&Overrides {
        zoom_level: Some(zoom),
        bands: vec![BandSpec::new("speed", NumericType::UInt16)],
        ..Overrides::default()
    })
}

#[test]
fn test_single_file_writes_raster_and_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tiles.parquet");
    let output = dir.path().join("tiles.tif");
    write_parquet_fixture(&input, &speed_records(4, &[(0, 0, 100.0), (5, 5, 200.0), (15, 15, 300.0)]))
        .unwrap();

    let report = rasterize_file(&speed_config(4), &input, &output).unwrap();
    assert_eq!((report.width, report.height), (16, 16));
    assert_eq!(report.bands[0].stats.written, 3);

    let raster = TiffInspector::open(&output);
    let cells = raster.band_u16(0);
    // Row 0 of the file is the northern edge.
    assert_eq!(cells[15 * 16], 100);
    assert_eq!(cells[10 * 16 + 5], 200);
    assert_eq!(cells[15], 300);
    assert_eq!(cells.iter().filter(|&&v| v == 0).count(), 253);

    let sidecar = fs::read_to_string(RasterMetadata::sidecar_path(&output)).unwrap();
    let metadata: RasterMetadata = serde_json::from_str(&sidecar).unwrap();
    assert_eq!(metadata.width, 16);
    assert_eq!(metadata.bands[0].name, "speed");
    assert_eq!(metadata.nodata, Some(0.0));
}

#[test]
fn test_ookla_bands_from_yaml_config() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("q1.parquet");
    let output = dir.path().join("q1.tif");
    write_parquet_fixture(&input, &tile_records(5, 60, 4)).unwrap();

    let config = parse_config("raster:\n  zoom_level: 5\n  compression: none\n").unwrap();
    let report = rasterize_file(&config, &input, &output).unwrap();

    let names: Vec<&str> = report.bands.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, OOKLA_COLUMNS.to_vec());
    assert_eq!(report.dtype, NumericType::UInt32);

    let raster = TiffInspector::open(&output);
    assert_eq!(raster.band_count(), 5);
    assert_eq!(raster.tag_u64(259), vec![1]);
}

#[test]
fn test_directory_run_isolates_failures() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let out_dir = output.path().join("rasters");

    write_parquet_fixture(&input.path().join("good.parquet"), &speed_records(3, &[(1, 2, 9.0)])).unwrap();
    // Parquet without the configured column.
    write_parquet_fixture(
        &input.path().join("other.parquet"),
        &tile_records(3, 5, 1),
    )
    .unwrap();

    let summary = run(&speed_config(3), input.path(), &out_dir).unwrap();
    assert_eq!(summary.total(), 2);
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.failures.len(), 1);
    assert!(!summary.is_success());
    assert!(summary.failures[0].input.ends_with("other.parquet"));
    assert!(format!("{:#}", summary.failures[0].error).contains("speed"));

    assert!(out_dir.join("good.tif").exists());
    assert!(out_dir.join("good.tif.json").exists());
    assert!(!out_dir.join("other.tif").exists());
}

#[test]
fn test_data_derived_bounds_crop_the_grid() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tiles.parquet");
    let output = dir.path().join("crop.tif");
    write_parquet_fixture(&input, &speed_records(4, &[(4, 6, 1.0), (9, 7, 2.0)])).unwrap();

    let config = ServiceConfig::default().with_overrides(&Overrides {
        zoom_level: Some(4),
        bands: vec![BandSpec::new("speed", NumericType::UInt16)],
        bounds: Some(grid_raster::BoundsSource::DataDerived),
        ..Overrides::default()
    });
    let report = rasterize_file(&config, &input, &output).unwrap();
    assert_eq!((report.width, report.height), (6, 2));
}

#[test]
fn test_missing_input_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = run(&speed_config(4), &dir.path().join("absent"), &dir.path().join("out"));
    assert!(result.is_err());
}
