//! Per-file rasterization pipeline.
//!
//! read -> resolve profile -> build bands one at a time -> stream to GeoTIFF
//! -> JSON sidecar. Each input is independent; a failure is recorded and the
//! remaining inputs still run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use grid_raster::{BandBuilder, BandStacker, GeoTiffWriter, RasterMetadata, RasterProfile, WriteReport};
use ingestion::{discover_inputs, ParquetTileReader, TileReader};
use tracing::{error, info};

use crate::config::ServiceConfig;

/// One failed input.
#[derive(Debug)]
pub struct Failure {
    pub input: PathBuf,
    pub error: anyhow::Error,
}

/// Outcome of a run over one or more inputs.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<WriteReport>,
    pub failures: Vec<Failure>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.reports.len() + self.failures.len()
    }
}

/// Rasterize every input under `input` into `output`.
///
/// Errors only when the inputs cannot be resolved at all; per-file failures
/// are collected in the summary.
pub fn run(config: &ServiceConfig, input: &Path, output: &Path) -> Result<RunSummary> {
    let inputs = discover_inputs(input)
        .with_context(|| format!("Failed to resolve inputs from {:?}", input))?;
    let targets = plan_outputs(input, &inputs, output)?;
    info!(inputs = inputs.len(), output = %output.display(), "Starting rasterization");

    let mut summary = RunSummary::default();
    for (source, target) in inputs.iter().zip(targets) {
        match rasterize_file(config, source, &target) {
            Ok(report) => summary.reports.push(report),
            Err(e) => {
                error!(input = %source.display(), error = %format!("{e:#}"), "Input failed");
                summary.failures.push(Failure {
                    input: source.clone(),
                    error: e,
                });
            }
        }
    }

    info!(
        succeeded = summary.reports.len(),
        failed = summary.failures.len(),
        "Rasterization finished"
    );
    Ok(summary)
}

/// Rasterize one Parquet file to `output` and write its JSON sidecar.
pub fn rasterize_file(config: &ServiceConfig, input: &Path, output: &Path) -> Result<WriteReport> {
    let start = Instant::now();

    let mut reader = ParquetTileReader::new(input)
        .with_quadkey_column(config.input.quadkey_column.clone())
        .with_limit(config.input.limit);
    let records = reader
        .read(&config.raster.columns())
        .with_context(|| format!("Failed to read {}", reader.source()))?;

    let (profile, layout) = RasterProfile::for_config(&config.raster, &records)
        .context("Failed to resolve raster profile")?;

    let builder = BandBuilder::new(&records, layout)
        .zoom_mismatch(config.raster.zoom_mismatch)
        .parallel_decode(config.raster.parallel_decode);
    let stacker = BandStacker::new(builder, config.raster.bands.clone());
    let bands = stacker.lazy().context("Failed to prepare bands")?;

    let report = GeoTiffWriter::new(profile)
        .write_streaming(bands, output)
        .with_context(|| format!("Failed to write {:?}", output))?;

    let sidecar = RasterMetadata::sidecar_path(output);
    RasterMetadata::new(&profile, &report)
        .write_json(&sidecar)
        .with_context(|| format!("Failed to write metadata {:?}", sidecar))?;

    info!(
        input = %input.display(),
        output = %output.display(),
        records = records.len(),
        bytes = report.bytes_written,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Rasterized input"
    );
    Ok(report)
}

/// Output path for each input.
///
/// A directory input writes `<output>/<stem>.tif` per file. A single file
/// writes to `output`, or into it when `output` is an existing directory.
pub fn plan_outputs(input: &Path, inputs: &[PathBuf], output: &Path) -> Result<Vec<PathBuf>> {
    if input.is_dir() || output.is_dir() {
        fs::create_dir_all(output)
            .with_context(|| format!("Failed to create output directory {:?}", output))?;
        return Ok(inputs.iter().map(|p| output.join(tif_name(p))).collect());
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {:?}", parent))?;
    }
    Ok(vec![output.to_path_buf()])
}

fn tif_name(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    PathBuf::from(format!("{}.tif", stem.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tif_name() {
        assert_eq!(tif_name(Path::new("/d/2020-q1.parquet")), PathBuf::from("2020-q1.tif"));
        assert_eq!(tif_name(Path::new("tiles")), PathBuf::from("tiles.tif"));
        assert_eq!(tif_name(Path::new("perf.2020.parquet")), PathBuf::from("perf.2020.tif"));
    }

    #[test]
    fn test_plan_outputs_for_directory() {
        let input = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("rasters");
        let inputs = vec![input.path().join("a.parquet"), input.path().join("b.parquet")];

        let planned = plan_outputs(input.path(), &inputs, &target).unwrap();
        assert!(target.is_dir());
        assert_eq!(planned, vec![target.join("a.tif"), target.join("b.tif")]);
    }

    #[test]
    fn test_plan_outputs_for_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tiles.parquet");
        std::fs::write(&input, b"x").unwrap();

        let target = dir.path().join("nested/out.tif");
        let planned = plan_outputs(&input, &[input.clone()], &target).unwrap();
        assert_eq!(planned, vec![target.clone()]);
        assert!(target.parent().unwrap().is_dir());

        let planned = plan_outputs(&input, &[input.clone()], dir.path()).unwrap();
        assert_eq!(planned, vec![dir.path().join("tiles.tif")]);
    }
}
