//! Streaming GeoTIFF encoder on top of the `tiff` directory API.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use chrono::Utc;
use flate2::write::ZlibEncoder;
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;
use tile_common::CrsCode;
use tracing::{debug, error, info, warn};

use super::{BandSummary, RasterInput, WriteError, WriteReport};
use crate::config::Compression;
use crate::error::Result as RasterResult;
use crate::profile::RasterProfile;
use crate::types::{Band, Grid, GridData, NumericType};

// GeoTIFF tags
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_ASCII_PARAMS: u16 = 34737;

// GDAL private tags
const GDAL_METADATA: u16 = 42112;
const GDAL_NODATA: u16 = 42113;

/// Target uncompressed strip size.
const STRIP_TARGET_BYTES: usize = 1 << 20;

/// Writes band grids as a georeferenced, band-separate (planar) GeoTIFF.
#[derive(Debug, Clone)]
pub struct GeoTiffWriter {
    profile: RasterProfile,
}

impl GeoTiffWriter {
    pub fn new(profile: RasterProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &RasterProfile {
        &self.profile
    }

    /// Write an in-memory grid or stack.
    ///
    /// A band count that differs from the profile is corrected to the data;
    /// dimensions and types are checked before the file is created.
    pub fn write(&self, input: impl Into<RasterInput>, path: &Path) -> Result<WriteReport, WriteError> {
        let result = self.prepare(input.into()).and_then(|(writer, stack)| {
            writer.write_bands(stack.into_bands().into_iter().map(Ok), path)
        });
        if let Err(e) = &result {
            error!(path = %path.display(), error = %e, "Failed to write raster");
        }
        result
    }

    /// Write bands as they are produced, dropping each after its strips are out.
    ///
    /// The iterator must yield exactly `profile.band_count()` bands.
    pub fn write_streaming<I>(&self, bands: I, path: &Path) -> Result<WriteReport, WriteError>
    where
        I: IntoIterator<Item = RasterResult<Band>>,
    {
        let result = self.write_bands(bands, path);
        if let Err(e) = &result {
            error!(path = %path.display(), error = %e, "Failed to write raster");
        }
        result
    }

    /// Encode bands into any seekable sink.
    pub fn write_to<W, I>(&self, bands: I, sink: W) -> Result<Vec<BandSummary>, WriteError>
    where
        W: Write + Seek,
        I: IntoIterator<Item = RasterResult<Band>>,
    {
        if self.profile.band_count() == 0 {
            return Err(WriteError::shape_mismatch("at least one band", "0 bands"));
        }
        if self.profile.use_bigtiff() {
            self.encode(TiffEncoder::new_big(sink)?, bands)
        } else {
            self.encode(TiffEncoder::new(sink)?, bands)
        }
    }

    fn prepare(&self, input: RasterInput) -> Result<(GeoTiffWriter, crate::types::BandStack), WriteError> {
        if let RasterInput::Grid(_) = &input {
            debug!("Promoting 2D grid to a single-band stack");
        }
        let stack = input.into_stack();
        if stack.is_empty() {
            return Err(WriteError::shape_mismatch("at least one band", "0 bands"));
        }

        let mut profile = self.profile;
        if stack.len() != profile.band_count() {
            warn!(
                profile_bands = profile.band_count(),
                data_bands = stack.len(),
                "Band count differs from profile; using the data's band count"
            );
            profile = profile.with_band_count(stack.len());
        }

        let writer = GeoTiffWriter::new(profile);
        for band in stack.bands() {
            writer.check_band(band)?;
        }
        Ok((writer, stack))
    }

    fn check_band(&self, band: &Band) -> Result<(), WriteError> {
        let expected = (self.profile.width() as usize, self.profile.height() as usize);
        if band.grid.dims() != expected {
            return Err(WriteError::shape_mismatch(
                format!("{}x{}", expected.0, expected.1),
                format!(
                    "{}x{} for band '{}'",
                    band.grid.width(),
                    band.grid.height(),
                    band.name
                ),
            ));
        }
        if band.dtype() > self.profile.dtype() {
            return Err(WriteError::Narrowing {
                band: band.name.clone(),
                band_dtype: band.dtype(),
                file_dtype: self.profile.dtype(),
            });
        }
        Ok(())
    }

    fn write_bands<I>(&self, bands: I, path: &Path) -> Result<WriteReport, WriteError>
    where
        I: IntoIterator<Item = RasterResult<Band>>,
    {
        let file = File::create(path)?;
        let mut sink = BufWriter::new(file);
        let summaries = self.write_to(bands, &mut sink)?;
        sink.flush()?;
        let file = sink.into_inner().map_err(|e| e.into_error())?;
        let bytes_written = file.metadata()?.len();

        let report = WriteReport {
            path: path.to_path_buf(),
            width: self.profile.width(),
            height: self.profile.height(),
            dtype: self.profile.dtype(),
            compression: self.profile.compression(),
            bigtiff: self.profile.use_bigtiff(),
            bytes_written,
            bands: summaries,
        };
        info!(
            path = %path.display(),
            width = report.width,
            height = report.height,
            bands = report.bands.len(),
            dtype = %report.dtype,
            bigtiff = report.bigtiff,
            bytes = bytes_written,
            "Wrote raster"
        );
        Ok(report)
    }

    fn encode<W, K, I>(&self, mut encoder: TiffEncoder<W, K>, bands: I) -> Result<Vec<BandSummary>, WriteError>
    where
        W: Write + Seek,
        K: TiffKind,
        I: IntoIterator<Item = RasterResult<Band>>,
    {
        let profile = &self.profile;
        let dtype = profile.dtype();
        let height = profile.height() as usize;
        let row_bytes = profile.width() as usize * dtype.size_bytes();
        let rows_per_strip = (STRIP_TARGET_BYTES / row_bytes.max(1)).clamp(1, height.max(1));

        let mut dir = encoder.new_directory()?;
        let mut offsets: Vec<K::OffsetType> = Vec::new();
        let mut byte_counts: Vec<K::OffsetType> = Vec::new();
        let mut summaries = Vec::with_capacity(profile.band_count());
        let mut raw = Vec::with_capacity(rows_per_strip * row_bytes);

        for band in bands {
            let band = band.map_err(|e| WriteError::Band(Box::new(e)))?;
            if summaries.len() == profile.band_count() {
                return Err(WriteError::shape_mismatch(
                    format!("{} bands", profile.band_count()),
                    format!("extra band '{}'", band.name),
                ));
            }
            self.check_band(&band)?;

            // Output row r is grid row (height - 1 - r).
            for start in (0..height).step_by(rows_per_strip) {
                let end = (start + rows_per_strip).min(height);
                raw.clear();
                for out_row in start..end {
                    append_row(&band.grid, &band.name, height - 1 - out_row, dtype, &mut raw)?;
                }
                let payload = compress(profile.compression(), &raw)?;
                let offset = dir.write_data(payload.as_ref())?;
                offsets.push(K::convert_offset(offset)?);
                byte_counts.push(K::convert_offset(payload.len() as u64)?);
            }

            summaries.push(BandSummary {
                index: summaries.len() + 1,
                name: band.name.clone(),
                source_dtype: band.dtype(),
                stats: band.stats.clone(),
            });
            debug!(band = %band.name, index = summaries.len(), "Wrote band; releasing grid");
            drop(band);
        }

        if summaries.len() != profile.band_count() {
            return Err(WriteError::shape_mismatch(
                format!("{} bands", profile.band_count()),
                format!("{} bands", summaries.len()),
            ));
        }

        self.write_image_tags(&mut dir, rows_per_strip)?;
        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        self.write_geo_tags(&mut dir, &names)?;
        dir.write_tag(Tag::StripOffsets, K::convert_slice(&offsets))?;
        dir.write_tag(Tag::StripByteCounts, K::convert_slice(&byte_counts))?;
        dir.finish()?;

        Ok(summaries)
    }

    fn write_image_tags<W: Write + Seek, K: TiffKind>(
        &self,
        dir: &mut DirectoryEncoder<W, K>,
        rows_per_strip: usize,
    ) -> Result<(), WriteError> {
        let profile = &self.profile;
        let bands = profile.band_count();
        let dtype = profile.dtype();

        dir.write_tag(Tag::ImageWidth, profile.width())?;
        dir.write_tag(Tag::ImageLength, profile.height())?;
        dir.write_tag(Tag::BitsPerSample, vec![dtype.bits_per_sample(); bands].as_slice())?;
        dir.write_tag(Tag::Compression, profile.compression().tiff_code())?;
        // BlackIsZero
        dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
        dir.write_tag(Tag::SamplesPerPixel, bands as u16)?;
        dir.write_tag(Tag::RowsPerStrip, rows_per_strip as u32)?;
        dir.write_tag(Tag::SampleFormat, vec![dtype.sample_format(); bands].as_slice())?;

        if bands > 1 {
            // Separate planes, one band after another
            dir.write_tag(Tag::PlanarConfiguration, 2u16)?;
            dir.write_tag(Tag::ExtraSamples, vec![0u16; bands - 1].as_slice())?;
        } else {
            dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
        }

        let software = format!("grid-raster {}", env!("CARGO_PKG_VERSION"));
        dir.write_tag(Tag::Software, software.as_str())?;
        let timestamp = Utc::now().format("%Y:%m:%d %H:%M:%S").to_string();
        dir.write_tag(Tag::DateTime, timestamp.as_str())?;
        Ok(())
    }

    fn write_geo_tags<W: Write + Seek, K: TiffKind>(
        &self,
        dir: &mut DirectoryEncoder<W, K>,
        band_names: &[&str],
    ) -> Result<(), WriteError> {
        let profile = &self.profile;
        let transform = profile.transform();
        let (res_x, res_y) = transform.pixel_size();

        let pixel_scale = [res_x, res_y, 0.0];
        dir.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), pixel_scale.as_slice())?;

        // Pixel (0, 0) is tied to the top-left corner.
        let tiepoint = [0.0, 0.0, 0.0, transform.c, transform.f, 0.0];
        dir.write_tag(Tag::Unknown(MODEL_TIEPOINT), tiepoint.as_slice())?;

        let citation = citation(profile.crs());
        let geokeys = geokey_directory(profile.crs(), citation.len() as u16);
        dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), geokeys.as_slice())?;
        dir.write_tag(Tag::Unknown(GEO_ASCII_PARAMS), citation.as_str())?;

        let nodata = if profile.dtype().is_float() { "nan" } else { "0" };
        dir.write_tag(Tag::Unknown(GDAL_NODATA), nodata)?;
        dir.write_tag(Tag::Unknown(GDAL_METADATA), gdal_metadata(band_names).as_str())?;
        Ok(())
    }
}

/// GeoTIFF citation string, `|`-terminated as GeoAsciiParams expects.
fn citation(crs: CrsCode) -> String {
    match crs {
        CrsCode::Epsg3857 => "WGS 84 / Pseudo-Mercator|".to_string(),
        CrsCode::Epsg4326 => "WGS 84|".to_string(),
    }
}

/// GeoKeyDirectory for `crs`.
///
/// Layout: header (version, revision, minor, key count), then one
/// (key id, tag location, count, value) quadruple per key, sorted by id.
fn geokey_directory(crs: CrsCode, citation_len: u16) -> Vec<u16> {
    let (model_type, crs_key) = if crs.is_geographic() {
        // ModelTypeGeographic, GeographicTypeGeoKey
        (2, 2048)
    } else {
        // ModelTypeProjected, ProjectedCSTypeGeoKey
        (1, 3072)
    };
    vec![
        1, 1, 0, 4,
        1024, 0, 1, model_type,
        // RasterPixelIsArea
        1025, 0, 1, 1,
        1026, GEO_ASCII_PARAMS, citation_len, 0,
        crs_key, 0, 1, crs.epsg(),
    ]
}

/// GDAL band descriptions, one per band in file order.
fn gdal_metadata(band_names: &[&str]) -> String {
    let mut xml = String::from("<GDALMetadata>");
    for (sample, name) in band_names.iter().enumerate() {
        xml.push_str(&format!(
            "<Item name=\"DESCRIPTION\" sample=\"{}\" role=\"description\">{}</Item>",
            sample,
            escape_xml(name)
        ));
    }
    xml.push_str("</GDALMetadata>");
    xml
}

/// Escape XML specials; TIFF ASCII tags cannot carry anything beyond 7-bit.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_ascii() && c != '\0' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Append grid row `row` to `out` as native-endian samples of `target`.
///
/// Narrower bands are widened; integer no-data (0) becomes NaN in a float file.
fn append_row(
    grid: &Grid,
    band: &str,
    row: usize,
    target: NumericType,
    out: &mut Vec<u8>,
) -> Result<(), WriteError> {
    let width = grid.width();
    let cells = row * width..(row + 1) * width;

    match (grid.data(), target) {
        (GridData::UInt16(v), NumericType::UInt16) => {
            out.extend_from_slice(bytemuck::cast_slice(&v[cells]))
        }
        (GridData::UInt16(v), NumericType::UInt32) => widen(out, &v[cells], u32::from),
        (GridData::UInt16(v), NumericType::Float32) => widen(out, &v[cells], |x| {
            if x == 0 {
                f32::NAN
            } else {
                f32::from(x)
            }
        }),
        (GridData::UInt32(v), NumericType::UInt32) => {
            out.extend_from_slice(bytemuck::cast_slice(&v[cells]))
        }
        (GridData::UInt32(v), NumericType::Float32) => widen(out, &v[cells], |x| {
            if x == 0 {
                f32::NAN
            } else {
                x as f32
            }
        }),
        (GridData::Float32(v), NumericType::Float32) => {
            out.extend_from_slice(bytemuck::cast_slice(&v[cells]))
        }
        (data, target) => {
            return Err(WriteError::Narrowing {
                band: band.to_string(),
                band_dtype: data.dtype(),
                file_dtype: target,
            })
        }
    }
    Ok(())
}

fn widen<S: Copy, T: bytemuck::Pod>(out: &mut Vec<u8>, src: &[S], convert: impl Fn(S) -> T) {
    for &value in src {
        out.extend_from_slice(bytemuck::bytes_of(&convert(value)));
    }
}

fn compress(compression: Compression, raw: &[u8]) -> std::io::Result<Cow<'_, [u8]>> {
    match compression {
        Compression::None => Ok(Cow::Borrowed(raw)),
        Compression::Deflate => {
            let mut encoder = ZlibEncoder::new(Vec::with_capacity(raw.len() / 4), flate2::Compression::fast());
            encoder.write_all(raw)?;
            Ok(Cow::Owned(encoder.finish()?))
        }
    }
}
