//! Parquet / GeoParquet tile reader.
//!
//! Ookla performance tiles ship as Parquet with a `quadkey` string column, a
//! WKT `tile` polygon and numeric attribute columns. Only the quadkey and the
//! requested attributes are projected; cell positions come from the quadkey so
//! the geometry column is never decoded.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use tile_common::{MissingAttributeError, TileTable};
use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};
use crate::reader::TileReader;

/// Default quadkey column name in Ookla tile files.
pub const DEFAULT_QUADKEY_COLUMN: &str = "quadkey";

const DEFAULT_BATCH_SIZE: usize = 64 * 1024;

/// Reads tile records from a single Parquet file.
#[derive(Debug, Clone)]
pub struct ParquetTileReader {
    path: PathBuf,
    quadkey_column: String,
    limit: Option<usize>,
    batch_size: usize,
}

impl ParquetTileReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quadkey_column: DEFAULT_QUADKEY_COLUMN.to_string(),
            limit: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Read at most `limit` rows. Useful for sampled exploratory runs.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_quadkey_column(mut self, column: impl Into<String>) -> Self {
        self.quadkey_column = column.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate the file schema against the requested columns.
    ///
    /// Returns the root field indices to project, quadkey first.
    fn projection(&self, schema: &Schema, columns: &[String]) -> Result<Vec<usize>> {
        let quadkey_idx = schema
            .index_of(&self.quadkey_column)
            .map_err(|_| IngestionError::MissingQuadkeyColumn {
                path: self.path.clone(),
                column: self.quadkey_column.clone(),
            })?;
        let quadkey_type = schema.field(quadkey_idx).data_type();
        if !is_string_type(quadkey_type) {
            return Err(IngestionError::UnsupportedColumnType {
                column: self.quadkey_column.clone(),
                data_type: quadkey_type.to_string(),
            });
        }

        let missing: Vec<String> = columns
            .iter()
            .filter(|name| schema.index_of(name).is_err())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(MissingAttributeError::new(missing).into());
        }

        let mut indices = vec![quadkey_idx];
        for name in columns {
            let idx = schema.index_of(name)?;
            let data_type = schema.field(idx).data_type();
            if !is_numeric_type(data_type) {
                return Err(IngestionError::UnsupportedColumnType {
                    column: name.clone(),
                    data_type: data_type.to_string(),
                });
            }
            indices.push(idx);
        }
        Ok(indices)
    }
}

impl TileReader for ParquetTileReader {
    fn read(&mut self, columns: &[String]) -> Result<TileTable> {
        if !self.path.exists() {
            return Err(IngestionError::InputNotFound(self.path.clone()));
        }
        let file = File::open(&self.path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let total_rows = usize::try_from(builder.metadata().file_metadata().num_rows()).unwrap_or(0);

        let indices = self.projection(builder.schema(), columns)?;
        let mask = ProjectionMask::roots(builder.parquet_schema(), indices);

        let mut builder = builder
            .with_projection(mask)
            .with_batch_size(self.batch_size);
        if let Some(limit) = self.limit {
            builder = builder.with_limit(limit);
        }
        let reader = builder.build()?;

        let capacity = self.limit.map_or(total_rows, |limit| limit.min(total_rows));
        let mut table = TileTable::with_capacity(columns.iter().cloned(), capacity);
        let mut row = 0usize;
        let mut null_quadkeys = 0usize;

        for batch in reader {
            let batch = batch?;
            let quadkeys = string_column(column_of(&batch, &self.quadkey_column)?)?;
            let quadkeys = downcast::<StringArray>(&quadkeys, &self.quadkey_column)?;

            let mut values = Vec::with_capacity(columns.len());
            for name in columns {
                let array = cast(column_of(&batch, name)?, &DataType::Float64)?;
                values.push(array);
            }
            let values: Vec<&Float64Array> = values
                .iter()
                .zip(columns)
                .map(|(array, name)| downcast::<Float64Array>(array, name))
                .collect::<Result<_>>()?;

            for i in 0..batch.num_rows() {
                if quadkeys.is_null(i) {
                    warn!(row = row + i, "Skipping record with null quadkey");
                    null_quadkeys += 1;
                    continue;
                }
                table.push_row(
                    quadkeys.value(i),
                    values
                        .iter()
                        .map(|array| (!array.is_null(i)).then(|| array.value(i))),
                );
            }
            row += batch.num_rows();
            debug!(rows = batch.num_rows(), total = row, "Read record batch");
        }

        info!(
            path = %self.path.display(),
            records = table.len(),
            columns = columns.len(),
            null_quadkeys = null_quadkeys,
            limited = self.limit.is_some(),
            "Read tile records"
        );
        Ok(table)
    }

    fn source(&self) -> String {
        self.path.display().to_string()
    }
}

fn column_of<'b>(batch: &'b RecordBatch, name: &str) -> Result<&'b ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| MissingAttributeError::new(vec![name.to_string()]).into())
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, column: &str) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| IngestionError::UnsupportedColumnType {
            column: column.to_string(),
            data_type: array.data_type().to_string(),
        })
}

/// Normalise any accepted string encoding to `Utf8`.
fn string_column(array: &ArrayRef) -> Result<ArrayRef> {
    match array.data_type() {
        DataType::Utf8 => Ok(array.clone()),
        _ => Ok(cast(array, &DataType::Utf8)?),
    }
}

fn is_string_type(data_type: &DataType) -> bool {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => true,
        DataType::Dictionary(_, values) => {
            matches!(values.as_ref(), DataType::Utf8 | DataType::LargeUtf8)
        }
        _ => false,
    }
}

fn is_numeric_type(data_type: &DataType) -> bool {
    match data_type {
        DataType::Dictionary(_, values) => values.is_numeric(),
        other => other.is_numeric(),
    }
}
