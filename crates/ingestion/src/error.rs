//! Error types for the ingestion crate.

use std::path::PathBuf;

use thiserror::Error;
use tile_common::MissingAttributeError;

/// Errors that stop an input from being read.
///
/// Any of these aborts the run for that input; nothing is written for it.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("No Parquet files found under {}", .0.display())]
    NoInputs(PathBuf),

    #[error("Failed to walk input directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to read Parquet data: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Failed to decode Arrow data: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Quadkey column '{column}' not found in {}", .path.display())]
    MissingQuadkeyColumn { path: PathBuf, column: String },

    #[error(transparent)]
    MissingAttributes(#[from] MissingAttributeError),

    #[error("Column '{column}' has unsupported type {data_type}")]
    UnsupportedColumnType { column: String, data_type: String },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
