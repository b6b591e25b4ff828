//! Error types for rasterization.

use thiserror::Error;
use tile_common::{DecodeError, MissingAttributeError};

use crate::writer::WriteError;

/// Errors that abort a rasterization run.
///
/// Per-record problems (bad quadkeys, values that do not fit) are not errors
/// at this level; they are logged and counted in `BandStats`.
#[derive(Error, Debug)]
pub enum RasterError {
    /// Requested attribute columns are absent from the input.
    #[error(transparent)]
    MissingAttributes(#[from] MissingAttributeError),

    /// Bands or grids whose dimensions cannot be reconciled.
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: String, found: String },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// No record decoded to a cell, so no extent can be derived.
    #[error("no record decodes to a grid cell; cannot derive bounds")]
    EmptyExtent,

    /// Grid parameters that do not form a valid layout.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Failed to produce the output file.
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl RasterError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a ConfigError.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

/// Result type for rasterization operations.
pub type Result<T> = std::result::Result<T, RasterError>;
