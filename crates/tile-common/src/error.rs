//! Error types shared by the tile crates.

use thiserror::Error;

/// A quadkey that cannot be mapped to a grid cell.
///
/// Decoding is per record; callers log the error and skip the record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("quadkey '{quadkey}' has invalid digit '{digit}' at position {position}")]
    InvalidDigit {
        quadkey: String,
        position: usize,
        digit: char,
    },

    #[error("quadkey '{quadkey}' is {len} digits long; at most {max} are supported")]
    TooLong {
        quadkey: String,
        len: usize,
        max: usize,
    },

    #[error("quadkey '{quadkey}' is at zoom {found}, expected zoom {expected}")]
    ZoomMismatch {
        quadkey: String,
        found: u8,
        expected: u8,
    },

    #[error("grid size must be a positive power of two, got {0}")]
    InvalidGridSize(u32),
}

/// Requested attribute columns that the input does not provide.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing attribute columns: {}", .columns.join(", "))]
pub struct MissingAttributeError {
    /// Every missing column, in the order requested.
    pub columns: Vec<String>,
}

impl MissingAttributeError {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }
}
