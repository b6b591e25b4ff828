//! Record reader abstraction.

use tile_common::TileTable;

use crate::error::Result;

/// A source of quadkey-indexed tile records.
///
/// Implementations check the requested columns against their schema once,
/// before reading any rows, and fail with every missing column listed.
pub trait TileReader {
    /// Read the quadkey column plus `columns`, in the given column order.
    fn read(&mut self, columns: &[String]) -> Result<TileTable>;

    /// Human-readable name of the source, for logs.
    fn source(&self) -> String;
}
