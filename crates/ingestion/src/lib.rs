//! Tile record ingestion.
//!
//! Reads quadkey-indexed performance tiles from Parquet / GeoParquet into a
//! [`TileTable`](tile_common::TileTable) for rasterization.
//!
//! # Architecture
//!
//! - [`discover_inputs`] turns a file or directory argument into a sorted list
//!   of Parquet files.
//! - [`TileReader`] is the reader seam; [`ParquetTileReader`] is the Arrow
//!   backed implementation. It checks the schema once, projects only the
//!   quadkey and requested columns, and casts every attribute to `f64`.

pub mod discover;
pub mod error;
pub mod parquet_reader;
pub mod reader;

// Re-exports
pub use discover::{discover_inputs, is_parquet};
pub use error::{IngestionError, Result};
pub use parquet_reader::{ParquetTileReader, DEFAULT_QUADKEY_COLUMN};
pub use reader::TileReader;
