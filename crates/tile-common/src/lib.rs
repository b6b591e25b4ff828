//! Common types shared across the speedtest rasterizer workspace.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod table;
pub mod tile;

pub use bbox::BoundingBox;
pub use crs::CrsCode;
pub use error::{DecodeError, MissingAttributeError};
pub use table::{Column, TileTable};
pub use tile::{decode, grid_size_for_zoom, TileCoord, WEB_MERCATOR_EXTENT};
