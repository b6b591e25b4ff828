//! Coordinate Reference System identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::BoundingBox;

/// CRS codes the rasterizer can label its output with.
///
/// No reprojection happens anywhere; the code only tags the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CrsCode {
    /// Web Mercator (meters)
    #[default]
    #[serde(rename = "EPSG:3857")]
    Epsg3857,
    /// WGS84 Geographic (lat/lon in degrees)
    #[serde(rename = "EPSG:4326")]
    Epsg4326,
}

impl CrsCode {
    /// Numeric EPSG code.
    pub fn epsg(&self) -> u16 {
        match self {
            CrsCode::Epsg3857 => 3857,
            CrsCode::Epsg4326 => 4326,
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326)
    }

    /// Full valid extent of the CRS.
    pub fn valid_bounds(&self) -> BoundingBox {
        match self {
            // approx ±85.06° latitude
            CrsCode::Epsg3857 => BoundingBox::web_mercator(),
            CrsCode::Epsg4326 => BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}
