//! Bounding box types and operations.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::tile::WEB_MERCATOR_EXTENT;

/// A projected bounding box, given as (left, bottom, right, top).
///
/// For EPSG:3857 the coordinates are meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The complete extent of the Web Mercator projection.
    pub fn web_mercator() -> Self {
        Self::new(
            -WEB_MERCATOR_EXTENT,
            -WEB_MERCATOR_EXTENT,
            WEB_MERCATOR_EXTENT,
            WEB_MERCATOR_EXTENT,
        )
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// A box is usable for georeferencing only if it has positive, finite area.
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.max_x > self.min_x
            && self.max_y > self.min_y
    }

    /// The bounds as a `(left, bottom, right, top)` tuple.
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl From<(f64, f64, f64, f64)> for BoundingBox {
    fn from((left, bottom, right, top): (f64, f64, f64, f64)) -> Self {
        Self::new(left, bottom, right, top)
    }
}

impl FromStr for BoundingBox {
    type Err = BboxParseError;

    /// Parse "left,bottom,right,top".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }

        let bbox = Self::new(values[0], values[1], values[2], values[3]);
        if !bbox.is_valid() {
            return Err(BboxParseError::Degenerate(s.to_string()));
        }
        Ok(bbox)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bounds format: {0}. Expected 'left,bottom,right,top'")]
    InvalidFormat(String),

    #[error("Invalid number in bounds: {0}")]
    InvalidNumber(String),

    #[error("Bounds have no area: {0}")]
    Degenerate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bounds() {
        let bbox: BoundingBox = "-125.0, 24.0, -66.0, 50.0".parse().unwrap();
        assert_eq!(bbox.min_x, -125.0);
        assert_eq!(bbox.min_y, 24.0);
        assert_eq!(bbox.max_x, -66.0);
        assert_eq!(bbox.max_y, 50.0);
    }

    #[test]
    fn test_parse_rejects_inverted() {
        assert!(matches!(
            "10,10,5,5".parse::<BoundingBox>(),
            Err(BboxParseError::Degenerate(_))
        ));
        assert!(matches!(
            "1,2,3".parse::<BoundingBox>(),
            Err(BboxParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            "a,0,1,1".parse::<BoundingBox>(),
            Err(BboxParseError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_web_mercator_is_square() {
        let bbox = BoundingBox::web_mercator();
        assert!(bbox.is_valid());
        assert_eq!(bbox.width(), bbox.height());
    }
}
