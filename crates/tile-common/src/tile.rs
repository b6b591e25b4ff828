//! Quadtree tile addressing and quadkey decoding.
//!
//! A quadkey encodes a Web Mercator tile as one base-4 digit per zoom level.
//! Digit `d` at position `i` contributes bit `d & 1` to x and bit `d >> 1`
//! to y at weight `2^(z - 1 - i)`. Tile y grows southward.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::BoundingBox;

/// Half the side of the Web Mercator square, in meters.
pub const WEB_MERCATOR_EXTENT: f64 = 20037508.342789244;

/// Deepest zoom a quadkey may encode (tile indices must fit in `u32`).
pub const MAX_QUADKEY_ZOOM: usize = 31;

/// Side length of the tile grid at `zoom`.
pub fn grid_size_for_zoom(zoom: u8) -> u32 {
    1u32 << zoom
}

/// A tile coordinate (z/x/y), XYZ convention (row 0 is the northern edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Decode a quadkey into its native tile coordinate.
    ///
    /// The zoom is the quadkey length; an empty quadkey is the single zoom-0 tile.
    pub fn from_quadkey(quadkey: &str) -> Result<Self, DecodeError> {
        let len = quadkey.len();
        if len > MAX_QUADKEY_ZOOM {
            return Err(DecodeError::TooLong {
                quadkey: quadkey.to_string(),
                len,
                max: MAX_QUADKEY_ZOOM,
            });
        }

        let mut x = 0u32;
        let mut y = 0u32;
        for (position, byte) in quadkey.bytes().enumerate() {
            let digit = match byte {
                b'0'..=b'3' => byte - b'0',
                _ => {
                    return Err(DecodeError::InvalidDigit {
                        quadkey: quadkey.to_string(),
                        position,
                        // Report the full character, not a UTF-8 fragment.
                        digit: quadkey[position..].chars().next().unwrap_or('?'),
                    })
                }
            };
            x = (x << 1) | u32::from(digit & 1);
            y = (y << 1) | u32::from(digit >> 1);
        }

        Ok(Self {
            z: len as u32,
            x,
            y,
        })
    }

    /// Encode this tile as a quadkey.
    pub fn to_quadkey(&self) -> String {
        (0..self.z)
            .rev()
            .map(|bit| {
                let digit = ((self.x >> bit) & 1) | (((self.y >> bit) & 1) << 1);
                char::from(b'0' + digit as u8)
            })
            .collect()
    }

    /// Local grid indices of this tile in a `grid_size` square grid.
    ///
    /// Both axes reduce modulo `grid_size`; the row is flipped so index 0 is
    /// the southernmost row.
    pub fn grid_index(&self, grid_size: u32) -> (u32, u32) {
        let x_idx = self.x % grid_size;
        let y_idx = grid_size - 1 - (self.y % grid_size);
        (x_idx, y_idx)
    }

    /// Extent of this tile in Web Mercator meters.
    pub fn mercator_bounds(&self) -> BoundingBox {
        let span = 2.0 * WEB_MERCATOR_EXTENT / f64::from(grid_size_for_zoom(self.z as u8));
        let min_x = -WEB_MERCATOR_EXTENT + f64::from(self.x) * span;
        let max_y = WEB_MERCATOR_EXTENT - f64::from(self.y) * span;
        BoundingBox::new(min_x, max_y - span, min_x + span, max_y)
    }
}

/// Map a quadkey to local `(x_idx, y_idx)` indices of a `grid_size` grid.
///
/// `grid_size` must be a positive power of two. Quadkeys whose native zoom
/// differs from `log2(grid_size)` still decode; callers that care apply a
/// zoom policy before calling this.
pub fn decode(quadkey: &str, grid_size: u32) -> Result<(u32, u32), DecodeError> {
    if !grid_size.is_power_of_two() {
        return Err(DecodeError::InvalidGridSize(grid_size));
    }
    Ok(TileCoord::from_quadkey(quadkey)?.grid_index(grid_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_quadkey_known_tiles() {
        assert_eq!(TileCoord::from_quadkey("").unwrap(), TileCoord::new(0, 0, 0));
        assert_eq!(TileCoord::from_quadkey("1").unwrap(), TileCoord::new(1, 1, 0));
        assert_eq!(TileCoord::from_quadkey("2").unwrap(), TileCoord::new(1, 0, 1));
        // Bing Maps reference example
        assert_eq!(
            TileCoord::from_quadkey("213").unwrap(),
            TileCoord::new(3, 3, 5)
        );
    }

    #[test]
    fn test_to_quadkey_matches_decode() {
        let tile = TileCoord::new(3, 3, 5);
        assert_eq!(tile.to_quadkey(), "213");
        assert_eq!(TileCoord::new(0, 0, 0).to_quadkey(), "");
    }

    #[test]
    fn test_invalid_digit() {
        let err = TileCoord::from_quadkey("0124").unwrap_err();
        assert_eq!(
            err,
            DecodeError::InvalidDigit {
                quadkey: "0124".into(),
                position: 3,
                digit: '4'
            }
        );
        assert!(TileCoord::from_quadkey("01a").is_err());
        assert!(TileCoord::from_quadkey("0é").is_err());
    }

    #[test]
    fn test_too_long() {
        let quadkey = "0".repeat(32);
        assert!(matches!(
            TileCoord::from_quadkey(&quadkey),
            Err(DecodeError::TooLong { len: 32, .. })
        ));
    }

    #[test]
    fn test_grid_index_flips_rows() {
        // Northernmost tile row lands on the last grid row.
        assert_eq!(TileCoord::new(4, 0, 0).grid_index(16), (0, 15));
        assert_eq!(TileCoord::new(4, 15, 15).grid_index(16), (15, 0));
    }

    #[test]
    fn test_decode_rejects_bad_grid_size() {
        assert_eq!(decode("0", 0), Err(DecodeError::InvalidGridSize(0)));
        assert_eq!(decode("0", 12), Err(DecodeError::InvalidGridSize(12)));
    }

    #[test]
    fn test_mercator_bounds() {
        let world = TileCoord::new(0, 0, 0).mercator_bounds();
        assert_eq!(world, BoundingBox::web_mercator());

        let north_west = TileCoord::new(1, 0, 0).mercator_bounds();
        assert_eq!(north_west.min_x, -WEB_MERCATOR_EXTENT);
        assert_eq!(north_west.max_y, WEB_MERCATOR_EXTENT);
        assert!(north_west.min_y.abs() < 1e-6);
        assert!(north_west.max_x.abs() < 1e-6);
    }
}
