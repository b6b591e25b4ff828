//! Output grid layout: which window of the tile grid becomes the raster.

use serde::{Deserialize, Serialize};
use tile_common::{BoundingBox, DecodeError, TileCoord, TileTable};

use crate::config::ZoomMismatchPolicy;
use crate::error::{RasterError, Result};

/// A rectangular window of grid cells, in flipped (row 0 south) indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridExtent {
    pub col_off: u32,
    pub row_off: u32,
    pub width: u32,
    pub height: u32,
}

impl GridExtent {
    /// The whole `grid_size` x `grid_size` grid.
    pub fn full(grid_size: u32) -> Self {
        Self {
            col_off: 0,
            row_off: 0,
            width: grid_size,
            height: grid_size,
        }
    }

    /// Flat cell index inside this window, or `None` when outside.
    pub fn local_index(&self, x_idx: u32, y_idx: u32) -> Option<usize> {
        let col = x_idx.checked_sub(self.col_off)?;
        let row = y_idx.checked_sub(self.row_off)?;
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(row as usize * self.width as usize + col as usize)
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Where a quadkey landed on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    /// Flat index into the output window; `None` when outside it.
    pub cell: Option<usize>,
    /// The quadkey was at another zoom and was wrapped onto the grid.
    pub wrapped: bool,
}

/// Output zoom plus the window of the tile grid that is rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    pub zoom_level: u8,
    pub grid_size: u32,
    pub extent: GridExtent,
}

impl GridLayout {
    /// The full tile grid at `zoom_level`.
    pub fn full(zoom_level: u8) -> Self {
        let grid_size = tile_common::grid_size_for_zoom(zoom_level);
        Self {
            zoom_level,
            grid_size,
            extent: GridExtent::full(grid_size),
        }
    }

    /// The full grid for an explicit side length, which must be a power of two.
    pub fn for_grid_size(grid_size: u32) -> Result<Self> {
        if !grid_size.is_power_of_two() {
            return Err(DecodeError::InvalidGridSize(grid_size).into());
        }
        Ok(Self::full(grid_size.trailing_zeros() as u8))
    }

    /// Tightest window covering every record that decodes under `policy`.
    pub fn data_derived(
        zoom_level: u8,
        records: &TileTable,
        policy: ZoomMismatchPolicy,
    ) -> Result<Self> {
        let full = Self::full(zoom_level);
        let mut window: Option<(u32, u32, u32, u32)> = None;

        for quadkey in records.quadkeys() {
            let Ok(tile) = full.grid_cell(quadkey, policy) else {
                continue;
            };
            let (x, y) = tile;
            window = Some(match window {
                None => (x, y, x, y),
                Some((min_x, min_y, max_x, max_y)) => {
                    (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
                }
            });
        }

        let (min_x, min_y, max_x, max_y) = window.ok_or(RasterError::EmptyExtent)?;
        Ok(Self {
            extent: GridExtent {
                col_off: min_x,
                row_off: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
            },
            ..full
        })
    }

    pub fn width(&self) -> usize {
        self.extent.width as usize
    }

    pub fn height(&self) -> usize {
        self.extent.height as usize
    }

    pub fn is_full(&self) -> bool {
        self.extent == GridExtent::full(self.grid_size)
    }

    /// Flipped grid indices of `quadkey`, applying the zoom policy.
    fn grid_cell(
        &self,
        quadkey: &str,
        policy: ZoomMismatchPolicy,
    ) -> std::result::Result<(u32, u32), DecodeError> {
        self.locate_tile(quadkey, policy).map(|(cell, _)| cell)
    }

    fn locate_tile(
        &self,
        quadkey: &str,
        policy: ZoomMismatchPolicy,
    ) -> std::result::Result<((u32, u32), bool), DecodeError> {
        let tile = TileCoord::from_quadkey(quadkey)?;
        let wrapped = tile.z != u32::from(self.zoom_level);
        if wrapped && policy == ZoomMismatchPolicy::Reject {
            return Err(DecodeError::ZoomMismatch {
                quadkey: quadkey.to_string(),
                found: tile.z as u8,
                expected: self.zoom_level,
            });
        }
        Ok((tile.grid_index(self.grid_size), wrapped))
    }

    /// Decode `quadkey` to a cell of this layout's window.
    pub fn locate(
        &self,
        quadkey: &str,
        policy: ZoomMismatchPolicy,
    ) -> std::result::Result<Located, DecodeError> {
        let ((x_idx, y_idx), wrapped) = self.locate_tile(quadkey, policy)?;
        Ok(Located {
            cell: self.extent.local_index(x_idx, y_idx),
            wrapped,
        })
    }

    /// Real-world bounds of the window, when the full grid spans `world`.
    pub fn bounds_within(&self, world: &BoundingBox) -> BoundingBox {
        if self.is_full() {
            return *world;
        }
        let res_x = world.width() / f64::from(self.grid_size);
        let res_y = world.height() / f64::from(self.grid_size);
        let min_x = world.min_x + f64::from(self.extent.col_off) * res_x;
        let min_y = world.min_y + f64::from(self.extent.row_off) * res_y;
        BoundingBox::new(
            min_x,
            min_y,
            min_x + f64::from(self.extent.width) * res_x,
            min_y + f64::from(self.extent.height) * res_y,
        )
    }
}
