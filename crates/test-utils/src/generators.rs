//! Generators for synthetic tile records and grids.
//!
//! These produce predictable, verifiable data: every value can be recomputed
//! from its position, so tests can check placement cell by cell.

use tile_common::{TileCoord, TileTable};

use crate::fixtures::OOKLA_COLUMNS;

/// Quadkey at `zoom` that decodes to grid cell `(x_idx, y_idx)`.
///
/// Inverse of the decoder's flip: `y_idx = N - 1 - tile_y`.
///
/// # Example
///
/// ```
/// use test_utils::quadkey_for_cell;
///
/// assert_eq!(quadkey_for_cell(4, 0, 0), "2222");
/// assert_eq!(quadkey_for_cell(4, 15, 15), "1111");
/// ```
pub fn quadkey_for_cell(zoom: u8, x_idx: u32, y_idx: u32) -> String {
    let n = 1u32 << zoom;
    TileCoord::new(u32::from(zoom), x_idx, n - 1 - y_idx).to_quadkey()
}

/// One-column ("speed") records placed at explicit grid cells.
///
/// Each entry is `(x_idx, y_idx, value)`; records keep the slice order.
pub fn speed_records(zoom: u8, cells: &[(u32, u32, f64)]) -> TileTable {
    let mut table = TileTable::with_capacity(["speed"], cells.len());
    for &(x, y, value) in cells {
        table.push_row(quadkey_for_cell(zoom, x, y), [Some(value)]);
    }
    table
}

/// Ookla-style records with the five performance columns.
///
/// Record `i` lands on a cell derived from `i` and `seed`; values are
/// `avg_d_kbps = 1000 * (i + 1)`, `avg_u_kbps = 100 * (i + 1)`,
/// `avg_lat_ms = i % 200 + 1`, `tests = i % 50 + 1`, `devices = i % 20 + 1`.
/// Cells may repeat when `count` approaches the cell count.
pub fn tile_records(zoom: u8, count: usize, seed: u32) -> TileTable {
    let n = 1u64 << zoom;
    let mut table = TileTable::with_capacity(OOKLA_COLUMNS, count);
    for i in 0..count {
        let mixed = (i as u64).wrapping_mul(2654435761).wrapping_add(u64::from(seed));
        let x = (mixed % n) as u32;
        let y = ((mixed / n) % n) as u32;
        let i = i as f64;
        table.push_row(
            quadkey_for_cell(zoom, x, y),
            [
                Some(1000.0 * (i + 1.0)),
                Some(100.0 * (i + 1.0)),
                Some(i % 200.0 + 1.0),
                Some(i % 50.0 + 1.0),
                Some(i % 20.0 + 1.0),
            ],
        );
    }
    table
}

/// Creates a test grid with predictable, non-zero values.
///
/// Each cell value is `col * 1000 + row + 1`, so no cell equals the integer
/// no-data value.
///
/// # Returns
///
/// A `Vec<u32>` in row-major order (row 0 first).
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[0], 1);      // col=0, row=0
/// assert_eq!(grid[1], 1001);   // col=1, row=0
/// assert_eq!(grid[10], 2);     // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<u32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row + 1) as u32);
        }
    }
    data
}
