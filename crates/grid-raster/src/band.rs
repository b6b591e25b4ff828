//! Band builder: scatter one attribute column onto a grid.
//!
//! Records are applied in input order and the last write to a cell wins.
//! With parallel decode enabled, quadkeys are decoded on the rayon pool but
//! the writes still happen sequentially in record order, so both paths
//! produce identical grids.

use rayon::prelude::*;
use tile_common::{DecodeError, TileTable};
use tracing::{debug, info, warn};

use crate::config::ZoomMismatchPolicy;
use crate::error::Result;
use crate::layout::{GridLayout, Located};
use crate::types::{Band, BandStats, Grid, GridData, NumericType, Sample};

/// Build a `grid_size` x `grid_size` band from one attribute column.
///
/// Uses the full grid and rejects quadkeys at a zoom other than
/// `log2(grid_size)`.
pub fn build_band(
    records: &TileTable,
    column: &str,
    grid_size: u32,
    dtype: NumericType,
) -> Result<Grid> {
    let layout = GridLayout::for_grid_size(grid_size)?;
    Ok(BandBuilder::new(records, layout).build(column, dtype)?.grid)
}

/// Builds bands over a fixed record set and layout.
#[derive(Debug, Clone, Copy)]
pub struct BandBuilder<'a> {
    records: &'a TileTable,
    layout: GridLayout,
    zoom_mismatch: ZoomMismatchPolicy,
    parallel_decode: bool,
}

impl<'a> BandBuilder<'a> {
    pub fn new(records: &'a TileTable, layout: GridLayout) -> Self {
        Self {
            records,
            layout,
            zoom_mismatch: ZoomMismatchPolicy::default(),
            parallel_decode: false,
        }
    }

    pub fn zoom_mismatch(mut self, policy: ZoomMismatchPolicy) -> Self {
        self.zoom_mismatch = policy;
        self
    }

    pub fn parallel_decode(mut self, enabled: bool) -> Self {
        self.parallel_decode = enabled;
        self
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn records(&self) -> &'a TileTable {
        self.records
    }

    /// Build the band for `column`.
    ///
    /// Fails only when the column does not exist; per-record problems are
    /// logged and counted in the band's stats.
    pub fn build(&self, column: &str, dtype: NumericType) -> Result<Band> {
        self.records.require_columns(&[column])?;
        let values = self
            .records
            .column(column)
            .map(|c| c.values.as_slice())
            .unwrap_or_default();

        let mut grid = Grid::new(self.layout.width(), self.layout.height(), dtype);
        let stats = match grid.data_mut() {
            GridData::UInt16(cells) => self.populate(cells, column, values),
            GridData::UInt32(cells) => self.populate(cells, column, values),
            GridData::Float32(cells) => self.populate(cells, column, values),
        };

        if stats.skipped() > 0 || stats.missing_values > 0 {
            warn!(
                column = %column,
                records = stats.records,
                written = stats.written,
                skipped = stats.skipped(),
                missing_values = stats.missing_values,
                "Band built with incomplete records"
            );
        }
        if stats.overwrites > 0 {
            info!(
                column = %column,
                overwrites = stats.overwrites,
                "Cells written more than once; kept the last value"
            );
        }
        debug!(
            column = %column,
            dtype = %dtype,
            width = grid.width(),
            height = grid.height(),
            written = stats.written,
            "Built band"
        );

        Ok(Band::new(column, grid).with_stats(stats))
    }

    fn populate<T: Sample>(&self, cells: &mut [T], column: &str, values: &[Option<f64>]) -> BandStats {
        let quadkeys = self.records.quadkeys();
        let mut scatter = Scatter {
            cells,
            values,
            column,
            stats: BandStats {
                records: quadkeys.len(),
                ..Default::default()
            },
        };

        if self.parallel_decode {
            let located: Vec<_> = quadkeys
                .par_iter()
                .map(|qk| self.layout.locate(qk, self.zoom_mismatch))
                .collect();
            for (row, result) in located.into_iter().enumerate() {
                scatter.apply(row, &quadkeys[row], result);
            }
        } else {
            for (row, qk) in quadkeys.iter().enumerate() {
                scatter.apply(row, qk, self.layout.locate(qk, self.zoom_mismatch));
            }
        }

        scatter.stats
    }
}

/// Sequential write pass over one band's cells.
struct Scatter<'g, T> {
    cells: &'g mut [T],
    values: &'g [Option<f64>],
    column: &'g str,
    stats: BandStats,
}

impl<T: Sample> Scatter<'_, T> {
    fn apply(&mut self, row: usize, quadkey: &str, located: std::result::Result<Located, DecodeError>) {
        let located = match located {
            Ok(located) => located,
            Err(e) => {
                match e {
                    DecodeError::ZoomMismatch { .. } => self.stats.zoom_rejected += 1,
                    _ => self.stats.invalid_quadkeys += 1,
                }
                warn!(row, column = %self.column, error = %e, "Skipping record");
                return;
            }
        };

        if located.wrapped {
            self.stats.zoom_wrapped += 1;
            debug!(row, quadkey = %quadkey, "Wrapped quadkey from another zoom onto the grid");
        }

        let Some(cell) = located.cell else {
            self.stats.outside_extent += 1;
            debug!(row, quadkey = %quadkey, "Record falls outside the output extent");
            return;
        };

        match self.values.get(row).copied().flatten() {
            None => {
                self.cells[cell] = T::NODATA;
                self.stats.missing_values += 1;
                warn!(row, column = %self.column, "Record has no value; wrote no-data");
            }
            Some(value) => match T::cast_from(value) {
                Some(cast) => {
                    if !self.cells[cell].is_nodata() {
                        self.stats.overwrites += 1;
                    }
                    self.cells[cell] = cast;
                    self.stats.written += 1;
                }
                None => {
                    self.stats.cast_failures += 1;
                    warn!(
                        row,
                        column = %self.column,
                        value,
                        dtype = %T::TYPE,
                        "Value does not fit the band type; skipping record"
                    );
                }
            },
        }
    }
}
