//! Band stacker: one band per requested column, in request order.

use tile_common::TileTable;
use tracing::info;

use crate::band::BandBuilder;
use crate::config::BandSpec;
use crate::error::Result;
use crate::layout::GridLayout;
use crate::types::{Band, BandStack, NumericType};

/// Build one full-grid band per column, preserving `columns` order.
///
/// `dtype_of` picks each band's storage type, so 16- and 32-bit bands can be
/// mixed in one stack.
pub fn stack_bands<S, F>(
    records: &TileTable,
    columns: &[S],
    grid_size: u32,
    dtype_of: F,
) -> Result<BandStack>
where
    S: AsRef<str>,
    F: Fn(&str) -> NumericType,
{
    let specs = columns
        .iter()
        .map(|c| BandSpec::new(c.as_ref(), dtype_of(c.as_ref())))
        .collect();
    let layout = GridLayout::for_grid_size(grid_size)?;
    BandStacker::new(BandBuilder::new(records, layout), specs).stack()
}

/// Builds the configured bands, either all at once or one at a time.
#[derive(Debug, Clone)]
pub struct BandStacker<'a> {
    builder: BandBuilder<'a>,
    specs: Vec<BandSpec>,
}

impl<'a> BandStacker<'a> {
    pub fn new(builder: BandBuilder<'a>, specs: Vec<BandSpec>) -> Self {
        Self { builder, specs }
    }

    pub fn specs(&self) -> &[BandSpec] {
        &self.specs
    }

    /// Widest storage type of the configured bands.
    pub fn widest_dtype(&self) -> Option<NumericType> {
        NumericType::widest(self.specs.iter().map(|s| s.dtype))
    }

    fn check_columns(&self) -> Result<()> {
        let columns: Vec<&str> = self.specs.iter().map(|s| s.column.as_str()).collect();
        self.builder.records().require_columns(&columns)?;
        Ok(())
    }

    /// Build every band and hold them in one stack.
    pub fn stack(&self) -> Result<BandStack> {
        self.check_columns()?;
        let mut stack = BandStack::with_capacity(self.specs.len());
        for spec in &self.specs {
            stack.push(self.builder.build(&spec.column, spec.dtype)?)?;
        }
        info!(
            bands = stack.len(),
            width = self.builder.layout().width(),
            height = self.builder.layout().height(),
            "Stacked bands"
        );
        Ok(stack)
    }

    /// Yield bands one at a time so each can be written and dropped before
    /// the next is built.
    ///
    /// Every column is checked up front, so a missing column fails here
    /// rather than halfway through a write.
    pub fn lazy(&self) -> Result<LazyBands<'_, 'a>> {
        self.check_columns()?;
        Ok(LazyBands {
            stacker: self,
            next: 0,
        })
    }
}

/// Iterator over bands built on demand.
pub struct LazyBands<'s, 'a> {
    stacker: &'s BandStacker<'a>,
    next: usize,
}

impl Iterator for LazyBands<'_, '_> {
    type Item = Result<Band>;

    fn next(&mut self) -> Option<Self::Item> {
        let spec = self.stacker.specs.get(self.next)?;
        self.next += 1;
        Some(self.stacker.builder.build(&spec.column, spec.dtype))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.stacker.specs.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LazyBands<'_, '_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::build_band;
    use crate::error::RasterError;

    fn records() -> TileTable {
        let mut table = TileTable::new(["a", "b", "c"]);
        table.push_row("0000", [Some(1.0), Some(10.0), Some(70000.0)]);
        table.push_row("2121", [Some(2.0), None, Some(3.5)]);
        table.push_row("3333", [Some(3.0), Some(30.0), Some(9.0)]);
        table
    }

    #[test]
    fn test_band_order_fidelity() {
        let records = records();
        let stack = stack_bands(&records, &["b", "a"], 16, |_| NumericType::UInt16).unwrap();

        assert_eq!(stack.names(), vec!["b", "a"]);
        assert_eq!(
            stack.band(0).unwrap().grid,
            build_band(&records, "b", 16, NumericType::UInt16).unwrap()
        );
        assert_eq!(
            stack.band(1).unwrap().grid,
            build_band(&records, "a", 16, NumericType::UInt16).unwrap()
        );
    }

    #[test]
    fn test_mixed_storage_types() {
        let records = records();
        let stack = stack_bands(&records, &["a", "c"], 16, |column| match column {
            "c" => NumericType::UInt32,
            _ => NumericType::UInt16,
        })
        .unwrap();

        assert_eq!(stack.band(0).unwrap().dtype(), NumericType::UInt16);
        assert_eq!(stack.band(1).unwrap().dtype(), NumericType::UInt32);
        assert_eq!(stack.band(1).unwrap().grid.get(0, 15), Some(70000.0));
        assert_eq!(stack.widest_dtype(), Some(NumericType::UInt32));
    }

    #[test]
    fn test_missing_columns_fail_before_building() {
        let records = records();
        let err = stack_bands(&records, &["a", "x", "y"], 16, |_| NumericType::UInt16).unwrap_err();
        match err {
            RasterError::MissingAttributes(e) => assert_eq!(e.columns, vec!["x", "y"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lazy_matches_eager() {
        let records = records();
        let stacker = BandStacker::new(
            BandBuilder::new(&records, GridLayout::full(4)),
            vec![
                BandSpec::new("c", NumericType::Float32),
                BandSpec::new("a", NumericType::UInt16),
            ],
        );

        let lazy = stacker.lazy().unwrap();
        assert_eq!(lazy.len(), 2);
        let lazy: Vec<Band> = lazy.collect::<Result<_>>().unwrap();
        assert_eq!(lazy, stacker.stack().unwrap().into_bands());
        assert_eq!(stacker.widest_dtype(), Some(NumericType::Float32));
    }

    #[test]
    fn test_lazy_checks_columns_up_front() {
        let records = records();
        let stacker = BandStacker::new(
            BandBuilder::new(&records, GridLayout::full(4)),
            vec![BandSpec::new("missing", NumericType::UInt16)],
        );
        assert!(stacker.lazy().is_err());
    }
}
