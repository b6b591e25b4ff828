//! Common test fixtures for rasterizer tests.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tile_common::TileTable;

/// The five Ookla performance-tile attribute columns, in band order.
pub const OOKLA_COLUMNS: [&str; 5] = ["avg_d_kbps", "avg_u_kbps", "avg_lat_ms", "tests", "devices"];

/// Common bounding boxes, as (left, bottom, right, top).
pub mod bbox {
    /// Full Web Mercator extent in meters.
    pub const WEB_MERCATOR: (f64, f64, f64, f64) = (
        -20037508.342789244,
        -20037508.342789244,
        20037508.342789244,
        20037508.342789244,
    );

    /// A 100 x 100 square at the origin.
    pub const UNIT_100: (f64, f64, f64, f64) = (0.0, 0.0, 100.0, 100.0);

    /// Zero-width box.
    pub const DEGENERATE: (f64, f64, f64, f64) = (10.0, 0.0, 10.0, 100.0);
}

/// The three-record zoom-4 scenario: cells (0,0), (5,5), (15,15).
pub mod scenario {
    pub const ZOOM: u8 = 4;
    pub const GRID_SIZE: u32 = 16;
    pub const QUADKEYS: [&str; 3] = ["2222", "2121", "1111"];
    pub const CELLS: [(u32, u32); 3] = [(0, 0), (5, 5), (15, 15)];
    pub const SPEEDS: [f64; 3] = [100.0, 200.0, 300.0];
}

/// Write `table` as a Parquet file with a Utf8 `quadkey` column and nullable
/// Float64 attribute columns, like the Ookla tile files.
pub fn write_parquet_fixture(path: &Path, table: &TileTable) -> parquet::errors::Result<()> {
    let mut fields = vec![Field::new("quadkey", DataType::Utf8, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(table.quadkeys().to_vec()))];
    for name in table.column_names() {
        fields.push(Field::new(name, DataType::Float64, true));
        let values = table.column(name).map(|c| c.values.clone()).unwrap_or_default();
        columns.push(Arc::new(Float64Array::from(values)));
    }

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
