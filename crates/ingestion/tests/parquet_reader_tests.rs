//! Reading Ookla-shaped Parquet files from disk.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, LargeStringArray, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use ingestion::{discover_inputs, IngestionError, ParquetTileReader, TileReader};
use parquet::arrow::ArrowWriter;
use test_utils::{tile_records, write_parquet_fixture, OOKLA_COLUMNS};

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Ookla's own layout: Utf8 quadkey, WKT tile, Int64 attributes.
fn write_ookla_like(path: &Path, quadkeys: Vec<Option<&str>>, speeds: Vec<Option<i64>>) {
    let n = quadkeys.len();
    let schema = Arc::new(Schema::new(vec![
        Field::new("quadkey", DataType::Utf8, true),
        Field::new("tile", DataType::Utf8, false),
        Field::new("avg_d_kbps", DataType::Int64, true),
        Field::new("tests", DataType::Int64, true),
    ]));
    let tests: Vec<Option<i64>> = (0..n as i64).map(Some).collect();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(quadkeys)),
        Arc::new(StringArray::from(vec!["POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))"; n])),
        Arc::new(Int64Array::from(speeds)),
        Arc::new(Int64Array::from(tests)),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let mut writer = ArrowWriter::try_new(std::fs::File::create(path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

#[test]
fn test_round_trip_through_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiles.parquet");
    let records = tile_records(6, 120, 5);
    write_parquet_fixture(&path, &records).unwrap();

    let mut reader = ParquetTileReader::new(&path);
    let table = reader.read(&columns(&OOKLA_COLUMNS)).unwrap();
    assert_eq!(table, records);
}

#[test]
fn test_projection_keeps_requested_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiles.parquet");
    write_parquet_fixture(&path, &tile_records(4, 20, 1)).unwrap();

    let table = ParquetTileReader::new(&path)
        .read(&columns(&["devices", "avg_d_kbps"]))
        .unwrap();
    let names: Vec<&str> = table.column_names().collect();
    assert_eq!(names, vec!["devices", "avg_d_kbps"]);
}

#[test]
fn test_integer_columns_cast_and_nulls_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ookla.parquet");
    write_ookla_like(
        &path,
        vec![Some("0123"), None, Some("3210")],
        vec![Some(1500), Some(7), None],
    );

    let table = ParquetTileReader::new(&path)
        .read(&columns(&["avg_d_kbps", "tests"]))
        .unwrap();

    assert_eq!(table.len(), 2, "null quadkey row is skipped");
    assert_eq!(table.quadkeys(), &["0123".to_string(), "3210".to_string()]);
    let speeds = &table.column("avg_d_kbps").unwrap().values;
    assert_eq!(speeds, &vec![Some(1500.0), None]);
    let tests = &table.column("tests").unwrap().values;
    assert_eq!(tests, &vec![Some(0.0), Some(2.0)]);
}

#[test]
fn test_large_utf8_quadkeys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.parquet");
    let schema = Arc::new(Schema::new(vec![
        Field::new("quadkey", DataType::LargeUtf8, false),
        Field::new("devices", DataType::Int64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(LargeStringArray::from(vec!["0", "1"])) as ArrayRef,
            Arc::new(Int64Array::from(vec![Some(3), Some(4)])),
        ],
    )
    .unwrap();
    let mut writer = ArrowWriter::try_new(std::fs::File::create(&path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let table = ParquetTileReader::new(&path).read(&columns(&["devices"])).unwrap();
    assert_eq!(table.quadkeys(), &["0".to_string(), "1".to_string()]);
}

#[test]
fn test_limit_reads_a_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiles.parquet");
    let records = tile_records(5, 50, 9);
    write_parquet_fixture(&path, &records).unwrap();

    let table = ParquetTileReader::new(&path)
        .with_limit(Some(7))
        .with_batch_size(3)
        .read(&columns(&["tests"]))
        .unwrap();
    assert_eq!(table.len(), 7);
    assert_eq!(table.quadkeys(), &records.quadkeys()[..7]);
}

#[test]
fn test_missing_columns_listed_together() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ookla.parquet");
    write_ookla_like(&path, vec![Some("0")], vec![Some(1)]);

    let err = ParquetTileReader::new(&path)
        .read(&columns(&["avg_d_kbps", "avg_lat_ms", "devices"]))
        .unwrap_err();
    match err {
        IngestionError::MissingAttributes(err) => {
            assert_eq!(err.columns, vec!["avg_lat_ms", "devices"]);
        }
        other => panic!("expected missing attributes, got {other}"),
    }
}

#[test]
fn test_unreadable_inputs() {
    let dir = tempfile::tempdir().unwrap();

    let missing = ParquetTileReader::new(dir.path().join("absent.parquet"))
        .read(&columns(&["tests"]))
        .unwrap_err();
    assert!(matches!(missing, IngestionError::InputNotFound(_)));

    let garbage = dir.path().join("garbage.parquet");
    std::fs::write(&garbage, b"definitely not parquet").unwrap();
    let err = ParquetTileReader::new(&garbage)
        .read(&columns(&["tests"]))
        .unwrap_err();
    assert!(matches!(err, IngestionError::Parquet(_)));
}

#[test]
fn test_discovered_directory_reads_every_file() {
    let dir = tempfile::tempdir().unwrap();
    write_parquet_fixture(&dir.path().join("b.parquet"), &tile_records(4, 10, 2)).unwrap();
    write_parquet_fixture(&dir.path().join("a.parquet"), &tile_records(4, 15, 3)).unwrap();

    let inputs = discover_inputs(dir.path()).unwrap();
    let counts: Vec<usize> = inputs
        .iter()
        .map(|path| {
            ParquetTileReader::new(path)
                .read(&columns(&["tests"]))
                .unwrap()
                .len()
        })
        .collect();
    assert_eq!(counts, vec![15, 10]);
}
