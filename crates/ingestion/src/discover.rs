//! Input discovery over files and directories.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IngestionError, Result};

/// Resolve an input path to the Parquet files it names.
///
/// A file is returned as-is, whatever its extension. A directory is walked
/// recursively for `*.parquet` files, returned sorted so runs are repeatable.
pub fn discover_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(IngestionError::InputNotFound(path.to_path_buf()));
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut inputs = Vec::new();
    for entry in walkdir::WalkDir::new(path).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && is_parquet(entry.path()) {
            debug!(path = %entry.path().display(), "Found input");
            inputs.push(entry.into_path());
        }
    }

    if inputs.is_empty() {
        return Err(IngestionError::NoInputs(path.to_path_buf()));
    }
    inputs.sort();
    Ok(inputs)
}

/// True for paths with a `.parquet` extension, case-insensitively.
pub fn is_parquet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_parquet() {
        assert!(is_parquet(Path::new("tiles.parquet")));
        assert!(is_parquet(Path::new("/data/2020-q1/TILES.PARQUET")));
        assert!(!is_parquet(Path::new("tiles.parquet.json")));
        assert!(!is_parquet(Path::new("tiles")));
    }

    #[test]
    fn test_file_is_returned_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tiles.bin");
        fs::write(&file, b"x").unwrap();
        assert_eq!(discover_inputs(&file).unwrap(), vec![file]);
    }

    #[test]
    fn test_directory_walk_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("q2")).unwrap();
        for name in ["b.parquet", "a.parquet", "notes.txt", "q2/c.parquet"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let inputs = discover_inputs(dir.path()).unwrap();
        let names: Vec<_> = inputs
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.parquet"),
                PathBuf::from("b.parquet"),
                PathBuf::from("q2/c.parquet"),
            ]
        );
    }

    #[test]
    fn test_missing_and_empty_inputs() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_inputs(&dir.path().join("nope")),
            Err(IngestionError::InputNotFound(_))
        ));
        assert!(matches!(
            discover_inputs(dir.path()),
            Err(IngestionError::NoInputs(_))
        ));
    }
}
