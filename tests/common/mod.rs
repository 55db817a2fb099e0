//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use polars::prelude::*;
use prepline::pipeline::PipelineConfig;
use tempfile::TempDir;

/// Write raw CSV text to `name` inside a new temporary directory.
pub fn write_csv_text(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    (temp_dir, path)
}

/// Write a DataFrame as CSV into a new temporary directory.
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Pipeline configuration writing into `dir/output`.
pub fn config_in(dir: &Path) -> PipelineConfig {
    PipelineConfig::new(dir.join("output"))
}

/// The three-row dataset used for end-to-end checks:
/// rows `(1,?,1) (2,2,0) (3,3,0)`.
pub fn tiny_dataset_csv() -> &'static str {
    "a,b,target\n1,?,1\n2,2,0\n3,3,0\n"
}

/// A labelled dataset with one strongly separating feature, one noise
/// feature, one constant feature, a text column and a `Biopsy` target.
/// Class 0 has 12 rows and class 1 has 4.
pub fn create_labelled_dataframe() -> DataFrame {
    df! {
        "Age" => [18.0f64, 22.0, 25.0, 31.0, 35.0, 40.0, 44.0, 48.0, 52.0, 29.0, 33.0, 37.0, 41.0, 27.0, 39.0, 45.0],
        "Marker" => [1.0f64, 1.2, 0.9, 1.1, 1.3, 0.8, 1.0, 1.2, 1.1, 0.9, 1.0, 1.3, 8.9, 9.2, 9.0, 8.8],
        "Noise" => [Some(5.0f64), Some(3.0), None, Some(7.0), Some(2.0), Some(6.0), Some(4.0), Some(5.0), Some(3.0), Some(6.0), Some(2.0), Some(7.0), Some(4.0), Some(5.0), None, Some(3.0)],
        "Flat" => [1.0f64; 16],
        "Clinic" => ["a", "b", "a", "b", "a", "b", "a", "b", "a", "b", "a", "b", "a", "b", "a", "b"],
        "Biopsy" => [0i32, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1],
    }
    .unwrap()
}

/// Read a CSV artifact back for assertions.
pub fn read_csv(path: &Path) -> DataFrame {
    LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()
        .unwrap()
        .collect()
        .unwrap()
}

/// Column values as f64.
pub fn column_f64(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}
