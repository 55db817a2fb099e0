//! Stage 1: missing value analysis

use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::Serialize;

use super::artifacts::{ensure_output_dir, write_csv};
use super::config::{PipelineConfig, Stage};
use super::error::StageError;
use super::loader::load_dataset;

/// Summary rows included in the payload sample.
const SAMPLE_ROWS: usize = 10;

/// Missing-value count for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingEntry {
    pub feature: String,
    pub missing_count: usize,
    pub missing_percentage: f64,
}

/// Result of the missing value stage.
#[derive(Debug, Clone, Serialize)]
pub struct MissingValueReport {
    pub message: String,
    pub output_file: PathBuf,
    pub total_rows: usize,
    pub total_columns: usize,
    pub missing_summary: Vec<MissingEntry>,
    pub total_missing_features: usize,
    pub sample_output: Vec<MissingEntry>,
}

/// Count missing values per column.
///
/// Only columns with at least one missing value are returned, sorted by
/// descending count; columns with equal counts keep table order.
pub fn analyze_missing_values(df: &DataFrame) -> Vec<MissingEntry> {
    let rows = df.height();
    if rows == 0 {
        return Vec::new();
    }

    let mut entries: Vec<MissingEntry> = df
        .get_columns()
        .iter()
        .filter(|col| col.null_count() > 0)
        .map(|col| MissingEntry {
            feature: col.name().to_string(),
            missing_count: col.null_count(),
            missing_percentage: col.null_count() as f64 / rows as f64 * 100.0,
        })
        .collect();

    entries.sort_by(|a, b| b.missing_count.cmp(&a.missing_count));
    entries
}

/// Build the stage-1 CSV table: `feature,missing_count,missing_percentage`.
pub fn missing_summary_frame(entries: &[MissingEntry]) -> Result<DataFrame, StageError> {
    let features: Vec<&str> = entries.iter().map(|e| e.feature.as_str()).collect();
    let counts: Vec<u64> = entries.iter().map(|e| e.missing_count as u64).collect();
    let percentages: Vec<f64> = entries.iter().map(|e| e.missing_percentage).collect();

    DataFrame::new(vec![
        Column::new("feature".into(), features),
        Column::new("missing_count".into(), counts),
        Column::new("missing_percentage".into(), percentages),
    ])
    .map_err(|e| StageError::artifact(format!("Failed to assemble missing value table: {}", e)))
}

/// Run stage 1 on the CSV at `input`.
pub fn run_missing_stage(
    input: &Path,
    config: &PipelineConfig,
) -> Result<MissingValueReport, StageError> {
    let df = load_dataset(input, config.load)?;
    let entries = analyze_missing_values(&df);

    ensure_output_dir(&config.output_dir)?;
    let output_file = Stage::MissingValues.csv_path(&config.output_dir);
    let mut table = missing_summary_frame(&entries)?;
    write_csv(&mut table, &output_file)?;

    tracing::info!(
        columns_with_missing = entries.len(),
        output = %output_file.display(),
        "missing value analysis complete"
    );

    Ok(MissingValueReport {
        message: "Missing value analysis completed".to_string(),
        output_file,
        total_rows: df.height(),
        total_columns: df.width(),
        total_missing_features: entries.len(),
        sample_output: entries.iter().take(SAMPLE_ROWS).cloned().collect(),
        missing_summary: entries,
    })
}
