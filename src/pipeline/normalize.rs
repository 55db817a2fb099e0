//! Stage 2: median imputation followed by min-max normalization

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, Axis};
use serde::Serialize;

use super::artifacts::{ensure_output_dir, matrix_frame, write_csv};
use super::config::{PipelineConfig, Stage};
use super::error::StageError;
use super::impute::{impute_median, ImputerParams};
use super::loader::{drop_all_missing_columns, load_dataset, numeric_feature_matrix, FeatureMatrix};
use super::scale::{min_max_scale, ScalerParams};
use crate::report::payload::{self, Record};

/// Rows shown in the before/after tables.
const SAMPLE_ROWS: usize = 5;

/// Observed and scaled range of one feature.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureComparison {
    pub feature: String,
    #[serde(serialize_with = "payload::serialize_finite")]
    pub original_min: f64,
    #[serde(serialize_with = "payload::serialize_finite")]
    pub original_max: f64,
    #[serde(serialize_with = "payload::serialize_finite")]
    pub scaled_min: f64,
    #[serde(serialize_with = "payload::serialize_finite")]
    pub scaled_max: f64,
    pub range_reduction: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NormalizeSummary {
    pub total_rows: usize,
    pub features_scaled: usize,
    pub feature_names: Vec<String>,
    pub constant_features: Vec<String>,
    pub imputed_values: usize,
    pub scaling_range: String,
}

/// Result of the normalization stage.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizeReport {
    pub message: String,
    pub output_file: PathBuf,
    pub before_scaling: Vec<Record>,
    pub after_scaling: Vec<Record>,
    pub feature_comparison: Vec<FeatureComparison>,
    pub summary_stats: NormalizeSummary,
}

/// Numeric features before and after normalization.
#[derive(Debug, Clone)]
pub struct NormalizedData {
    pub raw: FeatureMatrix,
    pub scaled: FeatureMatrix,
    pub imputer: ImputerParams,
    pub scaler: ScalerParams,
}

/// Drop all-missing columns, keep numeric ones, impute and scale them.
pub fn normalize_frame(df: &polars::prelude::DataFrame) -> Result<NormalizedData, StageError> {
    let df = drop_all_missing_columns(df)?;
    let raw = numeric_feature_matrix(&df, None)?;
    let (imputed, imputer) = impute_median(&raw)?;
    let (scaled, scaler) = min_max_scale(&imputed);

    Ok(NormalizedData {
        scaled: FeatureMatrix::new(raw.names.clone(), scaled),
        raw,
        imputer,
        scaler,
    })
}

/// Column minimum and maximum over observed (non-NaN) values.
fn observed_bounds(values: &Array2<f64>) -> (Array1<f64>, Array1<f64>) {
    let mins = values.map_axis(Axis(0), |col| {
        col.iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(f64::NAN, f64::min)
    });
    let maxs = values.map_axis(Axis(0), |col| {
        col.iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(f64::NAN, f64::max)
    });
    (mins, maxs)
}

/// Per-feature comparison of observed and scaled bounds.
pub fn compare_features(data: &NormalizedData) -> Vec<FeatureComparison> {
    let (orig_mins, orig_maxs) = observed_bounds(&data.raw.values);
    let (scaled_mins, scaled_maxs) = observed_bounds(&data.scaled.values);

    data.raw
        .names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let original_range = orig_maxs[idx] - orig_mins[idx];
            let scaled_range = scaled_maxs[idx] - scaled_mins[idx];
            FeatureComparison {
                feature: name.clone(),
                original_min: orig_mins[idx],
                original_max: orig_maxs[idx],
                scaled_min: scaled_mins[idx],
                scaled_max: scaled_maxs[idx],
                range_reduction: format!("{:.2} → {:.2}", original_range, scaled_range),
            }
        })
        .collect()
}

/// First rows of a matrix as `Row i` records; NaN cells become `null`.
pub fn sample_records(names: &[String], values: &Array2<f64>, rows: usize) -> Vec<Record> {
    values
        .rows()
        .into_iter()
        .take(rows)
        .enumerate()
        .map(|(idx, row)| {
            let mut record = payload::sample_row(idx);
            for (name, value) in names.iter().zip(row.iter()) {
                record.insert(name.clone(), payload::number(*value));
            }
            record
        })
        .collect()
}

/// Run stage 2 on the CSV at `input`.
pub fn run_normalize_stage(
    input: &Path,
    config: &PipelineConfig,
) -> Result<NormalizeReport, StageError> {
    let df = load_dataset(input, config.load)?;
    let data = normalize_frame(&df)?;

    ensure_output_dir(&config.output_dir)?;
    let output_file = Stage::Normalize.csv_path(&config.output_dir);
    let mut table = matrix_frame(&data.scaled.names, &data.scaled.values)?;
    write_csv(&mut table, &output_file)?;

    let constant_features: Vec<String> = data
        .scaled
        .names
        .iter()
        .enumerate()
        .filter(|(idx, _)| data.scaler.is_constant(*idx))
        .map(|(_, name)| name.clone())
        .collect();
    if !constant_features.is_empty() {
        tracing::info!(columns = ?constant_features, "constant columns scaled to 0");
    }

    tracing::info!(
        rows = data.scaled.nrows(),
        features = data.scaled.ncols(),
        output = %output_file.display(),
        "normalization complete"
    );

    Ok(NormalizeReport {
        message: "Min-Max normalization completed".to_string(),
        output_file,
        before_scaling: sample_records(&data.raw.names, &data.raw.values, SAMPLE_ROWS),
        after_scaling: sample_records(&data.scaled.names, &data.scaled.values, SAMPLE_ROWS),
        feature_comparison: compare_features(&data),
        summary_stats: NormalizeSummary {
            total_rows: data.scaled.nrows(),
            features_scaled: data.scaled.ncols(),
            feature_names: data.scaled.names.clone(),
            constant_features,
            imputed_values: data.imputer.filled.iter().sum(),
            scaling_range: "[0, 1]".to_string(),
        },
    })
}
