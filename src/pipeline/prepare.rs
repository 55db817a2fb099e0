//! Shared preprocessing for the supervised stages
//!
//! Feature selection and balancing both: drop all-missing columns, resolve the
//! target, split off the numeric feature matrix, then impute and scale it.
//! Each stage calls this on its own freshly loaded dataset, so imputer and
//! scaler state is never shared between them.

use polars::prelude::DataFrame;

use super::config::TargetSpec;
use super::error::StageError;
use super::impute::{impute_median, ImputerParams};
use super::loader::{drop_all_missing_columns, is_numeric_column, numeric_feature_matrix, FeatureMatrix};
use super::scale::{min_max_scale, ScalerParams};
use super::target::{encode_classes, extract_target, ClassIndex, TargetResolution};

/// Scaled features aligned with their class labels.
#[derive(Debug, Clone)]
pub struct LabelledData {
    /// Scaled feature matrix; row `i` belongs to `classes.rows[i]` of the source.
    pub features: FeatureMatrix,
    pub target_column: String,
    pub resolution: TargetResolution,
    pub classes: ClassIndex,
    pub imputer: ImputerParams,
    pub scaler: ScalerParams,
    /// Non-numeric columns left out of the feature matrix.
    pub skipped_columns: Vec<String>,
}

impl LabelledData {
    /// Label of every row of `features`.
    pub fn labels(&self) -> Vec<String> {
        self.classes.row_labels()
    }
}

/// Run steps (a) to (c) of the supervised stages on a loaded dataset.
pub fn prepare_labelled(df: &DataFrame, spec: &TargetSpec) -> Result<LabelledData, StageError> {
    let df = drop_all_missing_columns(df)?;
    let target = extract_target(&df, spec)?;
    let classes = encode_classes(&target)?;

    let skipped_columns: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|col| col.name().as_str() != target.column && !is_numeric_column(col))
        .map(|col| col.name().to_string())
        .collect();
    if !skipped_columns.is_empty() {
        tracing::warn!(columns = ?skipped_columns, "non-numeric feature columns are excluded");
    }

    let matrix = numeric_feature_matrix(&df, Some(&target.column))?.select_rows(&classes.rows);
    let (imputed, imputer) = impute_median(&matrix)?;
    let (scaled, scaler) = min_max_scale(&imputed);

    Ok(LabelledData {
        features: FeatureMatrix::new(matrix.names, scaled),
        target_column: target.column,
        resolution: target.resolution,
        classes,
        imputer,
        scaler,
        skipped_columns,
    })
}
