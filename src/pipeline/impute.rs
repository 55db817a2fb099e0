//! Column-median imputation
//!
//! Fitted fresh by every stage that imputes; no fitted state is shared
//! between stages.

use ndarray::{Array2, Axis};
use serde::Serialize;

use super::error::StageError;
use super::loader::FeatureMatrix;

/// Medians fitted on one matrix, one per column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImputerParams {
    pub medians: Vec<f64>,
    /// Number of cells replaced in each column.
    pub filled: Vec<usize>,
}

/// Median of the non-NaN values, or `None` when there are none.
pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut observed: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if observed.is_empty() {
        return None;
    }
    observed.sort_by(|a, b| a.total_cmp(b));

    let mid = observed.len() / 2;
    if observed.len() % 2 == 0 {
        Some((observed[mid - 1] + observed[mid]) / 2.0)
    } else {
        Some(observed[mid])
    }
}

/// Replace every NaN with its column's median.
///
/// Fails with a ComputeError when a column has no observed value, since no
/// median exists for it.
pub fn impute_median(matrix: &FeatureMatrix) -> Result<(Array2<f64>, ImputerParams), StageError> {
    let mut imputed = matrix.values.clone();
    let mut medians = Vec::with_capacity(matrix.ncols());
    let mut filled = Vec::with_capacity(matrix.ncols());

    for (idx, mut column) in imputed.axis_iter_mut(Axis(1)).enumerate() {
        let fill = median(column.iter().copied()).ok_or_else(|| {
            StageError::compute(format!(
                "Column '{}' has no observed values to impute from",
                matrix.names[idx]
            ))
        })?;

        let mut count = 0;
        for value in column.iter_mut().filter(|v| v.is_nan()) {
            *value = fill;
            count += 1;
        }
        medians.push(fill);
        filled.push(count);
    }

    tracing::debug!(columns = medians.len(), filled = filled.iter().sum::<usize>(), "median imputation fitted");

    Ok((imputed, ImputerParams { medians, filled }))
}
