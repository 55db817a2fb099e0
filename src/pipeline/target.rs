//! Target column resolution and class labelling
//!
//! The feature selection and balancing stages both need a class label per
//! row. The target column is looked up by name (default `"Biopsy"`). When the
//! name is absent the last column of the table is used instead; this fallback
//! is logged and reported so a mismatched dataset never changes semantics
//! silently, and strict mode turns it into an error.

use std::cmp::Ordering;

use polars::prelude::*;
use serde::Serialize;

use super::config::TargetSpec;
use super::error::StageError;

/// How the target column was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetResolution {
    /// The requested column exists.
    Named,
    /// The requested column is absent; the last column stands in.
    FallbackLastColumn,
}

/// Class labels of the target column, one per row (`None` = missing).
#[derive(Debug, Clone)]
pub struct TargetVector {
    pub column: String,
    pub resolution: TargetResolution,
    pub labels: Vec<Option<String>>,
}

/// Target labels encoded against a sorted class list.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassIndex {
    /// Distinct labels, numerically sorted when every label is a number.
    pub classes: Vec<String>,
    /// Rows with a label, as indices into the original table.
    pub rows: Vec<usize>,
    /// Class index of each kept row.
    pub assignments: Vec<usize>,
}

impl ClassIndex {
    /// Number of rows per class, aligned with `classes`.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.classes.len()];
        for &class in &self.assignments {
            counts[class] += 1;
        }
        counts
    }

    /// Label of each kept row.
    pub fn row_labels(&self) -> Vec<String> {
        self.assignments
            .iter()
            .map(|&class| self.classes[class].clone())
            .collect()
    }
}

/// Pick the target column name according to `spec`.
pub fn resolve_target(
    df: &DataFrame,
    spec: &TargetSpec,
) -> Result<(String, TargetResolution), StageError> {
    let names = df.get_column_names();
    if names.iter().any(|n| n.as_str() == spec.name) {
        return Ok((spec.name.clone(), TargetResolution::Named));
    }

    if spec.strict {
        return Err(StageError::selection(format!(
            "Target column '{}' not found in dataset. Available columns: {:?}",
            spec.name,
            names.iter().map(|n| n.as_str()).collect::<Vec<_>>()
        )));
    }

    let last = names
        .last()
        .ok_or_else(|| StageError::selection("Dataset has no columns to use as target"))?;
    tracing::warn!(
        requested = %spec.name,
        fallback = %last,
        "target column not found, falling back to the last column"
    );
    Ok((last.to_string(), TargetResolution::FallbackLastColumn))
}

/// Resolve the target column and read its labels.
pub fn extract_target(df: &DataFrame, spec: &TargetSpec) -> Result<TargetVector, StageError> {
    let (column, resolution) = resolve_target(df, spec)?;
    let col = df
        .column(&column)
        .map_err(|e| StageError::selection(format!("Target column '{}': {}", column, e)))?;

    if col.null_count() == col.len() {
        return Err(StageError::selection(format!(
            "Target column '{}' contains only missing values",
            column
        )));
    }

    let labels = column_to_string_vec(col).map_err(|e| {
        StageError::selection(format!("Failed to read target column '{}': {}", column, e))
    })?;

    Ok(TargetVector {
        column,
        resolution,
        labels,
    })
}

/// Encode labels into classes, dropping rows without a label.
///
/// Fails with a SelectionError when fewer than two distinct classes remain.
pub fn encode_classes(target: &TargetVector) -> Result<ClassIndex, StageError> {
    let mut classes: Vec<String> = target.labels.iter().flatten().cloned().collect();
    sort_class_labels(&mut classes);
    classes.dedup();

    if classes.len() < 2 {
        return Err(StageError::selection(format!(
            "Target column '{}' needs at least two distinct classes, found {}",
            target.column,
            classes.len()
        )));
    }

    let mut rows = Vec::with_capacity(target.labels.len());
    let mut assignments = Vec::with_capacity(target.labels.len());
    for (row, label) in target.labels.iter().enumerate() {
        if let Some(label) = label {
            // classes is sorted with the same comparator, so binary search holds
            if let Ok(class) = classes.binary_search_by(|c| compare_labels(c, label)) {
                rows.push(row);
                assignments.push(class);
            }
        }
    }

    let skipped = target.labels.len() - rows.len();
    if skipped > 0 {
        tracing::warn!(
            column = %target.column,
            skipped,
            "rows with a missing target label are excluded"
        );
    }

    Ok(ClassIndex {
        classes,
        rows,
        assignments,
    })
}

/// Sort labels numerically when all of them are numbers, otherwise as text.
pub fn sort_class_labels(labels: &mut [String]) {
    labels.sort_by(|a, b| compare_labels(a, b));
}

fn compare_labels(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Convert a column to a Vec of Option<String> labels
fn column_to_string_vec(col: &Column) -> PolarsResult<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.filter(|n| !n.is_nan()).map(|n| format!("{}", n)))
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_named_target() {
        let df = df! {
            "feature" => [1.0f64, 2.0],
            "Biopsy" => [0i32, 1],
        }
        .unwrap();

        let (name, resolution) = resolve_target(&df, &TargetSpec::default()).unwrap();
        assert_eq!(name, "Biopsy");
        assert_eq!(resolution, TargetResolution::Named);
    }

    #[test]
    fn test_resolve_falls_back_to_last_column() {
        let df = df! {
            "feature" => [1.0f64, 2.0],
            "label" => [0i32, 1],
        }
        .unwrap();

        let (name, resolution) = resolve_target(&df, &TargetSpec::default()).unwrap();
        assert_eq!(name, "label");
        assert_eq!(resolution, TargetResolution::FallbackLastColumn);
    }

    #[test]
    fn test_strict_target_refuses_fallback() {
        let df = df! {
            "feature" => [1.0f64, 2.0],
            "label" => [0i32, 1],
        }
        .unwrap();

        let spec = TargetSpec::new("Biopsy").strict(true);
        let err = resolve_target(&df, &spec).unwrap_err();
        assert!(matches!(err, StageError::Selection(_)));
        assert!(err.to_string().contains("Biopsy"));
    }

    #[test]
    fn test_encode_classes_sorted_numerically() {
        let df = df! {
            "target" => [10i32, 2, 10, 1, 2],
        }
        .unwrap();

        let target = extract_target(&df, &TargetSpec::new("target")).unwrap();
        let classes = encode_classes(&target).unwrap();
        assert_eq!(classes.classes, vec!["1", "2", "10"]);
        assert_eq!(classes.assignments, vec![2, 1, 2, 0, 1]);
        assert_eq!(classes.counts(), vec![1, 2, 2]);
    }

    #[test]
    fn test_encode_classes_string_labels() {
        let df = df! {
            "target" => ["yes", "no", "yes"],
        }
        .unwrap();

        let target = extract_target(&df, &TargetSpec::new("target")).unwrap();
        let classes = encode_classes(&target).unwrap();
        assert_eq!(classes.classes, vec!["no", "yes"]);
        assert_eq!(classes.row_labels(), vec!["yes", "no", "yes"]);
    }

    #[test]
    fn test_encode_classes_skips_missing_labels() {
        let df = df! {
            "target" => [Some(0i32), None, Some(1), Some(0)],
        }
        .unwrap();

        let target = extract_target(&df, &TargetSpec::new("target")).unwrap();
        let classes = encode_classes(&target).unwrap();
        assert_eq!(classes.rows, vec![0, 2, 3]);
        assert_eq!(classes.counts(), vec![2, 1]);
    }

    #[test]
    fn test_single_class_is_selection_error() {
        let df = df! {
            "target" => [1i32, 1, 1],
        }
        .unwrap();

        let target = extract_target(&df, &TargetSpec::new("target")).unwrap();
        let err = encode_classes(&target).unwrap_err();
        assert!(matches!(err, StageError::Selection(_)));
    }

    #[test]
    fn test_all_missing_target_is_selection_error() {
        let df = df! {
            "target" => [None::<i32>, None],
        }
        .unwrap();

        let err = extract_target(&df, &TargetSpec::new("target")).unwrap_err();
        assert!(matches!(err, StageError::Selection(_)));
    }
}
