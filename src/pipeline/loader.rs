//! Dataset loading and numeric feature extraction

use std::path::Path;

use ndarray::{Array2, Axis};
use polars::prelude::*;
use serde::Serialize;
use serde_json::Value;

use super::config::{LoadOptions, MISSING_SENTINELS};
use super::error::StageError;
use crate::report::payload::{self, Record};

/// Rows shown in a dataset preview.
const PREVIEW_ROWS: usize = 5;

/// Numeric columns of a dataset as a dense matrix. `NaN` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(names: Vec<String>, values: Array2<f64>) -> Self {
        debug_assert_eq!(names.len(), values.ncols());
        Self { names, values }
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Keep only the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> FeatureMatrix {
        let values = Array2::from_shape_fn((rows.len(), self.ncols()), |(i, j)| {
            self.values[[rows[i], j]]
        });
        FeatureMatrix::new(self.names.clone(), values)
    }

    /// Keep only the given columns, in the given order.
    pub fn select_columns(&self, columns: &[usize]) -> FeatureMatrix {
        let names = columns.iter().map(|&c| self.names[c].clone()).collect();
        FeatureMatrix::new(names, self.values.select(Axis(1), columns))
    }
}

/// Load a CSV dataset, mapping every missing-value sentinel to null.
pub fn load_dataset(path: &Path, options: LoadOptions) -> Result<DataFrame, StageError> {
    if !path.is_file() {
        return Err(StageError::load(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if extension != "csv" {
        return Err(StageError::load(format!(
            "Unsupported file format: '{}'. Only CSV files are supported",
            extension
        )));
    }

    let schema_length = if options.infer_schema_length == 0 {
        None
    } else {
        Some(options.infer_schema_length)
    };

    let null_values = NullValues::AllColumns(
        MISSING_SENTINELS
            .iter()
            .map(|s| PlSmallStr::from(*s))
            .collect(),
    );

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(schema_length)
        .with_null_values(Some(null_values))
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| {
            StageError::load(format!("Failed to load CSV file {}: {}", path.display(), e))
        })?;

    if df.width() == 0 {
        return Err(StageError::load(format!(
            "{} contains no columns",
            path.display()
        )));
    }
    if df.height() == 0 {
        return Err(StageError::load(format!(
            "{} contains no data rows",
            path.display()
        )));
    }

    tracing::debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "dataset loaded"
    );

    Ok(df)
}

/// Drop every column whose values are all missing.
pub fn drop_all_missing_columns(df: &DataFrame) -> Result<DataFrame, StageError> {
    let (kept, dropped): (Vec<&Column>, Vec<&Column>) = df
        .get_columns()
        .iter()
        .partition(|col| col.null_count() < col.len());

    if !dropped.is_empty() {
        tracing::info!(
            columns = ?dropped.iter().map(|c| c.name().as_str()).collect::<Vec<_>>(),
            "dropping all-missing columns"
        );
    }

    if kept.is_empty() {
        return Err(StageError::load(
            "Dataset is empty after dropping all-missing columns",
        ));
    }

    DataFrame::new(kept.into_iter().cloned().collect())
        .map_err(|e| StageError::load(format!("Failed to rebuild dataset: {}", e)))
}

/// Whether a column holds numbers (booleans and strings do not count).
pub fn is_numeric_column(col: &Column) -> bool {
    col.dtype().is_primitive_numeric()
}

/// Read a numeric column as optional floats.
pub fn column_as_f64(col: &Column) -> PolarsResult<Vec<Option<f64>>> {
    let cast = col.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Build the numeric feature matrix, in table order, skipping `exclude`.
pub fn numeric_feature_matrix(
    df: &DataFrame,
    exclude: Option<&str>,
) -> Result<FeatureMatrix, StageError> {
    let mut names = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for col in df.get_columns() {
        let name = col.name().as_str();
        if Some(name) == exclude {
            continue;
        }
        if !is_numeric_column(col) {
            tracing::debug!(column = name, dtype = %col.dtype(), "skipping non-numeric column");
            continue;
        }

        let values = column_as_f64(col).map_err(|e| {
            StageError::compute(format!("Failed to read column '{}' as numbers: {}", name, e))
        })?;
        names.push(name.to_string());
        columns.push(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect());
    }

    if names.is_empty() {
        return Err(StageError::compute("Dataset has no numeric feature columns"));
    }

    let values = Array2::from_shape_fn((df.height(), columns.len()), |(row, col)| {
        columns[col][row]
    });

    Ok(FeatureMatrix::new(names, values))
}

/// Shape, types, missing counts and the first rows of a dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetPreview {
    pub shape: [usize; 2],
    pub columns: Vec<String>,
    pub sample_data: Vec<Record>,
    pub dtypes: Record,
    pub missing_values: Record,
}

/// Summarize a freshly loaded dataset for display before any stage runs.
pub fn preview_dataset(df: &DataFrame) -> Result<DatasetPreview, StageError> {
    let head = df.head(Some(PREVIEW_ROWS));
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut cells: Vec<Vec<Value>> = Vec::with_capacity(columns.len());
    for col in head.get_columns() {
        let values = column_json_values(col).map_err(|e| {
            StageError::load(format!("Failed to read column '{}': {}", col.name(), e))
        })?;
        cells.push(values);
    }

    let sample_data = (0..head.height())
        .map(|row| {
            columns
                .iter()
                .zip(cells.iter())
                .map(|(name, values)| (name.clone(), values[row].clone()))
                .collect::<Record>()
        })
        .collect();

    let mut dtypes = Record::new();
    let mut missing_values = Record::new();
    for col in df.get_columns() {
        let name = col.name().to_string();
        dtypes.insert(name.clone(), Value::String(col.dtype().to_string()));
        missing_values.insert(name, Value::from(col.null_count()));
    }

    Ok(DatasetPreview {
        shape: [df.height(), df.width()],
        columns,
        sample_data,
        dtypes,
        missing_values,
    })
}

/// Convert a column to JSON values, keeping integers integral.
fn column_json_values(col: &Column) -> PolarsResult<Vec<Value>> {
    let values = match col.dtype() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(Value::from).unwrap_or(Value::Null))
                .collect()
        }
        dtype if dtype.is_primitive_numeric() => column_as_f64(col)?
            .into_iter()
            .map(payload::optional_number)
            .collect(),
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(Value::Bool).unwrap_or(Value::Null))
            .collect(),
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| Value::String(s.to_string())).unwrap_or(Value::Null))
                .collect()
        }
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_all_missing_columns() {
        let df = df! {
            "a" => [1.0f64, 2.0, 3.0],
            "empty" => [None::<f64>, None, None],
            "b" => [Some(1i32), None, Some(3)],
        }
        .unwrap();

        let cleaned = drop_all_missing_columns(&df).unwrap();
        assert_eq!(cleaned.get_column_names(), &["a", "b"]);
    }

    #[test]
    fn test_drop_all_missing_columns_leaves_nothing() {
        let df = df! {
            "empty" => [None::<f64>, None],
        }
        .unwrap();

        let err = drop_all_missing_columns(&df).unwrap_err();
        assert!(matches!(err, StageError::Load(_)));
    }

    #[test]
    fn test_numeric_feature_matrix_skips_strings_and_excluded() {
        let df = df! {
            "x" => [1.0f64, 2.0, 3.0],
            "label" => ["a", "b", "c"],
            "y" => [Some(4i64), None, Some(6)],
            "target" => [0i32, 1, 0],
        }
        .unwrap();

        let matrix = numeric_feature_matrix(&df, Some("target")).unwrap();
        assert_eq!(matrix.names, vec!["x", "y"]);
        assert_eq!(matrix.nrows(), 3);
        assert_eq!(matrix.values[[0, 1]], 4.0);
        assert!(matrix.values[[1, 1]].is_nan());
    }

    #[test]
    fn test_numeric_feature_matrix_without_numbers() {
        let df = df! {
            "label" => ["a", "b"],
        }
        .unwrap();

        let err = numeric_feature_matrix(&df, None).unwrap_err();
        assert!(matches!(err, StageError::Compute(_)));
    }

    #[test]
    fn test_select_rows() {
        let df = df! {
            "x" => [1.0f64, 2.0, 3.0],
        }
        .unwrap();
        let matrix = numeric_feature_matrix(&df, None).unwrap();

        let picked = matrix.select_rows(&[2, 0]);
        assert_eq!(picked.values.column(0).to_vec(), vec![3.0, 1.0]);
    }

    #[test]
    fn test_select_columns() {
        let df = df! {
            "x" => [1.0f64, 2.0],
            "y" => [3.0f64, 4.0],
            "z" => [5.0f64, 6.0],
        }
        .unwrap();
        let matrix = numeric_feature_matrix(&df, None).unwrap();

        let picked = matrix.select_columns(&[0, 2]);
        assert_eq!(picked.names, vec!["x", "z"]);
        assert_eq!(picked.values.row(1).to_vec(), vec![2.0, 6.0]);
    }

    #[test]
    fn test_preview_dataset() {
        let df = df! {
            "count" => [Some(1i64), None, Some(3)],
            "ratio" => [0.5f64, 1.5, 2.5],
            "name" => ["a", "b", "c"],
        }
        .unwrap();

        let preview = preview_dataset(&df).unwrap();
        assert_eq!(preview.shape, [3, 3]);
        assert_eq!(preview.columns, vec!["count", "ratio", "name"]);
        assert_eq!(preview.sample_data.len(), 3);
        assert_eq!(preview.sample_data[0]["count"], serde_json::json!(1));
        assert_eq!(preview.sample_data[1]["count"], Value::Null);
        assert_eq!(preview.sample_data[2]["name"], serde_json::json!("c"));
        assert_eq!(preview.missing_values["count"], serde_json::json!(1));
        assert_eq!(preview.missing_values["ratio"], serde_json::json!(0));
    }
}
