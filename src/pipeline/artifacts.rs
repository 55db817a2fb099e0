//! Stage artifact persistence
//!
//! Artifacts are written to a temporary file in the output directory and
//! renamed into place, so a reader never observes a partially written CSV or
//! PNG. Two concurrent writers of the same stage still resolve as
//! last-write-wins.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use polars::prelude::*;
use tempfile::NamedTempFile;

use super::error::StageError;

/// Create the output directory if it does not exist yet.
pub fn ensure_output_dir(dir: &Path) -> Result<(), StageError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        StageError::artifact(format!(
            "Failed to create output directory {}: {}",
            dir.display(),
            e
        ))
    })
}

/// A CSV written to a temporary file beside its final path.
///
/// Nothing appears at the final path until [`StagedFile::commit`]; dropping
/// the value removes the temporary file.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    /// Move the file into place, replacing any previous artifact.
    pub fn commit(self) -> Result<PathBuf, StageError> {
        persist(self.tmp, &self.path)?;
        Ok(self.path)
    }
}

/// Write a DataFrame as CSV (with header) to a temporary file for `path`.
pub fn stage_csv(df: &mut DataFrame, path: &Path) -> Result<StagedFile, StageError> {
    let mut tmp = temp_file_beside(path, ".csv")?;
    CsvWriter::new(tmp.as_file_mut())
        .include_header(true)
        .finish(df)
        .map_err(|e| {
            StageError::artifact(format!("Failed to write CSV file {}: {}", path.display(), e))
        })?;
    Ok(StagedFile {
        tmp,
        path: path.to_path_buf(),
    })
}

/// Write a DataFrame as CSV (with header) to `path`, replacing any previous file.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), StageError> {
    stage_csv(df, path)?.commit()?;
    Ok(())
}

/// Build a DataFrame from named float columns.
pub fn matrix_frame(names: &[String], values: &Array2<f64>) -> Result<DataFrame, StageError> {
    let columns: Vec<Column> = names
        .iter()
        .zip(values.columns())
        .map(|(name, column)| Column::new(name.as_str().into(), column.to_vec()))
        .collect();
    DataFrame::new(columns)
        .map_err(|e| StageError::artifact(format!("Failed to assemble output table: {}", e)))
}

/// Append a string column (class labels) to a DataFrame.
pub fn append_label_column(
    df: &mut DataFrame,
    name: &str,
    labels: &[String],
) -> Result<(), StageError> {
    let values: Vec<&str> = labels.iter().map(String::as_str).collect();
    let column = Column::new(name.into(), values);
    df.with_column(column).map_err(|e| {
        StageError::artifact(format!("Failed to append column '{}': {}", name, e))
    })?;
    Ok(())
}

/// Temporary file in the same directory as `path`, so the final rename stays
/// on one filesystem.
pub(crate) fn temp_file_beside(path: &Path, suffix: &str) -> Result<NamedTempFile, StageError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tempfile::Builder::new()
        .prefix(".prepline-")
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(|e| {
            StageError::artifact(format!(
                "Failed to create temporary file in {}: {}",
                dir.display(),
                e
            ))
        })
}

pub(crate) fn persist(tmp: NamedTempFile, path: &Path) -> Result<(), StageError> {
    tmp.persist(path).map_err(|e| {
        StageError::artifact(format!("Failed to move artifact into {}: {}", path.display(), e))
    })?;
    tracing::debug!(path = %path.display(), "artifact written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use tempfile::TempDir;

    #[test]
    fn test_write_csv_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale contents\n").unwrap();

        let mut df = matrix_frame(
            &["a".to_string(), "b".to_string()],
            &arr2(&[[0.0, 1.0], [0.5, 0.25]]),
        )
        .unwrap();
        write_csv(&mut df, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("a,b\n"));
        assert!(!written.contains("stale"));
    }

    #[test]
    fn test_append_label_column() {
        let mut df = matrix_frame(&["x".to_string()], &arr2(&[[0.0], [1.0]])).unwrap();
        append_label_column(&mut df, "target", &["0".to_string(), "1".to_string()]).unwrap();
        assert_eq!(df.get_column_names(), &["x", "target"]);
    }

    #[test]
    fn test_staged_csv_appears_only_on_commit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut df = matrix_frame(&["x".to_string()], &arr2(&[[1.0]])).unwrap();

        let staged = stage_csv(&mut df, &path).unwrap();
        assert!(!path.exists());
        assert_eq!(staged.commit().unwrap(), path);
        assert!(path.is_file());
    }

    #[test]
    fn test_dropped_staged_csv_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut df = matrix_frame(&["x".to_string()], &arr2(&[[1.0]])).unwrap();

        drop(stage_csv(&mut df, &path).unwrap());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_ensure_output_dir_nested() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_output_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
