//! Error types for the preprocessing stages.
//!
//! Every stage reports failures through [`StageError`]. The runner wraps a
//! stage failure in [`PipelineError`] so the caller always learns which of
//! the four stages failed and why.

use thiserror::Error;

use super::config::Stage;

/// Errors a single stage can raise.
#[derive(Debug, Error)]
pub enum StageError {
    /// The source file is missing, unreadable, not tabular, or has nothing
    /// left after dropping all-missing columns.
    #[error("LoadError: {0}")]
    Load(String),

    /// The target column cannot serve as a class label (absent in strict mode,
    /// fewer than two classes), or no feature can be ranked against it.
    #[error("SelectionError: {0}")]
    Selection(String),

    /// Numeric failure while imputing, scaling, scoring or resampling.
    #[error("ComputeError: {0}")]
    Compute(String),

    /// An output artifact (CSV or PNG) could not be written.
    #[error("ArtifactError: {0}")]
    Artifact(String),
}

impl StageError {
    pub fn load(message: impl Into<String>) -> Self {
        StageError::Load(message.into())
    }

    pub fn selection(message: impl Into<String>) -> Self {
        StageError::Selection(message.into())
    }

    pub fn compute(message: impl Into<String>) -> Self {
        StageError::Compute(message.into())
    }

    pub fn artifact(message: impl Into<String>) -> Self {
        StageError::Artifact(message.into())
    }

    /// Short category name used in JSON failure envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::Load(_) => "LoadError",
            StageError::Selection(_) => "SelectionError",
            StageError::Compute(_) => "ComputeError",
            StageError::Artifact(_) => "ArtifactError",
        }
    }
}

/// A stage failure labelled with the stage that produced it.
#[derive(Debug, Error)]
#[error("Stage {} ({}) failed: {source}", .stage.number(), .stage.title())]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: StageError) -> Self {
        Self { stage, source }
    }
}
