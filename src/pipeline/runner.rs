//! Stage dispatch and pipeline status
//!
//! Stages are independent: each re-reads the source file, so any subset can
//! run in any order. A failure is labelled with the stage that raised it.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::anova::{run_selection_stage, FeatureSelectionReport};
use super::balance::{run_balance_stage, BalanceReport};
use super::config::{PipelineConfig, Stage};
use super::error::PipelineError;
use super::missing::{run_missing_stage, MissingValueReport};
use super::normalize::{run_normalize_stage, NormalizeReport};

/// Payload of a successful stage.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StageOutcome {
    MissingValues(MissingValueReport),
    Normalize(NormalizeReport),
    FeatureSelection(FeatureSelectionReport),
    Balance(BalanceReport),
}

impl StageOutcome {
    pub fn stage(&self) -> Stage {
        match self {
            StageOutcome::MissingValues(_) => Stage::MissingValues,
            StageOutcome::Normalize(_) => Stage::Normalize,
            StageOutcome::FeatureSelection(_) => Stage::FeatureSelection,
            StageOutcome::Balance(_) => Stage::Balance,
        }
    }

    /// CSV artifact written by the stage.
    pub fn output_file(&self) -> &Path {
        match self {
            StageOutcome::MissingValues(r) => &r.output_file,
            StageOutcome::Normalize(r) => &r.output_file,
            StageOutcome::FeatureSelection(r) => &r.output_file,
            StageOutcome::Balance(r) => &r.output_file,
        }
    }
}

/// Run one stage against the CSV at `input`.
pub fn run_stage(
    stage: Stage,
    input: &Path,
    config: &PipelineConfig,
) -> Result<StageOutcome, PipelineError> {
    tracing::info!(stage = stage.number(), title = stage.title(), input = %input.display(), "running stage");

    let outcome = match stage {
        Stage::MissingValues => run_missing_stage(input, config).map(StageOutcome::MissingValues),
        Stage::Normalize => run_normalize_stage(input, config).map(StageOutcome::Normalize),
        Stage::FeatureSelection => {
            run_selection_stage(input, config).map(StageOutcome::FeatureSelection)
        }
        Stage::Balance => run_balance_stage(input, config).map(StageOutcome::Balance),
    };

    outcome.map_err(|source| {
        tracing::error!(stage = stage.number(), error = %source, "stage failed");
        PipelineError::new(stage, source)
    })
}

/// Hooks around each stage of a sequential run.
pub trait StageObserver {
    fn stage_started(&mut self, _stage: Stage) {}

    fn stage_finished(&mut self, _stage: Stage, _result: &Result<StageOutcome, PipelineError>) {}
}

/// Runs without progress reporting.
impl StageObserver for () {}

/// Run several stages in order, stopping at the first failure.
///
/// Returns the outcomes of the stages that completed and, if one failed, its
/// error.
pub fn run_stages(
    stages: &[Stage],
    input: &Path,
    config: &PipelineConfig,
    observer: &mut dyn StageObserver,
) -> (Vec<StageOutcome>, Option<PipelineError>) {
    let mut outcomes = Vec::with_capacity(stages.len());
    for &stage in stages {
        observer.stage_started(stage);
        let result = run_stage(stage, input, config);
        observer.stage_finished(stage, &result);
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => return (outcomes, Some(e)),
        }
    }
    (outcomes, None)
}

/// JSON envelope around a stage result.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StageResponse {
    Success {
        success: bool,
        step: u8,
        result: StageOutcome,
    },
    Failure {
        success: bool,
        step: u8,
        error: String,
        error_kind: &'static str,
    },
}

impl StageResponse {
    /// Envelopes for the result of [`run_stages`], in run order.
    pub fn from_run(outcomes: Vec<StageOutcome>, failure: Option<PipelineError>) -> Vec<Self> {
        let mut responses: Vec<Self> = outcomes
            .into_iter()
            .map(|outcome| Self::from_result(outcome.stage(), Ok(outcome)))
            .collect();
        if let Some(e) = failure {
            responses.push(Self::from_result(e.stage, Err(e)));
        }
        responses
    }

    pub fn from_result(stage: Stage, result: Result<StageOutcome, PipelineError>) -> Self {
        match result {
            Ok(result) => StageResponse::Success {
                success: true,
                step: stage.number(),
                result,
            },
            Err(e) => StageResponse::Failure {
                success: false,
                step: stage.number(),
                error_kind: e.source.kind(),
                error: e.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageResponse::Success { .. })
    }
}

/// Whether one stage's CSV artifact exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageStatus {
    pub step: u8,
    pub title: &'static str,
    pub completed: bool,
    pub filename: &'static str,
    pub path: PathBuf,
}

/// Artifact status of all four stages.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub output_dir: PathBuf,
    pub stages: Vec<StageStatus>,
}

impl PipelineStatus {
    pub fn completed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.completed).count()
    }
}

/// Check which stage artifacts exist in `output_dir`.
pub fn pipeline_status(output_dir: &Path) -> PipelineStatus {
    let stages = Stage::ALL
        .iter()
        .map(|&stage| {
            let path = stage.csv_path(output_dir);
            StageStatus {
                step: stage.number(),
                title: stage.title(),
                completed: path.is_file(),
                filename: stage.csv_file_name(),
                path,
            }
        })
        .collect();

    PipelineStatus {
        output_dir: output_dir.to_path_buf(),
        stages,
    }
}
