//! JSON export of a pipeline run

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{PipelineConfig, StageResponse};

/// File name of the run report inside the output directory.
pub const RUN_REPORT_FILE: &str = "pipeline_report.json";

/// Metadata about the run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub prepline_version: String,
    pub input_file: String,
    pub output_dir: String,
    /// Requested target column (the resolved one is in each stage result)
    pub target_column: String,
    pub strict_target: bool,
    pub significance_level: f64,
    pub fallback_top_k: usize,
    pub seed: u64,
}

#[derive(Serialize)]
pub struct RunSummary {
    pub stages_requested: Vec<u8>,
    pub stages_completed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<u8>,
}

/// Complete run export
#[derive(Serialize)]
pub struct RunReport<'a> {
    pub metadata: RunMetadata,
    pub summary: RunSummary,
    pub results: &'a [StageResponse],
}

/// Write the envelopes of a run, with metadata, to `output_path`.
pub fn export_run_report(
    responses: &[StageResponse],
    requested: &[u8],
    input: &Path,
    config: &PipelineConfig,
    output_path: &Path,
) -> Result<()> {
    let failed_stage = responses.iter().find_map(|r| match r {
        StageResponse::Failure { step, .. } => Some(*step),
        StageResponse::Success { .. } => None,
    });

    let report = RunReport {
        metadata: RunMetadata {
            timestamp: Utc::now().to_rfc3339(),
            prepline_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: input.display().to_string(),
            output_dir: config.output_dir.display().to_string(),
            target_column: config.target.name.clone(),
            strict_target: config.target.strict,
            significance_level: config.significance_level,
            fallback_top_k: config.fallback_top_k,
            seed: config.seed,
        },
        summary: RunSummary {
            stages_requested: requested.to_vec(),
            stages_completed: responses.iter().filter(|r| r.is_success()).count(),
            failed_stage,
        },
        results: responses,
    };

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize run report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write run report to {}", output_path.display()))?;

    Ok(())
}
