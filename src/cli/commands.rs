//! Command execution: runs stages and renders their results

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::Serialize;

use super::args::{Cli, Commands};
use crate::pipeline::{
    load_dataset, pipeline_status, preview_dataset, run_stages, PipelineConfig, PipelineError,
    Stage, StageObserver, StageOutcome, StageResponse,
};
use crate::report::{display_outcome, display_preview, display_status, export_run_report, RUN_REPORT_FILE};
use crate::utils::{
    create_spinner, finish_with_failure, finish_with_success, print_banner, print_completion,
    print_config, print_error, print_info, print_step_header, print_step_time, print_success,
};

/// Envelope for results that do not belong to a stage.
#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    result: T,
}

#[derive(Serialize)]
struct Failure {
    success: bool,
    error: String,
}

/// Execute the parsed command line.
pub fn execute(cli: &Cli) -> Result<ExitCode> {
    let config = cli.pipeline_config();

    match &cli.command {
        Commands::Preview(args) => preview(&args.input, &config, cli.json),
        Commands::Missing(args) => single_stage(Stage::MissingValues, &args.input, &config, cli.json),
        Commands::Normalize(args) => single_stage(Stage::Normalize, &args.input, &config, cli.json),
        Commands::Select { input, .. } => {
            single_stage(Stage::FeatureSelection, &input.input, &config, cli.json)
        }
        Commands::Balance { input, .. } => single_stage(Stage::Balance, &input.input, &config, cli.json),
        Commands::Run {
            input,
            steps,
            export_report,
            ..
        } => run_pipeline(steps, &input.input, &config, cli.json, *export_report),
        Commands::Status => status(&config, cli.json),
    }
}

fn preview(input: &Path, config: &PipelineConfig, json: bool) -> Result<ExitCode> {
    let preview = load_dataset(input, config.load).and_then(|df| preview_dataset(&df));

    match (preview, json) {
        (Ok(preview), true) => print_json(&Envelope {
            success: true,
            result: &preview,
        })?,
        (Ok(preview), false) => display_preview(&preview),
        (Err(e), true) => {
            print_json(&Failure {
                success: false,
                error: e.to_string(),
            })?;
            return Ok(ExitCode::FAILURE);
        }
        (Err(e), false) => return Err(e.into()),
    }
    Ok(ExitCode::SUCCESS)
}

fn single_stage(stage: Stage, input: &Path, config: &PipelineConfig, json: bool) -> Result<ExitCode> {
    if !json {
        print_banner(env!("CARGO_PKG_VERSION"));
        print_target(stage, input, config);
    }

    let mut responses = execute_stages(&[stage], input, config, json);
    let success = responses.iter().all(StageResponse::is_success);
    if let (true, Some(response)) = (json, responses.pop()) {
        print_json(&response)?;
    }
    Ok(exit_code(success))
}

fn run_pipeline(
    steps: &[Stage],
    input: &Path,
    config: &PipelineConfig,
    json: bool,
    export_report: bool,
) -> Result<ExitCode> {
    if !json {
        print_banner(env!("CARGO_PKG_VERSION"));
        print_config(input, &config.target.name, config.target.strict, &config.output_dir);
    }

    let responses = execute_stages(steps, input, config, json);
    let completed = responses.iter().filter(|r| r.is_success()).count();
    let success = completed == responses.len();

    if export_report {
        let path = config.output_dir.join(RUN_REPORT_FILE);
        std::fs::create_dir_all(&config.output_dir).with_context(|| {
            format!("Failed to create output directory {}", config.output_dir.display())
        })?;
        let requested: Vec<u8> = steps.iter().map(|s| s.number()).collect();
        export_run_report(&responses, &requested, input, config, &path)?;
        if !json {
            print_success(&format!("Run report written to {}", path.display()));
        }
    }

    if json {
        print_json(&responses)?;
    } else if success {
        print_completion(completed, steps.len());
    }
    Ok(exit_code(success))
}

fn status(config: &PipelineConfig, json: bool) -> Result<ExitCode> {
    let status = pipeline_status(&config.output_dir);
    if json {
        print_json(&Envelope {
            success: true,
            result: &status,
        })?;
    } else {
        display_status(&status);
    }
    Ok(ExitCode::SUCCESS)
}

/// Spinner, step header and console summary around each stage.
struct ConsoleObserver {
    json: bool,
    running: Option<(ProgressBar, Instant)>,
}

impl StageObserver for ConsoleObserver {
    fn stage_started(&mut self, stage: Stage) {
        if !self.json {
            print_step_header(stage.number(), stage.title());
        }
        let spinner = create_spinner(&format!("Running {}...", stage.title()), self.json);
        self.running = Some((spinner, Instant::now()));
    }

    fn stage_finished(&mut self, stage: Stage, result: &Result<StageOutcome, PipelineError>) {
        let Some((spinner, start)) = self.running.take() else {
            return;
        };

        match result {
            Ok(outcome) => {
                finish_with_success(
                    &spinner,
                    &format!("Saved {}", outcome.output_file().display()),
                );
                if !self.json {
                    display_outcome(outcome);
                    print_step_time(start.elapsed());
                }
            }
            Err(e) => {
                finish_with_failure(&spinner, &format!("Stage {} failed", stage.number()));
                if !self.json {
                    print_error(&e.to_string());
                }
            }
        }
    }
}

/// Run `stages` in order with console progress; one envelope per attempted
/// stage.
fn execute_stages(
    stages: &[Stage],
    input: &Path,
    config: &PipelineConfig,
    json: bool,
) -> Vec<StageResponse> {
    let mut observer = ConsoleObserver {
        json,
        running: None,
    };
    let (outcomes, failure) = run_stages(stages, input, config, &mut observer);
    StageResponse::from_run(outcomes, failure)
}

fn print_target(stage: Stage, input: &Path, config: &PipelineConfig) {
    if stage.uses_target() {
        print_config(input, &config.target.name, config.target.strict, &config.output_dir);
    } else {
        print_info(&format!("Input: {}", input.display()));
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result to JSON")?;
    println!("{}", json);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
