//! Command-line argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::pipeline::config::{
    PipelineConfig, Stage, TargetSpec, DEFAULT_FALLBACK_TOP_K, DEFAULT_OUTPUT_DIR, DEFAULT_SEED,
    DEFAULT_SIGNIFICANCE_LEVEL, DEFAULT_TARGET,
};
use crate::pipeline::LoadOptions;

/// prepline - missing values, min-max scaling, ANOVA selection and undersampling for CSV datasets
#[derive(Parser, Debug)]
#[command(name = "prepline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory where stage artifacts are written
    #[arg(short, long, global = true, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Print JSON envelopes instead of styled tables
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Number of rows to use for schema inference.
    /// Use 0 for full table scan.
    #[arg(long, global = true, default_value = "10000")]
    pub infer_schema_length: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show shape, column types, missing counts and the first rows of a dataset
    Preview(InputArgs),

    /// Step 1: count missing values per column
    Missing(InputArgs),

    /// Step 2: median-impute and min-max scale the numeric columns
    Normalize(InputArgs),

    /// Step 3: select features with the ANOVA F-test
    Select {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        target: TargetArgs,

        /// p-value below which a feature is selected
        #[arg(long, default_value_t = DEFAULT_SIGNIFICANCE_LEVEL, value_parser = validate_significance)]
        significance: f64,

        /// Features kept when none reach significance
        #[arg(long, default_value_t = DEFAULT_FALLBACK_TOP_K, value_parser = validate_top_k)]
        top_k: usize,
    },

    /// Step 4: balance classes by random undersampling
    Balance {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        target: TargetArgs,

        /// Seed for the undersampling generator
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },

    /// Run several steps in order, stopping at the first failure
    Run {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        target: TargetArgs,

        /// Steps to run (comma-separated, 1-4)
        #[arg(long, value_delimiter = ',', default_values_t = Stage::ALL.to_vec(), value_parser = parse_step)]
        steps: Vec<Stage>,

        /// Seed for the undersampling generator
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Also write a JSON report of the run to the output directory
        #[arg(long, default_value = "false")]
        export_report: bool,
    },

    /// Show which step artifacts exist in the output directory
    Status,
}

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Input CSV file
    #[arg(short, long)]
    pub input: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Target column name. When absent from the dataset the last column is used.
    #[arg(short, long, default_value = DEFAULT_TARGET)]
    pub target: String,

    /// Fail instead of falling back to the last column
    #[arg(long, default_value = "false")]
    pub strict_target: bool,
}

impl TargetArgs {
    pub fn spec(&self) -> TargetSpec {
        TargetSpec::new(self.target.clone()).strict(self.strict_target)
    }
}

impl Cli {
    /// Pipeline configuration from the global flags and the command's own.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.output_dir.clone());
        config.load = LoadOptions {
            infer_schema_length: self.infer_schema_length,
        };

        match &self.command {
            Commands::Select {
                target,
                significance,
                top_k,
                ..
            } => {
                config.target = target.spec();
                config.significance_level = *significance;
                config.fallback_top_k = *top_k;
            }
            Commands::Balance { target, seed, .. } | Commands::Run { target, seed, .. } => {
                config.target = target.spec();
                config.seed = *seed;
            }
            _ => {}
        }
        config
    }
}

/// Parser for a step number
fn parse_step(s: &str) -> Result<Stage, String> {
    let value: u8 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a valid step number", s))?;
    Stage::try_from(value)
}

/// Validator for the significance level
fn validate_significance(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "significance must be between 0.0 and 1.0 (exclusive), got {}",
            value
        ))
    }
}

/// Validator for the fallback feature count
fn validate_top_k(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;

    if value == 0 {
        Err("top-k must be at least 1".to_string())
    } else {
        Ok(value)
    }
}
