//! Shared constants, stage identities and pipeline configuration

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Values treated as missing when a CSV is loaded. Every stage and the
/// preview read through this one set.
pub const MISSING_SENTINELS: [&str; 4] = ["", "NA", "NaN", "?"];

/// Target column used when none is given.
pub const DEFAULT_TARGET: &str = "Biopsy";

/// Default directory for stage artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// p-value threshold for ANOVA feature selection.
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Number of features kept when nothing reaches significance.
pub const DEFAULT_FALLBACK_TOP_K: usize = 10;

/// Seed for random undersampling.
pub const DEFAULT_SEED: u64 = 42;

/// Post-balance imbalance ratio at or below which classes count as balanced.
pub const BALANCED_RATIO_TOLERANCE: f64 = 1.05;

/// Rows used for CSV schema inference (0 = full scan).
pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 10_000;

/// The four pipeline stages, numbered as the orchestrator dispatches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Stage {
    MissingValues,
    Normalize,
    FeatureSelection,
    Balance,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::MissingValues,
        Stage::Normalize,
        Stage::FeatureSelection,
        Stage::Balance,
    ];

    pub fn number(self) -> u8 {
        match self {
            Stage::MissingValues => 1,
            Stage::Normalize => 2,
            Stage::FeatureSelection => 3,
            Stage::Balance => 4,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::MissingValues => "Missing Value Analysis",
            Stage::Normalize => "Min-Max Normalization",
            Stage::FeatureSelection => "ANOVA Feature Selection",
            Stage::Balance => "Class Balancing",
        }
    }

    /// File name of the stage's CSV artifact.
    pub fn csv_file_name(self) -> &'static str {
        match self {
            Stage::MissingValues => "1_missing_values_analysis.csv",
            Stage::Normalize => "2_scaled_data.csv",
            Stage::FeatureSelection => "3_selected_features.csv",
            Stage::Balance => "4_rus_cleaned_data.csv",
        }
    }

    /// File name of the stage's chart, for the stages that draw one.
    pub fn chart_file_name(self) -> Option<&'static str> {
        match self {
            Stage::FeatureSelection => Some("3_anova_selection.png"),
            Stage::Balance => Some("4_rus_balance.png"),
            _ => None,
        }
    }

    pub fn csv_path(self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.csv_file_name())
    }

    pub fn chart_path(self, output_dir: &Path) -> Option<PathBuf> {
        self.chart_file_name().map(|name| output_dir.join(name))
    }

    /// Whether the stage needs a target column.
    pub fn uses_target(self) -> bool {
        matches!(self, Stage::FeatureSelection | Stage::Balance)
    }
}

impl TryFrom<u8> for Stage {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Stage::MissingValues),
            2 => Ok(Stage::Normalize),
            3 => Ok(Stage::FeatureSelection),
            4 => Ok(Stage::Balance),
            other => Err(format!("Invalid process step: {} (expected 1-4)", other)),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// How the target column is chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpec {
    /// Requested column name.
    pub name: String,
    /// Fail instead of falling back to the last column when `name` is absent.
    pub strict: bool,
}

impl TargetSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET)
    }
}

/// Options for reading the source CSV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    pub infer_schema_length: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
        }
    }
}

/// Everything a stage needs besides the source path.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub target: TargetSpec,
    pub load: LoadOptions,
    pub significance_level: f64,
    pub fallback_top_k: usize,
    pub seed: u64,
}

impl PipelineConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: TargetSpec) -> Self {
        self.target = target;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            target: TargetSpec::default(),
            load: LoadOptions::default(),
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            fallback_top_k: DEFAULT_FALLBACK_TOP_K,
            seed: DEFAULT_SEED,
        }
    }
}
