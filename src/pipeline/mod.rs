//! Pipeline module - the four preprocessing stages and their shared parts

pub mod anova;
pub mod artifacts;
pub mod balance;
pub mod config;
pub mod error;
pub mod impute;
pub mod loader;
pub mod missing;
pub mod normalize;
pub mod prepare;
pub mod runner;
pub mod scale;
pub mod target;

pub use anova::{f_classif, run_selection_stage, select_features, AnovaScore, FeatureSelectionReport};
pub use balance::{run_balance_stage, undersample, BalanceReport};
pub use config::*;
pub use error::{PipelineError, StageError};
pub use loader::{load_dataset, preview_dataset, DatasetPreview, FeatureMatrix};
pub use missing::{analyze_missing_values, run_missing_stage, MissingEntry, MissingValueReport};
pub use normalize::{run_normalize_stage, NormalizeReport};
pub use runner::*;
pub use target::{TargetResolution, TargetVector};
