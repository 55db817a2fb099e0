//! prepline: tabular preprocessing pipeline
//!
//! Four independent stages over a CSV dataset: missing value analysis,
//! min-max normalization, ANOVA feature selection and class balancing by
//! random undersampling. Each stage re-reads the source file and writes its
//! own artifacts.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
