//! prepline: preprocessing pipeline CLI
//!
//! Runs the missing value, normalization, feature selection and class
//! balancing stages on a CSV file and writes their artifacts.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use prepline::cli::{execute, Cli};

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    execute(&cli)
}
