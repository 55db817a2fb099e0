//! CLI module - argument parsing and command execution

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, InputArgs, TargetArgs};
pub use commands::execute;
