//! Terminal styling utilities

use std::path::Path;
use std::time::Duration;

use console::{style, Emoji};

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");

/// Print the application banner
pub fn print_banner(version: &str) {
    println!();
    println!(
        "    {} {}",
        style("prepline").cyan().bold(),
        style(format!("v{}", version)).dim()
    );
    println!(
        "    {}",
        style("missing values → min-max → ANOVA → undersampling").dim()
    );
    println!("    {}", style("━".repeat(50)).dim());
}

/// Print configuration card
pub fn print_config(input: &Path, target: &str, strict_target: bool, output_dir: &Path) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    println!();
    println!("    ┌{}┐", line);
    println!("    │ {:<width$}│", style("Configuration").cyan().bold(), width = box_width - 3);
    println!("    ├{}┤", line);
    println!("    │  {}Input:  {:<41}│", FOLDER, truncate_path(input, 40));
    let target = if strict_target {
        format!("{} (strict)", target)
    } else {
        target.to_string()
    };
    println!("    │  {}Target: {:<41}│", TARGET, truncate_string(&target, 40));
    println!("    │  {}Output: {:<41}│", SAVE, truncate_path(output_dir, 40));
    println!("    └{}┘", line);
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {}{}", INFO, message);
}

/// Print an error to stderr
pub fn print_error(message: &str) {
    eprintln!("    {} {}", style("✗").red().bold(), style(message).red());
}

/// Print elapsed time for a step
pub fn print_step_time(elapsed: Duration) {
    println!(
        "    {}",
        style(format!("⏱  {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion(completed: usize, requested: usize) {
    println!();
    println!(
        "    {}{}",
        ROCKET,
        style(format!("{} of {} stage(s) complete", completed, requested))
            .green()
            .bold()
    );
    println!();
}

// Helper functions

fn truncate_path(path: &Path, max_len: usize) -> String {
    truncate_string(&path.display().to_string(), max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("abcdefghijkl", 8), "...hijkl");
    }
}
