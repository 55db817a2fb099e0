//! Console summaries of stage results

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;
use serde_json::Value;

use crate::pipeline::anova::FeatureSelectionReport;
use crate::pipeline::balance::BalanceReport;
use crate::pipeline::loader::DatasetPreview;
use crate::pipeline::missing::MissingValueReport;
use crate::pipeline::normalize::NormalizeReport;
use crate::pipeline::runner::{PipelineStatus, StageOutcome};
use crate::pipeline::target::TargetResolution;

/// Print the console summary matching a stage outcome.
pub fn display_outcome(outcome: &StageOutcome) {
    match outcome {
        StageOutcome::MissingValues(report) => display_missing(report),
        StageOutcome::Normalize(report) => display_normalize(report),
        StageOutcome::FeatureSelection(report) => display_selection(report),
        StageOutcome::Balance(report) => display_balance(report),
    }
}

pub fn display_preview(preview: &DatasetPreview) {
    section("🔎", "DATASET PREVIEW");
    println!(
        "      Rows: {}   Columns: {}",
        style(preview.shape[0]).yellow().bold(),
        style(preview.shape[1]).yellow().bold()
    );
    println!();

    let mut table = new_table(&["Column", "Type", "Missing"]);
    for column in &preview.columns {
        let missing = preview
            .missing_values
            .get(column)
            .and_then(Value::as_u64)
            .unwrap_or(0);
        table.add_row(vec![
            Cell::new(column),
            Cell::new(preview.dtypes.get(column).map(plain).unwrap_or_default()),
            count_cell(missing as usize, Color::Yellow),
        ]);
    }
    print_indented(&table);
}

pub fn display_missing(report: &MissingValueReport) {
    section("📋", "MISSING VALUES");

    if report.missing_summary.is_empty() {
        println!("      {}", style("No missing values found").green());
        return;
    }

    let mut table = new_table(&["Feature", "Missing", "Percent"]);
    for entry in &report.sample_output {
        table.add_row(vec![
            Cell::new(&entry.feature),
            count_cell(entry.missing_count, Color::Yellow),
            Cell::new(format!("{:.1}%", entry.missing_percentage)),
        ]);
    }
    print_indented(&table);

    if report.total_missing_features > report.sample_output.len() {
        println!(
            "      {}",
            style(format!(
                "... {} more in {}",
                report.total_missing_features - report.sample_output.len(),
                report.output_file.display()
            ))
            .dim()
        );
    }
}

pub fn display_normalize(report: &NormalizeReport) {
    section("📏", "MIN-MAX NORMALIZATION");

    let mut table = new_table(&["Feature", "Original Min", "Original Max", "Range"]);
    for row in &report.feature_comparison {
        table.add_row(vec![
            Cell::new(&row.feature),
            Cell::new(format!("{:.4}", row.original_min)),
            Cell::new(format!("{:.4}", row.original_max)),
            Cell::new(&row.range_reduction),
        ]);
    }
    print_indented(&table);

    let stats = &report.summary_stats;
    println!(
        "      Scaled {} feature(s) over {} row(s) to {}",
        style(stats.features_scaled).yellow().bold(),
        stats.total_rows,
        stats.scaling_range
    );
    if stats.imputed_values > 0 {
        println!(
            "      Imputed {} missing value(s) with column medians",
            style(stats.imputed_values).yellow()
        );
    }
}

pub fn display_selection(report: &FeatureSelectionReport) {
    section("🧪", "ANOVA FEATURE SELECTION");
    print_resolution(
        &report.summary_stats.target_column,
        report.summary_stats.target_resolution,
    );

    let mut table = new_table(&["Feature", "F-score", "p-value", "Status"]);
    for row in &report.feature_analysis_table {
        let status = Cell::new(row.significance).fg(match row.significance {
            "Significant" => Color::Green,
            "Undefined" => Color::DarkGrey,
            _ => Color::White,
        });
        let feature = if row.selected {
            Cell::new(&row.feature)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold)
        } else {
            Cell::new(&row.feature)
        };
        table.add_row(vec![
            feature,
            Cell::new(format_float(row.f_score, 4)),
            Cell::new(format_float(row.p_value, 6)),
            status,
        ]);
    }
    print_indented(&table);

    let stats = &report.summary_stats;
    println!(
        "      Selected {} of {} feature(s) ({}) by {}",
        style(stats.features_selected).green().bold(),
        stats.total_features_analyzed,
        stats.selection_rate,
        style(&stats.selection_criteria).dim()
    );
    println!(
        "      Chart: {}",
        style(report.chart_file.display()).dim()
    );
}

pub fn display_balance(report: &BalanceReport) {
    section("⚖️ ", "CLASS BALANCING");
    print_resolution(
        &report.summary_stats.target_column,
        report.summary_stats.target_resolution,
    );

    let mut table = new_table(&["Class", "Before", "After", "Change"]);
    for row in &report.distribution_comparison {
        table.add_row(vec![
            Cell::new(plain(&row.class)),
            Cell::new(row.before),
            Cell::new(row.after).fg(Color::Green),
            Cell::new(&row.percentage_change),
        ]);
    }
    print_indented(&table);

    let stats = &report.summary_stats;
    println!(
        "      Samples: {} → {}   Status: {}",
        stats.total_samples_before,
        style(stats.total_samples_after).green().bold(),
        style(&stats.balancing_status).cyan()
    );
    println!(
        "      Chart: {}",
        style(report.chart_file.display()).dim()
    );
}

pub fn display_status(status: &PipelineStatus) {
    section("📂", "PIPELINE STATUS");
    println!("      Output directory: {}", style(status.output_dir.display()).dim());
    println!();

    let mut table = new_table(&["Step", "Stage", "Artifact", "Done"]);
    for stage in &status.stages {
        table.add_row(vec![
            Cell::new(stage.step),
            Cell::new(stage.title),
            Cell::new(stage.filename),
            if stage.completed {
                Cell::new("yes").fg(Color::Green)
            } else {
                Cell::new("no").fg(Color::DarkGrey)
            },
        ]);
    }
    print_indented(&table);
}

// Helper functions

fn section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_resolution(column: &str, resolution: TargetResolution) {
    match resolution {
        TargetResolution::Named => println!("      Target: {}", style(column).cyan()),
        TargetResolution::FallbackLastColumn => println!(
            "      Target: {} {}",
            style(column).yellow(),
            style("(requested column not found, using last column)").yellow()
        ),
    }
    println!();
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        header
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn count_cell(count: usize, highlight: Color) -> Cell {
    Cell::new(count).fg(if count == 0 { Color::White } else { highlight })
}

fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_float(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else if value.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.*}", decimals, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(f64::NAN, 4), "n/a");
        assert_eq!(format_float(f64::INFINITY, 4), "inf");
        assert_eq!(format_float(0.123456, 3), "0.123");
    }

    #[test]
    fn test_plain_strips_quotes() {
        assert_eq!(plain(&serde_json::json!("int64")), "int64");
        assert_eq!(plain(&serde_json::json!(1)), "1");
    }
}
