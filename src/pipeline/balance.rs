//! Stage 4: class balancing by random undersampling
//!
//! Every class larger than the minority class is sampled without replacement
//! down to the minority count. The minority class keeps all of its rows.
//! Sampling draws from a single seeded Xoshiro256+ stream, visiting classes in
//! sorted order, so the same input and seed always give the same rows.

use std::path::{Path, PathBuf};

use rand::seq::index;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use serde::Serialize;
use serde_json::Value;

use super::artifacts::{append_label_column, ensure_output_dir, matrix_frame, stage_csv};
use super::config::{PipelineConfig, Stage, BALANCED_RATIO_TOLERANCE};
use super::error::StageError;
use super::loader::{load_dataset, FeatureMatrix};
use super::prepare::prepare_labelled;
use super::target::{ClassIndex, TargetResolution};
use crate::report::chart::{self, BarPanel, AFTER, BEFORE};
use crate::report::payload::{self, Record};

/// Rows shown in the output sample table.
const SAMPLE_ROWS: usize = 10;
/// Feature columns shown in the output sample table.
const SAMPLE_FEATURES: usize = 8;

/// Class counts before and after balancing.
#[derive(Debug, Clone, Serialize)]
pub struct ClassDistribution {
    pub class: Value,
    pub before: usize,
    pub after: usize,
    pub change: i64,
    pub percentage_change: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceSummary {
    pub total_samples_before: usize,
    pub total_samples_after: usize,
    pub samples_removed: usize,
    pub features: usize,
    pub classes: Vec<Value>,
    pub target_column: String,
    pub target_resolution: TargetResolution,
    pub skipped_columns: Vec<String>,
    #[serde(serialize_with = "payload::serialize_finite")]
    pub original_imbalance_ratio: f64,
    #[serde(serialize_with = "payload::serialize_finite")]
    pub new_imbalance_ratio: f64,
    pub balancing_status: String,
    pub seed: u64,
}

/// Result of the class balancing stage.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceReport {
    pub message: String,
    pub output_file: PathBuf,
    pub chart_file: PathBuf,
    pub chart_base64: String,
    pub distribution_comparison: Vec<ClassDistribution>,
    pub sample_output_table: Vec<Record>,
    pub summary_stats: BalanceSummary,
}

/// Pick the rows that survive undersampling.
///
/// Returns positions into `classes.assignments`, grouped by class in class
/// order and in original order within each class.
pub fn undersample(classes: &ClassIndex, seed: u64) -> Vec<usize> {
    let counts = classes.counts();
    let minority = counts.iter().copied().filter(|&c| c > 0).min().unwrap_or(0);
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);

    let mut kept = Vec::with_capacity(minority * counts.len());
    for class in 0..classes.classes.len() {
        let members: Vec<usize> = classes
            .assignments
            .iter()
            .enumerate()
            .filter(|(_, assigned)| **assigned == class)
            .map(|(pos, _)| pos)
            .collect();

        if members.len() <= minority {
            kept.extend(members);
            continue;
        }

        let mut picks = index::sample(&mut rng, members.len(), minority).into_vec();
        picks.sort_unstable();
        kept.extend(picks.into_iter().map(|p| members[p]));
    }
    kept
}

/// Majority count over minority count; NaN when a class is empty.
pub fn imbalance_ratio(counts: &[usize]) -> f64 {
    let max = counts.iter().copied().max().unwrap_or(0);
    let min = counts.iter().copied().min().unwrap_or(0);
    if min == 0 {
        return f64::NAN;
    }
    max as f64 / min as f64
}

/// `"Balanced"` within tolerance, else `"Ratio: r:1"`.
pub fn balancing_status(ratio: f64) -> String {
    if ratio <= BALANCED_RATIO_TOLERANCE {
        "Balanced".to_string()
    } else {
        format!("Ratio: {:.2}:1", ratio)
    }
}

/// Before/after table, one row per class.
pub fn distribution_table(classes: &[String], before: &[usize], after: &[usize]) -> Vec<ClassDistribution> {
    classes
        .iter()
        .zip(before.iter().zip(after))
        .map(|(class, (&before, &after))| {
            let change = after as i64 - before as i64;
            let percentage_change = if before == 0 {
                "New samples".to_string()
            } else {
                payload::percent_label(change as f64, before as f64)
            };
            ClassDistribution {
                class: payload::label_value(class),
                before,
                after,
                change,
                percentage_change,
            }
        })
        .collect()
}

fn sample_output(features: &FeatureMatrix, target: &str, labels: &[String]) -> Vec<Record> {
    let shown = features.ncols().min(SAMPLE_FEATURES);
    features
        .values
        .rows()
        .into_iter()
        .zip(labels)
        .take(SAMPLE_ROWS)
        .enumerate()
        .map(|(idx, (row, label))| {
            let mut record = payload::sample_row(idx);
            for (name, value) in features.names.iter().zip(row.iter()).take(shown) {
                record.insert(name.clone(), payload::number(*value));
            }
            record.insert(target.to_string(), payload::label_value(label));
            record
        })
        .collect()
}

fn render_balance_chart(
    path: &Path,
    classes: &[String],
    before: &[usize],
    after: &[usize],
) -> Result<chart::RenderedChart, StageError> {
    let as_heights = |counts: &[usize]| counts.iter().map(|&c| c as f64).collect::<Vec<_>>();

    chart::render_bar_panels(
        path,
        &[
            BarPanel {
                title: "Class Distribution Before RUS",
                y_label: "Samples",
                labels: classes,
                heights: as_heights(before),
                colors: vec![BEFORE; classes.len()],
                reference_line: None,
                annotate: true,
            },
            BarPanel {
                title: "Class Distribution After RUS",
                y_label: "Samples",
                labels: classes,
                heights: as_heights(after),
                colors: vec![AFTER; classes.len()],
                reference_line: None,
                annotate: true,
            },
        ],
    )
}

/// Run stage 4 on the CSV at `input`.
pub fn run_balance_stage(input: &Path, config: &PipelineConfig) -> Result<BalanceReport, StageError> {
    let df = load_dataset(input, config.load)?;
    let data = prepare_labelled(&df, &config.target)?;

    let kept = undersample(&data.classes, config.seed);
    let balanced = data.features.select_rows(&kept);
    let labels: Vec<String> = kept
        .iter()
        .map(|&pos| data.classes.classes[data.classes.assignments[pos]].clone())
        .collect();

    let before = data.classes.counts();
    let mut after = vec![0usize; before.len()];
    for &pos in &kept {
        after[data.classes.assignments[pos]] += 1;
    }

    ensure_output_dir(&config.output_dir)?;
    let output_file = Stage::Balance.csv_path(&config.output_dir);
    let mut table = matrix_frame(&balanced.names, &balanced.values)?;
    append_label_column(&mut table, &data.target_column, &labels)?;
    let staged = stage_csv(&mut table, &output_file)?;

    let chart_path = Stage::Balance
        .chart_path(&config.output_dir)
        .ok_or_else(|| StageError::artifact("Class balancing has no chart path"))?;
    let rendered = render_balance_chart(&chart_path, &data.classes.classes, &before, &after)?;
    staged.commit()?;

    let original_ratio = imbalance_ratio(&before);
    let new_ratio = imbalance_ratio(&after);
    let total_before = data.features.nrows();

    tracing::info!(
        before = total_before,
        after = kept.len(),
        classes = data.classes.classes.len(),
        seed = config.seed,
        output = %output_file.display(),
        "class balancing complete"
    );

    Ok(BalanceReport {
        message: "Random undersampling completed".to_string(),
        output_file,
        chart_base64: rendered.data_uri(),
        chart_file: rendered.path,
        distribution_comparison: distribution_table(&data.classes.classes, &before, &after),
        sample_output_table: sample_output(&balanced, &data.target_column, &labels),
        summary_stats: BalanceSummary {
            total_samples_before: total_before,
            total_samples_after: kept.len(),
            samples_removed: total_before - kept.len(),
            features: balanced.ncols(),
            classes: data
                .classes
                .classes
                .iter()
                .map(|c| payload::label_value(c))
                .collect(),
            target_column: data.target_column.clone(),
            target_resolution: data.resolution,
            skipped_columns: data.skipped_columns.clone(),
            original_imbalance_ratio: original_ratio,
            new_imbalance_ratio: new_ratio,
            balancing_status: balancing_status(new_ratio),
            seed: config.seed,
        },
    })
}
