//! Stage 3: one-way ANOVA feature selection
//!
//! Each scaled feature is scored with the ANOVA F-test against the target
//! classes. Features significant at the configured level are kept; when none
//! are, the `top_k` features with the smallest defined p-values are kept
//! instead. A feature whose p-value is undefined is never selected.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Axis};
use serde::Serialize;
use statrs::function::beta::beta_reg;

use super::artifacts::{append_label_column, ensure_output_dir, matrix_frame, stage_csv};
use super::config::{PipelineConfig, Stage};
use super::error::StageError;
use super::loader::{load_dataset, FeatureMatrix};
use super::prepare::{prepare_labelled, LabelledData};
use super::target::TargetResolution;
use crate::report::chart::{self, BarPanel, HIGHLIGHT, NEUTRAL};
use crate::report::payload::{self, Record};

/// Rows shown in the output sample table.
const SAMPLE_ROWS: usize = 5;

/// F-statistic and p-value of one feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnovaScore {
    pub f_score: f64,
    pub p_value: f64,
}

/// Which rule produced the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionRule {
    /// Every feature below the significance level.
    Significance,
    /// Nothing was significant; the best `top_k` defined p-values.
    TopK,
}

/// Selected feature indices, in original column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub indices: Vec<usize>,
    pub rule: SelectionRule,
}

/// One row of the feature ranking table.
#[derive(Debug, Clone, Serialize)]
pub struct RankedFeature {
    pub feature: String,
    #[serde(serialize_with = "payload::serialize_finite")]
    pub p_value: f64,
    #[serde(serialize_with = "payload::serialize_finite")]
    pub f_score: f64,
    pub selected: bool,
    pub significance: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectedFeatureSummary {
    pub rank: usize,
    pub feature: String,
    #[serde(serialize_with = "payload::serialize_finite")]
    pub f_score: f64,
    #[serde(serialize_with = "payload::serialize_finite")]
    pub p_value: f64,
    pub significance: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionSummary {
    pub total_features_analyzed: usize,
    pub features_selected: usize,
    pub selection_criteria: String,
    pub selection_rule: SelectionRule,
    pub target_column: String,
    pub target_resolution: TargetResolution,
    pub skipped_columns: Vec<String>,
    pub selection_rate: String,
}

/// Result of the feature selection stage.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSelectionReport {
    pub message: String,
    pub output_file: PathBuf,
    pub chart_file: PathBuf,
    pub chart_base64: String,
    pub selected_features: Vec<String>,
    pub feature_analysis_table: Vec<RankedFeature>,
    pub selected_features_summary: Vec<SelectedFeatureSummary>,
    pub sample_output_table: Vec<Record>,
    pub summary_stats: SelectionSummary,
}

/// One-way ANOVA F-test of every column of `features` against class
/// assignments `classes` (values in `0..n_classes`).
///
/// A zero-variance column yields NaN for both values. A column whose classes
/// are perfectly separated yields an infinite F and a p-value of 0. With no
/// more rows than classes the test is undefined.
pub fn f_classif(features: &Array2<f64>, classes: &[usize], n_classes: usize) -> Vec<AnovaScore> {
    let n = features.nrows();
    let undefined = AnovaScore {
        f_score: f64::NAN,
        p_value: f64::NAN,
    };
    if n <= n_classes || n_classes < 2 || classes.len() != n {
        return vec![undefined; features.ncols()];
    }

    let mut class_sizes = vec![0usize; n_classes];
    for &class in classes {
        class_sizes[class] += 1;
    }

    let df_between = (n_classes - 1) as f64;
    let df_within = (n - n_classes) as f64;

    features
        .axis_iter(Axis(1))
        .map(|column| {
            let mut class_sums = vec![0.0; n_classes];
            let mut sum = 0.0;
            let mut sum_sq = 0.0;
            for (&x, &class) in column.iter().zip(classes) {
                class_sums[class] += x;
                sum += x;
                sum_sq += x * x;
            }

            let correction = sum * sum / n as f64;
            let ss_total = sum_sq - correction;
            let ss_between = class_sums
                .iter()
                .zip(&class_sizes)
                .filter(|(_, size)| **size > 0)
                .map(|(s, &size)| s * s / size as f64)
                .sum::<f64>()
                - correction;
            let ss_within = (ss_total - ss_between).max(0.0);

            let f_score = (ss_between / df_between) / (ss_within / df_within);
            AnovaScore {
                f_score,
                p_value: f_upper_tail(f_score, df_between, df_within),
            }
        })
        .collect()
}

/// P[X > f] for X ~ F(d1, d2).
fn f_upper_tail(f: f64, d1: f64, d2: f64) -> f64 {
    if f.is_nan() || d1 <= 0.0 || d2 <= 0.0 {
        return f64::NAN;
    }
    if f == f64::INFINITY {
        return 0.0;
    }
    if f <= 0.0 {
        return 1.0;
    }
    let x = d2 / (d2 + d1 * f);
    beta_reg(d2 / 2.0, d1 / 2.0, x.clamp(0.0, 1.0))
}

/// Choose features from their scores.
pub fn select_features(
    scores: &[AnovaScore],
    significance_level: f64,
    top_k: usize,
) -> Result<Selection, StageError> {
    let defined: Vec<usize> = (0..scores.len())
        .filter(|&i| scores[i].p_value.is_finite())
        .collect();
    if defined.is_empty() {
        return Err(StageError::selection(
            "No feature has a defined ANOVA p-value; every feature is constant or there are too few rows",
        ));
    }

    let significant: Vec<usize> = defined
        .iter()
        .copied()
        .filter(|&i| scores[i].p_value < significance_level)
        .collect();
    if !significant.is_empty() {
        return Ok(Selection {
            indices: significant,
            rule: SelectionRule::Significance,
        });
    }

    let mut ranked = defined;
    ranked.sort_by(|&a, &b| scores[a].p_value.total_cmp(&scores[b].p_value));
    ranked.truncate(top_k);
    ranked.sort_unstable();

    tracing::info!(
        kept = ranked.len(),
        "no feature reached significance, keeping the best p-values"
    );

    Ok(Selection {
        indices: ranked,
        rule: SelectionRule::TopK,
    })
}

/// Ascending p-value order; undefined p-values last, ties in column order.
fn by_p_value(a: f64, b: f64) -> Ordering {
    match (a.is_finite(), b.is_finite()) {
        (true, true) => a.total_cmp(&b),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

fn significance_label(p_value: f64, significance_level: f64) -> &'static str {
    if !p_value.is_finite() {
        "Undefined"
    } else if p_value < significance_level {
        "Significant"
    } else {
        "Not Significant"
    }
}

/// Ranking table over every analyzed feature.
pub fn rank_features(
    names: &[String],
    scores: &[AnovaScore],
    selection: &Selection,
    significance_level: f64,
) -> Vec<RankedFeature> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| by_p_value(scores[a].p_value, scores[b].p_value));

    order
        .into_iter()
        .map(|idx| RankedFeature {
            feature: names[idx].clone(),
            p_value: scores[idx].p_value,
            f_score: scores[idx].f_score,
            selected: selection.indices.contains(&idx),
            significance: significance_label(scores[idx].p_value, significance_level),
        })
        .collect()
}

fn summarize_selected(
    names: &[String],
    scores: &[AnovaScore],
    selection: &Selection,
    significance_level: f64,
) -> Vec<SelectedFeatureSummary> {
    let mut order = selection.indices.clone();
    order.sort_by(|&a, &b| by_p_value(scores[a].p_value, scores[b].p_value));

    order
        .into_iter()
        .enumerate()
        .map(|(rank, idx)| {
            let p_value = scores[idx].p_value;
            let significance = if p_value < significance_level {
                format!("p < {}", significance_level)
            } else {
                format!("p ≥ {}", significance_level)
            };
            SelectedFeatureSummary {
                rank: rank + 1,
                feature: names[idx].clone(),
                f_score: scores[idx].f_score,
                p_value,
                significance,
            }
        })
        .collect()
}

/// First rows of the selected features plus the target label.
fn sample_output(selected: &FeatureMatrix, target: &str, labels: &[String]) -> Vec<Record> {
    selected
        .values
        .rows()
        .into_iter()
        .zip(labels)
        .take(SAMPLE_ROWS)
        .enumerate()
        .map(|(idx, (row, label))| {
            let mut record = payload::sample_row(idx);
            for (name, value) in selected.names.iter().zip(row.iter()) {
                record.insert(name.clone(), payload::number(*value));
            }
            record.insert(target.to_string(), payload::label_value(label));
            record
        })
        .collect()
}

fn render_selection_chart(
    path: &Path,
    names: &[String],
    scores: &[AnovaScore],
    selection: &Selection,
    significance_level: f64,
) -> Result<chart::RenderedChart, StageError> {
    let colors: Vec<_> = (0..names.len())
        .map(|idx| {
            if selection.indices.contains(&idx) {
                HIGHLIGHT
            } else {
                NEUTRAL
            }
        })
        .collect();
    let neg_log_p: Vec<f64> = scores.iter().map(|s| -s.p_value.log10()).collect();
    let f_scores: Vec<f64> = scores.iter().map(|s| s.f_score).collect();

    chart::render_bar_panels(
        path,
        &[
            BarPanel {
                title: "ANOVA p-values (-log10)",
                y_label: "-log10(p-value)",
                labels: names,
                heights: chart::plottable_heights(&neg_log_p),
                colors: colors.clone(),
                reference_line: Some(-significance_level.log10()),
                annotate: false,
            },
            BarPanel {
                title: "ANOVA F-scores",
                y_label: "F-score",
                labels: names,
                heights: chart::plottable_heights(&f_scores),
                colors,
                reference_line: None,
                annotate: false,
            },
        ],
    )
}

/// Score and select features of already prepared data.
pub fn score_and_select(
    data: &LabelledData,
    config: &PipelineConfig,
) -> Result<(Vec<AnovaScore>, Selection), StageError> {
    let scores = f_classif(
        &data.features.values,
        &data.classes.assignments,
        data.classes.classes.len(),
    );
    let selection = select_features(&scores, config.significance_level, config.fallback_top_k)?;
    Ok((scores, selection))
}

/// Run stage 3 on the CSV at `input`.
pub fn run_selection_stage(
    input: &Path,
    config: &PipelineConfig,
) -> Result<FeatureSelectionReport, StageError> {
    let df = load_dataset(input, config.load)?;
    let data = prepare_labelled(&df, &config.target)?;
    let (scores, selection) = score_and_select(&data, config)?;

    let selected = data.features.select_columns(&selection.indices);
    let labels = data.labels();

    ensure_output_dir(&config.output_dir)?;
    let output_file = Stage::FeatureSelection.csv_path(&config.output_dir);
    let mut table = matrix_frame(&selected.names, &selected.values)?;
    append_label_column(&mut table, &data.target_column, &labels)?;
    let staged = stage_csv(&mut table, &output_file)?;

    let chart_path = Stage::FeatureSelection
        .chart_path(&config.output_dir)
        .ok_or_else(|| StageError::artifact("Feature selection has no chart path"))?;
    let rendered = render_selection_chart(
        &chart_path,
        &data.features.names,
        &scores,
        &selection,
        config.significance_level,
    )?;
    staged.commit()?;

    let names = &data.features.names;
    tracing::info!(
        analyzed = names.len(),
        selected = selection.indices.len(),
        rule = ?selection.rule,
        output = %output_file.display(),
        "feature selection complete"
    );

    Ok(FeatureSelectionReport {
        message: "ANOVA feature selection completed".to_string(),
        output_file,
        chart_base64: rendered.data_uri(),
        chart_file: rendered.path,
        selected_features: selected.names.clone(),
        feature_analysis_table: rank_features(names, &scores, &selection, config.significance_level),
        selected_features_summary: summarize_selected(
            names,
            &scores,
            &selection,
            config.significance_level,
        ),
        sample_output_table: sample_output(&selected, &data.target_column, &labels),
        summary_stats: SelectionSummary {
            total_features_analyzed: names.len(),
            features_selected: selection.indices.len(),
            selection_criteria: format!(
                "p-value < {} or top {}",
                config.significance_level, config.fallback_top_k
            ),
            selection_rule: selection.rule,
            target_column: data.target_column.clone(),
            target_resolution: data.resolution,
            skipped_columns: data.skipped_columns.clone(),
            selection_rate: payload::percent_label(
                selection.indices.len() as f64,
                names.len() as f64,
            ),
        },
    })
}
