//! Tests for random undersampling

use prepline::pipeline::{run_balance_stage, Stage, StageError};

#[path = "common/mod.rs"]
mod common;

fn class_counts(labels: &[f64]) -> (usize, usize) {
    let zeros = labels.iter().filter(|&&v| v == 0.0).count();
    (zeros, labels.len() - zeros)
}

#[test]
fn test_balance_equalizes_to_minority() {
    let mut df = common::create_labelled_dataframe();
    let (dir, path) = common::create_temp_csv(&mut df);
    let config = common::config_in(dir.path());

    let report = run_balance_stage(&path, &config).unwrap();
    let balanced = common::read_csv(&Stage::Balance.csv_path(&config.output_dir));

    common::assert_shape(&balanced, 8, 5);
    common::assert_has_columns(&balanced, &["Age", "Marker", "Noise", "Flat", "Biopsy"]);
    common::assert_missing_columns(&balanced, &["Clinic"]);

    let labels = common::column_f64(&balanced, "Biopsy");
    assert_eq!(class_counts(&labels), (4, 4));
    // grouped by class, in class order
    assert!(labels[..4].iter().all(|&v| v == 0.0));
    assert!(labels[4..].iter().all(|&v| v == 1.0));

    let stats = &report.summary_stats;
    assert_eq!(stats.total_samples_before, 16);
    assert_eq!(stats.total_samples_after, 8);
    assert_eq!(stats.balancing_status, "Balanced");
    assert!((stats.original_imbalance_ratio - 3.0).abs() < 1e-12);
    assert_eq!(stats.new_imbalance_ratio, 1.0);
}

#[test]
fn test_minority_rows_are_kept_in_order() {
    let mut df = common::create_labelled_dataframe();
    let (dir, path) = common::create_temp_csv(&mut df);
    let config = common::config_in(dir.path());

    run_balance_stage(&path, &config).unwrap();
    let balanced = common::read_csv(&Stage::Balance.csv_path(&config.output_dir));

    // Marker for class 1 is 8.9, 9.2, 9.0, 8.8 scaled against min 0.8 and max 9.2
    let marker = common::column_f64(&balanced, "Marker");
    let expected: Vec<f64> = [8.9, 9.2, 9.0, 8.8]
        .iter()
        .map(|v| (v - 0.8) / (9.2 - 0.8))
        .collect();
    for (got, want) in marker[4..].iter().zip(&expected) {
        assert!((got - want).abs() < 1e-9, "{} vs {}", got, want);
    }
}

#[test]
fn test_same_seed_gives_identical_csv() {
    let mut df = common::create_labelled_dataframe();
    let (dir, path) = common::create_temp_csv(&mut df);
    let config = common::config_in(dir.path());

    let first = run_balance_stage(&path, &config).unwrap();
    let first_bytes = std::fs::read(&first.output_file).unwrap();
    let second = run_balance_stage(&path, &config).unwrap();
    let second_bytes = std::fs::read(&second.output_file).unwrap();

    assert_eq!(first_bytes, second_bytes);
}

#[test]
fn test_distribution_table_and_chart() {
    let mut df = common::create_labelled_dataframe();
    let (dir, path) = common::create_temp_csv(&mut df);

    let report = run_balance_stage(&path, &common::config_in(dir.path())).unwrap();

    let majority = &report.distribution_comparison[0];
    assert_eq!(majority.class, serde_json::json!(0));
    assert_eq!(majority.before, 12);
    assert_eq!(majority.after, 4);
    assert_eq!(majority.change, -8);
    assert_eq!(majority.percentage_change, "-66.7%");

    let minority = &report.distribution_comparison[1];
    assert_eq!(minority.percentage_change, "0.0%");

    assert!(report.chart_file.ends_with("4_rus_balance.png"));
    assert!(report.chart_file.is_file());
    assert_eq!(report.sample_output_table.len(), 8);
}

#[test]
fn test_string_labels_balance() {
    let (dir, path) = common::write_csv_text(
        "labels.csv",
        "x,Biopsy\n1,yes\n2,no\n3,no\n4,no\n5,yes\n6,no\n",
    );
    let config = common::config_in(dir.path());

    let report = run_balance_stage(&path, &config).unwrap();
    assert_eq!(report.summary_stats.classes, vec![serde_json::json!("no"), serde_json::json!("yes")]);
    assert_eq!(report.summary_stats.total_samples_after, 4);

    let text = std::fs::read_to_string(&report.output_file).unwrap();
    let labels: Vec<&str> = text
        .lines()
        .skip(1)
        .map(|line| line.rsplit(',').next().unwrap())
        .collect();
    assert_eq!(labels, vec!["no", "no", "yes", "yes"]);
}

#[test]
fn test_unlabelled_rows_are_excluded() {
    let (dir, path) = common::write_csv_text(
        "gaps.csv",
        "x,Biopsy\n1,0\n2,?\n3,1\n4,0\n5,NA\n6,1\n",
    );
    let report = run_balance_stage(&path, &common::config_in(dir.path())).unwrap();

    assert_eq!(report.summary_stats.total_samples_before, 4);
    assert_eq!(report.summary_stats.total_samples_after, 4);
}

#[test]
fn test_single_class_is_selection_error() {
    let (dir, path) = common::write_csv_text("one.csv", "x,Biopsy\n1,0\n2,0\n");
    let err = run_balance_stage(&path, &common::config_in(dir.path())).unwrap_err();
    assert!(matches!(err, StageError::Selection(_)));
}

#[test]
fn test_chart_failure_leaves_no_csv() {
    let mut df = common::create_labelled_dataframe();
    let (dir, path) = common::create_temp_csv(&mut df);
    let config = common::config_in(dir.path());

    let chart = Stage::Balance.chart_path(&config.output_dir).unwrap();
    std::fs::create_dir_all(&chart).unwrap();

    let err = run_balance_stage(&path, &config).unwrap_err();
    assert!(matches!(err, StageError::Artifact(_)));
    assert!(!Stage::Balance.csv_path(&config.output_dir).exists());
    assert!(!prepline::pipeline::pipeline_status(&config.output_dir).stages[3].completed);
}
