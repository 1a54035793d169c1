use std::fs;
use std::path::{Path, PathBuf};

use featverify_analysis::io::write_frame;
use featverify_analysis::Frame;
use featverify_cli::input::{Overrides, RunInput};
use featverify_cli::verify::run_verification;

fn write_cohort(dir: &Path) -> PathBuf {
    let n = 60;
    let y: Vec<f64> = (0..n).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }).collect();
    let lvef: Vec<f64> = (0..n).map(|i| 55.0 - 15.0 * y[i] + 4.0 * (i as f64 * 0.9).sin()).collect();
    let age: Vec<f64> = (0..n).map(|i| 60.0 + 5.0 * y[i] + 8.0 * (i as f64 * 1.7).cos()).collect();
    let subject: Vec<f64> = (0..n).map(|i| 1000.0 + i as f64).collect();
    let frame = Frame::from_columns(vec![("lvef", lvef), ("age", age), ("mace", y), ("subject", subject)]).unwrap();
    let path = dir.join("cohort.csv");
    write_frame(&frame, &path).unwrap();
    path
}

fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.json");
    let body = r#"{
        "meta": {"name": "cli", "target_label": "mace", "seed": [3], "metadata": ["subject"]},
        "explore": {"rfecv": {"enabled": false}},
        "verification": {"models": {"logistic_regression": true, "gbdt": false}}
    }"#;
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_verify_with_feature_override() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_cohort(dir.path());
    let config_path = write_config(dir.path());
    let overrides = Overrides {
        data: Some(data),
        output_dir: Some(dir.path().join("results")),
        top_features: Some(vec!["lvef".to_string()]),
    };

    let input = RunInput::from_arguments(&config_path, &overrides).unwrap();
    let report = run_verification(&input).unwrap();

    assert_eq!(report.summaries.len(), 2);
    assert!(report.summary("logistic_regression", "1-item score").is_some());
    let out = dir.path().join("results").join("cli");
    assert!(out.join("verification_scores.csv").exists());
    assert!(out.join("AUROC_logistic_regression.html").exists());
    // exploration is skipped when features are given
    assert!(!out.join("box_plot.html").exists());
}

#[test]
fn test_verify_selects_features_by_exploration() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_cohort(dir.path());
    let config_path = write_config(dir.path());
    let overrides = Overrides {
        data: Some(data),
        output_dir: Some(dir.path().join("results")),
        top_features: None,
    };

    let input = RunInput::from_arguments(&config_path, &overrides).unwrap();
    let report = run_verification(&input).unwrap();

    let sets: Vec<&str> = report.summaries.iter().map(|s| s.feature_set.as_str()).collect();
    assert_eq!(sets, vec!["lvef", "age", "2-item score"]);
    let out = dir.path().join("results").join("cli");
    assert!(out.join("box_plot.html").exists());
    assert!(out.join("corr_plot_before.html").exists());
}
