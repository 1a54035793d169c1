use featverify_analysis::config::{AnalysisConfig, OutlierMode};
use featverify_analysis::data_handling::Frame;
use featverify_analysis::exploration::Exploration;
use featverify_analysis::io::{read_frame, write_frame};
use featverify_analysis::outliers::{iqr_bounds, outlier_mask};

fn cohort(n: usize) -> Frame {
    let y: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
    let a: Vec<f64> = (0..n).map(|i| i as f64 + 3.0 * y[i]).collect();
    let b: Vec<f64> = a
        .iter()
        .enumerate()
        .map(|(i, v)| if i % 2 == 0 { v + 0.5 } else { v - 0.5 })
        .collect();
    let mut c: Vec<f64> = (0..n).map(|i| ((i * 7) % 13) as f64 + 2.0 * y[i]).collect();
    c[5] = 250.0;
    let subject: Vec<f64> = (0..n).rev().map(|i| i as f64).collect();
    Frame::from_columns(vec![("a", a), ("b", b), ("c", c), ("y", y), ("subject", subject)]).unwrap()
}

fn config(out: &std::path::Path) -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.meta.name = "explore".to_string();
    config.meta.output_dir = out.to_path_buf();
    config.meta.target_label = "y".to_string();
    config.meta.metadata = vec!["subject".to_string()];
    config.meta.subject_column = Some("subject".to_string());
    config.meta.seed = vec![7];
    config.explore.corr_thresh = 0.95;
    config
}

#[test]
fn test_exploration_prunes_correlated_and_ranks() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.explore.outliers = OutlierMode::Investigate;
    config.validate().unwrap();

    let report = Exploration::new(&config).run(&cohort(40)).unwrap();
    assert_eq!(report.dropped_correlated, vec!["b".to_string()]);
    assert!(report.outlier_count >= 1);
    assert!(!report.top_features.is_empty());
    assert!(report.top_features.iter().all(|f| f == "a" || f == "c"));
    assert!(report.frame.has_column("y"));
    assert!(report.frame.has_column("subject"));
    assert!(!report.frame.has_column("b"));

    let out = dir.path().join("explore");
    for name in [
        "box_plot_y.html",
        "box_plot.html",
        "dis_plot.html",
        "investigate_outliers.html",
        "corr_plot_before.html",
        "corr_plot_after.html",
        "RFECV_logistic_regression.html",
        "feature_importance_logistic_regression.html",
    ] {
        assert!(out.join(name).exists(), "{} missing", name);
    }
}

#[test]
fn test_drop_mode_masks_outliers_before_pruning() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.explore.outliers = OutlierMode::Drop;
    config.explore.rfecv.enabled = false;

    let frame = cohort(40);
    let report = Exploration::new(&config).run(&frame).unwrap();
    assert!(report.frame.column("c").unwrap()[5].is_nan());
    assert_eq!(report.frame.nrows(), 40);
    assert_eq!(report.top_features, vec!["a".to_string(), "c".to_string()]);

    let masked = read_frame(dir.path().join("explore").join("outliers_removed.csv")).unwrap();
    assert!(masked.column("c").unwrap()[5].is_nan());
    assert_eq!(masked.column("subject").unwrap().to_vec(), frame.column("subject").unwrap().to_vec());
}

#[test]
fn test_outlier_bounds_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cohort.csv");
    let frame = Frame::from_columns(vec![
        ("x", vec![10.0, 10.0, 15.0, 20.0, 20.0, 36.0, -6.0, 15.0, 15.0]),
        ("y", vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]),
        ("subject", vec![900.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]),
    ])
    .unwrap();
    write_frame(&frame, &path).unwrap();
    let frame = read_frame(&path).unwrap();

    let bounds = iqr_bounds(&frame, "y", &["subject".to_string()]).unwrap();
    assert_eq!(bounds.len(), 1);
    assert_eq!((bounds[0].1.lower, bounds[0].1.upper), (-5.0, 35.0));
    let mask = outlier_mask(&frame, &bounds);
    let flagged: Vec<usize> = (0..frame.nrows()).filter(|&i| mask[(i, 0)]).collect();
    assert_eq!(flagged, vec![5, 6]);
    assert!(mask.column(2).iter().all(|f| !*f));
}
