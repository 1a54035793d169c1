//! Exploratory analysis of a frame before verification.
//!
//! `univariate_analysis` writes per-feature box and distribution plots.
//! `Exploration` chains it with outlier handling, correlation pruning and
//! RFECV, and returns the reduced frame together with the ranked features
//! that verification will use.
use std::path::{Path, PathBuf};

use crate::config::AnalysisConfig;
use crate::data_handling::Frame;
use crate::error::Result;
use crate::feature_selection::{CorrelationPruner, Rfecv};
use crate::outliers::OutlierDetector;
use crate::report::plots::{plot_boxes, plot_boxes_by_class, plot_distributions};
use crate::report::{ensure_dir, file_stem, write_plot};

fn observed(values: ndarray::ArrayView1<'_, f64>) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

fn class_label(class: f64) -> String {
    if class.fract() == 0.0 {
        format!("{}", class as i64)
    } else {
        format!("{}", class)
    }
}

/// Box plots per feature (split by target and overall) and overlaid
/// distributions. Metadata columns are skipped.
pub fn univariate_analysis(frame: &Frame, target_label: &str, metadata: &[String], out_dir: &Path) -> Result<Vec<PathBuf>> {
    let features = frame.feature_names(target_label, metadata);
    let target = frame.column(target_label)?;

    let mut classes: Vec<f64> = target.iter().copied().filter(|v| !v.is_nan()).collect();
    classes.sort_by(|a, b| a.total_cmp(b));
    classes.dedup();

    let mut groups = Vec::with_capacity(classes.len());
    for class in &classes {
        let mut names = Vec::new();
        let mut values = Vec::new();
        for feature in &features {
            let col = frame.column(feature)?;
            for (v, t) in col.iter().zip(target.iter()) {
                if *t == *class && !v.is_nan() {
                    names.push(feature.clone());
                    values.push(*v);
                }
            }
        }
        groups.push((class_label(*class), names, values));
    }

    let per_feature: Vec<(String, Vec<f64>)> = features
        .iter()
        .map(|f| -> Result<(String, Vec<f64>)> { Ok((f.clone(), observed(frame.column(f)?))) })
        .collect::<Result<_>>()?;

    let paths = vec![
        out_dir.join(format!("box_plot_{}.html", file_stem(target_label))),
        out_dir.join("box_plot.html"),
        out_dir.join("dis_plot.html"),
    ];
    write_plot(
        &plot_boxes_by_class(&groups, &format!("Features by {}", target_label)),
        &paths[0],
    )?;
    write_plot(&plot_boxes(&per_feature, "Features"), &paths[1])?;
    write_plot(&plot_distributions(&per_feature, "Feature distributions"), &paths[2])?;
    Ok(paths)
}

/// Outcome of an exploration run.
#[derive(Debug, Clone)]
pub struct ExplorationReport {
    /// Frame after outlier handling, correlation pruning and (if enabled)
    /// RFECV reduction.
    pub frame: Frame,
    pub dropped_correlated: Vec<String>,
    pub outlier_count: usize,
    /// Features to verify, most important first.
    pub top_features: Vec<String>,
}

/// The exploration stages as configured under `explore`.
pub struct Exploration<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> Exploration<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Exploration { config }
    }

    pub fn run(&self, frame: &Frame) -> Result<ExplorationReport> {
        let meta = &self.config.meta;
        let explore = &self.config.explore;
        let out_dir = self.config.out_dir();
        ensure_dir(&out_dir)?;
        frame.column(&meta.target_label)?;

        log::info!("Univariate analysis of {} rows", frame.nrows());
        univariate_analysis(frame, &meta.target_label, &meta.metadata, &out_dir)?;

        let outliers = OutlierDetector::new(&meta.target_label, &meta.metadata)
            .with_subject_column(meta.subject_column.clone())
            .run(frame, explore.outliers, &out_dir)?;

        let correlation = CorrelationPruner::new(&meta.target_label, &meta.metadata, explore.corr_thresh)
            .with_drop(explore.drop_correlated)
            .run(&outliers.frame, &out_dir)?;

        let (frame, top_features) = if explore.rfecv.enabled {
            let seed = meta.seed.first().copied().unwrap_or_default();
            let rfecv = Rfecv::from_config(self.config, seed)?.run(
                &correlation.frame,
                &meta.target_label,
                &meta.metadata,
                &out_dir,
            )?;
            (rfecv.frame, rfecv.ranked_features)
        } else {
            let features = correlation.frame.feature_names(&meta.target_label, &meta.metadata);
            (correlation.frame, features)
        };

        log::info!("Exploration kept {} features: {}", top_features.len(), top_features.join(", "));
        Ok(ExplorationReport {
            frame,
            dropped_correlated: correlation.dropped,
            outlier_count: outliers.total(),
            top_features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_univariate_plots_written() {
        let dir = tempfile::tempdir().unwrap();
        let frame = Frame::from_columns(vec![
            ("a", vec![1.0, 2.0, f64::NAN, 4.0]),
            ("b", vec![0.5, 0.1, 0.3, 0.2]),
            ("mace", vec![0.0, 1.0, 0.0, 1.0]),
            ("subject", vec![1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap();
        let paths = univariate_analysis(&frame, "mace", &["subject".to_string()], dir.path()).unwrap();
        assert!(paths[0].ends_with("box_plot_mace.html"));
        for path in &paths {
            assert!(path.exists());
        }
    }

    #[test]
    fn test_class_label() {
        assert_eq!(class_label(1.0), "1");
        assert_eq!(class_label(0.5), "0.5");
    }
}
