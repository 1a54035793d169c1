//! Pairwise Pearson correlation pruning.
//!
//! Only feature columns take part: the target label and metadata columns
//! are carried through untouched. For every pair whose absolute
//! correlation exceeds the threshold, the later column in column order is
//! dropped.
use std::path::Path;

use ndarray::Array2;

use crate::data_handling::Frame;
use crate::error::{AnalysisError, Result};
use crate::report::plots::plot_heatmap;
use crate::report::write_plot;
use crate::stats::pearson_matrix;

#[derive(Debug, Clone)]
pub struct CorrelationReport {
    /// Input frame without the dropped columns (unchanged if dropping is off).
    pub frame: Frame,
    pub features: Vec<String>,
    /// Absolute correlation matrix of `features`.
    pub matrix: Array2<f64>,
    /// Columns exceeding the threshold with an earlier column.
    pub correlated: Vec<String>,
    pub dropped: Vec<String>,
}

/// Columns whose absolute correlation with any earlier column exceeds
/// `threshold`, in column order. `NaN` correlations never exceed it.
pub fn correlated_columns(names: &[String], abs_corr: &Array2<f64>, threshold: f64) -> Vec<String> {
    (0..names.len())
        .filter(|&j| (0..j).any(|i| abs_corr[(i, j)] > threshold))
        .map(|j| names[j].clone())
        .collect()
}

#[derive(Debug, Clone)]
pub struct CorrelationPruner {
    pub target_label: String,
    pub metadata: Vec<String>,
    pub threshold: f64,
    pub drop: bool,
}

impl CorrelationPruner {
    pub fn new(target_label: &str, metadata: &[String], threshold: f64) -> Self {
        CorrelationPruner {
            target_label: target_label.to_string(),
            metadata: metadata.to_vec(),
            threshold,
            drop: true,
        }
    }

    pub fn with_drop(mut self, drop: bool) -> Self {
        self.drop = drop;
        self
    }

    /// Compute the correlation matrix and prune without writing plots.
    pub fn prune(&self, frame: &Frame) -> Result<CorrelationReport> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(AnalysisError::Config(format!(
                "correlation threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        let features = frame.feature_names(&self.target_label, &self.metadata);
        let x = frame.select(&features)?;
        let matrix = pearson_matrix(x.data()).mapv(f64::abs);
        let correlated = correlated_columns(&features, &matrix, self.threshold);

        if correlated.is_empty() {
            log::info!("No feature pair exceeds |r| > {}", self.threshold);
        } else {
            log::info!(
                "{} features exceed |r| > {} with an earlier feature: {}",
                correlated.len(),
                self.threshold,
                correlated.join(", ")
            );
        }

        let dropped = if self.drop { correlated.clone() } else { Vec::new() };
        Ok(CorrelationReport {
            frame: frame.drop_columns(&dropped),
            features,
            matrix,
            correlated,
            dropped,
        })
    }

    /// Prune and persist the correlation heatmaps before and after pruning.
    pub fn run(&self, frame: &Frame, out_dir: &Path) -> Result<CorrelationReport> {
        let report = self.prune(frame)?;
        write_plot(
            &plot_heatmap(&report.features, &report.matrix, "Absolute Pearson correlation"),
            out_dir.join("corr_plot_before.html"),
        )?;

        let kept: Vec<usize> = (0..report.features.len())
            .filter(|&i| !report.dropped.contains(&report.features[i]))
            .collect();
        let kept_names: Vec<String> = kept.iter().map(|&i| report.features[i].clone()).collect();
        let kept_matrix = report
            .matrix
            .select(ndarray::Axis(0), &kept)
            .select(ndarray::Axis(1), &kept);
        write_plot(
            &plot_heatmap(
                &kept_names,
                &kept_matrix,
                &format!("Absolute Pearson correlation, |r| ≤ {}", self.threshold),
            ),
            out_dir.join("corr_plot_after.html"),
        )?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        let a: Vec<f64> = (1..=8).map(|i| i as f64).collect();
        let b: Vec<f64> = a
            .iter()
            .enumerate()
            .map(|(i, v)| if i % 2 == 0 { v + 0.5 } else { v - 0.5 })
            .collect();
        Frame::from_columns(vec![
            ("a", a),
            ("b", b),
            ("c", vec![3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0]),
            ("y", vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]),
            ("subject", (1..=8).map(|i| i as f64).collect()),
        ])
        .unwrap()
    }

    #[test]
    fn test_drops_later_of_correlated_pair() {
        let pruner = CorrelationPruner::new("y", &["subject".to_string()], 0.95);
        let report = pruner.prune(&frame()).unwrap();
        assert!(report.matrix[(0, 1)] > 0.97 && report.matrix[(0, 1)] < 0.98);
        assert_eq!(report.dropped, vec!["b".to_string()]);
        assert_eq!(report.frame.columns().to_vec(), vec!["a", "c", "y", "subject"]);
    }

    #[test]
    fn test_flag_only_keeps_columns() {
        let pruner = CorrelationPruner::new("y", &["subject".to_string()], 0.95).with_drop(false);
        let report = pruner.prune(&frame()).unwrap();
        assert_eq!(report.correlated, vec!["b".to_string()]);
        assert!(report.dropped.is_empty());
        assert_eq!(report.frame.ncols(), 5);
    }

    #[test]
    fn test_column_dropped_once_for_several_partners() {
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let m = Array2::from_shape_vec((3, 3), vec![1.0, 0.2, 0.99, 0.2, 1.0, 0.99, 0.99, 0.99, 1.0]).unwrap();
        assert_eq!(correlated_columns(&names, &m, 0.95), vec!["c".to_string()]);
    }
}
