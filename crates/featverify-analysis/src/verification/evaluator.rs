//! Aggregation of verification results across seeds.
//!
//! For every (model, feature set) the configured metrics are collected per
//! seed and reduced to mean ± std. Classification runs additionally get
//! seed-averaged ROC and PR curves, one plot per model overlaying every
//! feature set, and a confusion matrix summed over seeds. Regression runs
//! get a true-vs-predicted scatter plot instead.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};

use crate::config::{AnalysisConfig, LearnTask};
use crate::error::{AnalysisError, Result};
use crate::metrics::{precision_recall_curve, roc_curve, BinaryCounts, Metric, MetricError, PrCurve, RocCurve};
use crate::report::plots::{plot_confusion_matrix, plot_prc, plot_regression, plot_roc, MeanCurve};
use crate::report::tables::write_records;
use crate::report::{ensure_dir, file_stem, write_plot};
use crate::stats::{format_mean_std, grid, interp, mean_std};
use crate::verification::orchestrator::VerificationRun;

/// Points of the common FPR (ROC) and recall (PRC) grid.
pub const CURVE_POINTS: usize = 100;

/// Per-seed metric values of one (model, feature set) pair.
#[derive(Debug, Clone)]
pub struct ScoreSummary {
    pub model: String,
    pub feature_set: String,
    pub scores: BTreeMap<Metric, Vec<f64>>,
}

impl ScoreSummary {
    pub fn mean_std(&self, metric: Metric) -> Option<(f64, f64)> {
        self.scores.get(&metric).map(|v| mean_std(v))
    }

    /// `"mean ± std"` to three decimals.
    pub fn formatted(&self, metric: Metric) -> Option<String> {
        self.mean_std(metric).map(|(m, s)| format_mean_std(m, s))
    }
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationReport {
    pub summaries: Vec<ScoreSummary>,
    /// Mean ROC curve per model, one entry per feature set.
    pub roc_curves: BTreeMap<String, Vec<MeanCurve>>,
    pub prc_curves: BTreeMap<String, Vec<MeanCurve>>,
    pub artifacts: Vec<PathBuf>,
}

impl EvaluationReport {
    pub fn summary(&self, model: &str, feature_set: &str) -> Option<&ScoreSummary> {
        self.summaries
            .iter()
            .find(|s| s.model == model && s.feature_set == feature_set)
    }
}

/// Evaluate `metric` on continuous scores when given, retrying on hard
/// predictions if the metric only accepts discrete labels.
pub fn score_with_fallback(metric: Metric, y_true: &[f64], scores: Option<&[f64]>, pred: &[f64]) -> Result<f64> {
    if let Some(scores) = scores {
        match metric.score(y_true, scores) {
            Ok(v) => return Ok(v),
            Err(MetricError::ContinuousInput { .. }) => {
                log::debug!("{} rejected continuous scores, using predictions", metric);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(metric.score(y_true, pred)?)
}

/// TPR of `curve` on `fpr_grid`, with the first point pinned to 0.
pub fn interpolate_roc(curve: &RocCurve, fpr_grid: &Array1<f64>) -> Array1<f64> {
    let mut tpr = interp(fpr_grid, &curve.fpr, &curve.tpr);
    if let Some(first) = tpr.first_mut() {
        *first = 0.0;
    }
    tpr
}

/// Precision of `curve` on an increasing `recall_grid`.
pub fn interpolate_prc(curve: &PrCurve, recall_grid: &Array1<f64>) -> Array1<f64> {
    let recall: Vec<f64> = curve.recall.iter().rev().copied().collect();
    let precision: Vec<f64> = curve.precision.iter().rev().copied().collect();
    interp(recall_grid, &recall, &precision)
}

/// Mean of per-seed curves sampled on `x`, with a ±1 std band clamped to [0, 1].
pub fn mean_curve(label: String, x: &Array1<f64>, curves: &[Array1<f64>]) -> Result<MeanCurve> {
    if curves.is_empty() {
        return Err(AnalysisError::InvalidData(format!("no curves to average for {}", label)));
    }
    let views: Vec<_> = curves.iter().map(|c| c.view()).collect();
    let stacked: Array2<f64> = ndarray::stack(ndarray::Axis(0), &views).map_err(|e| AnalysisError::Shape(e.to_string()))?;
    let mean = stacked
        .mean_axis(ndarray::Axis(0))
        .ok_or_else(|| AnalysisError::InvalidData("empty curve stack".to_string()))?;
    let std = stacked.std_axis(ndarray::Axis(0), 0.0);
    Ok(MeanCurve {
        label,
        x: x.to_vec(),
        lower: (&mean - &std).mapv(|v| v.max(0.0)).to_vec(),
        upper: (&mean + &std).mapv(|v| v.min(1.0)).to_vec(),
        mean: mean.to_vec(),
    })
}

/// Per-seed predictions of one (model, feature set) pair.
struct SeedOutput {
    y_true: Vec<f64>,
    pred: Vec<f64>,
    scores: Option<Vec<f64>>,
}

pub struct Evaluator {
    task: LearnTask,
    target_label: String,
    metrics: Vec<Metric>,
    out_dir: PathBuf,
}

impl Evaluator {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        Ok(Evaluator {
            task: config.meta.learn_task,
            target_label: config.meta.target_label.clone(),
            metrics: config.verification.scoring_for(config.meta.learn_task)?,
            out_dir: config.out_dir(),
        })
    }

    pub fn with_out_dir<P: AsRef<Path>>(mut self, out_dir: P) -> Self {
        self.out_dir = out_dir.as_ref().to_path_buf();
        self
    }

    pub fn evaluate(&self, run: &VerificationRun) -> Result<EvaluationReport> {
        ensure_dir(&self.out_dir)?;
        let mut report = EvaluationReport::default();
        let fpr_grid = grid(0.0, 1.0, CURVE_POINTS);

        for model in &run.models {
            let mut roc_curves = Vec::new();
            let mut prc_curves = Vec::new();
            let mut positives = 0.0;
            let mut total = 0.0;

            for set in &run.feature_sets {
                let outputs = self.collect(run, model, &set.name)?;
                let mut summary = ScoreSummary {
                    model: model.clone(),
                    feature_set: set.name.clone(),
                    scores: BTreeMap::new(),
                };
                for out in &outputs {
                    for metric in &self.metrics {
                        let value = match score_with_fallback(*metric, &out.y_true, out.scores.as_deref(), &out.pred) {
                            Ok(v) => v,
                            Err(AnalysisError::Metric(e @ MetricError::SingleClass { .. })) => {
                                log::warn!("{} on {}: {}, recording NaN", model, set.name, e);
                                f64::NAN
                            }
                            Err(e) => return Err(e),
                        };
                        summary.scores.entry(*metric).or_default().push(value);
                    }
                }
                let formatted: Vec<String> = self
                    .metrics
                    .iter()
                    .filter_map(|m| summary.formatted(*m).map(|f| format!("{}: {}", m, f)))
                    .collect();
                log::info!("{} on {}: {}", model, set.name, formatted.join(", "));

                if self.task.is_classification() {
                    for out in &outputs {
                        positives += out.y_true.iter().filter(|v| **v == 1.0).count() as f64;
                        total += out.y_true.len() as f64;
                    }
                    let (roc, prc) = self.mean_curves(&outputs, &set.name, &fpr_grid)?;
                    roc_curves.extend(roc);
                    prc_curves.extend(prc);
                    report.artifacts.push(self.write_confusion_matrix(model, &set.name, &outputs)?);
                } else {
                    report.artifacts.push(self.write_regression(model, &set.name, &outputs)?);
                }
                report.summaries.push(summary);
            }

            if self.task.is_classification() {
                let roc_path = self.out_dir.join(format!("AUROC_{}.html", file_stem(model)));
                write_plot(&plot_roc(model, &roc_curves), &roc_path)?;
                let pos_rate = if total > 0.0 { positives / total } else { 0.0 };
                let prc_path = self.out_dir.join(format!("AUPRC_{}.html", file_stem(model)));
                write_plot(&plot_prc(model, &prc_curves, pos_rate), &prc_path)?;
                report.artifacts.push(roc_path);
                report.artifacts.push(prc_path);
                report.roc_curves.insert(model.clone(), roc_curves);
                report.prc_curves.insert(model.clone(), prc_curves);
            }
        }

        let csv_path = self.out_dir.join("verification_scores.csv");
        self.write_scores(&report.summaries, &csv_path)?;
        report.artifacts.push(csv_path);
        Ok(report)
    }

    fn collect(&self, run: &VerificationRun, model: &str, feature_set: &str) -> Result<Vec<SeedOutput>> {
        run.seeds
            .iter()
            .map(|&seed| {
                let missing = || {
                    AnalysisError::InvalidData(format!(
                        "no trained {} for seed {} and {}",
                        model, seed, feature_set
                    ))
                };
                let estimator = run.store.get(model, seed, feature_set).ok_or_else(missing)?;
                let held_out = run.store.held_out(seed, feature_set).ok_or_else(missing)?;
                let pred = estimator.predict(&held_out.x)?.to_vec();
                let scores = if self.task.is_classification() {
                    estimator.scores(&held_out.x).transpose()?.map(|s| s.to_vec())
                } else {
                    None
                };
                Ok(SeedOutput {
                    y_true: held_out.y.to_vec(),
                    pred,
                    scores,
                })
            })
            .collect()
    }

    /// Seed-averaged ROC and PR curves of one feature set, labelled with
    /// their aggregated AUROC/AUPRC. Seeds whose held-out labels hold a
    /// single class are skipped.
    fn mean_curves(
        &self,
        outputs: &[SeedOutput],
        feature_set: &str,
        fpr_grid: &Array1<f64>,
    ) -> Result<(Option<MeanCurve>, Option<MeanCurve>)> {
        let mut tprs = Vec::new();
        let mut precisions = Vec::new();
        let mut aurocs = Vec::new();
        let mut auprcs = Vec::new();
        for out in outputs {
            let scores = out.scores.as_deref().unwrap_or(&out.pred);
            let roc = match roc_curve(&out.y_true, scores, true) {
                Ok(roc) => roc,
                Err(MetricError::SingleClass { .. }) => {
                    log::warn!("{}: held-out split holds a single class, skipping its curves", feature_set);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let prc = precision_recall_curve(&out.y_true, scores)?;
            aurocs.push(Metric::RocAuc.score(&out.y_true, scores)?);
            auprcs.push(Metric::AveragePrecision.score(&out.y_true, scores)?);
            tprs.push(interpolate_roc(&roc, fpr_grid));
            precisions.push(interpolate_prc(&prc, fpr_grid));
        }
        if tprs.is_empty() {
            return Ok((None, None));
        }
        let (auroc, auroc_std) = mean_std(&aurocs);
        let (auprc, auprc_std) = mean_std(&auprcs);
        let roc = mean_curve(
            format!("{}, AUROC={}", feature_set, format_mean_std(auroc, auroc_std)),
            fpr_grid,
            &tprs,
        )?;
        let prc = mean_curve(
            format!("{}, AUPRC={}", feature_set, format_mean_std(auprc, auprc_std)),
            fpr_grid,
            &precisions,
        )?;
        Ok((Some(roc), Some(prc)))
    }

    fn write_confusion_matrix(&self, model: &str, feature_set: &str, outputs: &[SeedOutput]) -> Result<PathBuf> {
        let mut counts = BinaryCounts::default();
        for out in outputs {
            let c = BinaryCounts::new(&out.y_true, &out.pred);
            counts.tp += c.tp;
            counts.fp += c.fp;
            counts.tn += c.tn;
            counts.fn_ += c.fn_;
        }
        let matrix = Array2::from_shape_vec((2, 2), vec![counts.tn, counts.fp, counts.fn_, counts.tp])
            .map_err(|e| AnalysisError::Shape(e.to_string()))?;
        let path = self.out_dir.join(format!(
            "confusion_matrix_{}_{}.html",
            file_stem(model),
            file_stem(feature_set)
        ));
        write_plot(
            &plot_confusion_matrix(
                &[0.0, 1.0],
                &matrix,
                &format!("Confusion matrix, {} on {}", model, feature_set),
            ),
            &path,
        )?;
        Ok(path)
    }

    fn write_regression(&self, model: &str, feature_set: &str, outputs: &[SeedOutput]) -> Result<PathBuf> {
        let y_true: Vec<f64> = outputs.iter().flat_map(|o| o.y_true.iter().copied()).collect();
        let y_pred: Vec<f64> = outputs.iter().flat_map(|o| o.pred.iter().copied()).collect();
        let path = self.out_dir.join(format!(
            "regression_{}_{}.html",
            file_stem(model),
            file_stem(feature_set)
        ));
        write_plot(
            &plot_regression(
                &y_true,
                &y_pred,
                &self.target_label,
                &format!("Regression on {}, {} with {}", self.target_label, model, feature_set),
            ),
            &path,
        )?;
        Ok(path)
    }

    fn write_scores(&self, summaries: &[ScoreSummary], path: &Path) -> Result<()> {
        let mut records = Vec::new();
        for summary in summaries {
            for (metric, values) in &summary.scores {
                let (mean, std) = mean_std(values);
                records.push(vec![
                    summary.model.clone(),
                    summary.feature_set.clone(),
                    metric.name().to_string(),
                    format!("{:.6}", mean),
                    format!("{:.6}", std),
                    format_mean_std(mean, std),
                ]);
            }
        }
        write_records(path, &["model", "feature_set", "metric", "mean", "std", "formatted"], &records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolated_tpr_starts_at_zero() {
        let y = [0.0, 0.0, 1.0, 1.0];
        let s = [0.1, 0.4, 0.35, 0.8];
        let roc = roc_curve(&y, &s, true).unwrap();
        let fpr_grid = grid(0.0, 1.0, CURVE_POINTS);
        let tpr = interpolate_roc(&roc, &fpr_grid);
        assert_eq!(tpr.len(), CURVE_POINTS);
        assert_eq!(tpr[0], 0.0);
        assert_eq!(tpr[CURVE_POINTS - 1], 1.0);
    }

    #[test]
    fn test_fallback_to_predictions() {
        let y = [0.0, 1.0, 1.0, 0.0];
        let probas = [0.2, 0.7, 0.9, 0.6];
        let pred = [0.0, 1.0, 1.0, 1.0];
        let acc = score_with_fallback(Metric::Accuracy, &y, Some(&probas), &pred).unwrap();
        assert_eq!(acc, 0.75);
        let auc = score_with_fallback(Metric::RocAuc, &y, Some(&probas), &pred).unwrap();
        assert_eq!(auc, 1.0);
    }

    #[test]
    fn test_mean_curve_band_is_clamped() {
        let x = grid(0.0, 1.0, 3);
        let curves = vec![Array1::from(vec![0.0, 1.0, 1.0]), Array1::from(vec![0.0, 0.2, 1.0])];
        let curve = mean_curve("a".to_string(), &x, &curves).unwrap();
        assert!((curve.mean[1] - 0.6).abs() < 1e-12);
        assert!((curve.upper[1] - 1.0).abs() < 1e-12);
        assert!((curve.lower[1] - 0.2).abs() < 1e-12);
        assert!(curve.upper.iter().all(|v| *v <= 1.0));
    }
}
