//! Evaluation metrics and curve computation.
//!
//! Metrics are looked up through the `Metric` enum rather than by function
//! name, so an unknown metric is rejected when the configuration is parsed.
//! Classification metrics treat `1.0` as the positive class.
use std::fmt;
use std::str::FromStr;

use ndarray::Array2;

use crate::stats::trapezoid;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricError {
    #[error("{metric} requires discrete class labels but received continuous values")]
    ContinuousInput { metric: &'static str },

    #[error("{metric} is undefined when y_true contains a single class")]
    SingleClass { metric: &'static str },

    #[error("{metric}: y_true has {y_true} values but y_pred has {y_pred}")]
    LengthMismatch {
        metric: &'static str,
        y_true: usize,
        y_pred: usize,
    },

    #[error("{metric} requires at least one sample")]
    Empty { metric: &'static str },

    #[error("unknown metric '{0}'")]
    Unknown(String),
}

/// Scoring metrics that can be requested by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    RocAuc,
    AveragePrecision,
    Accuracy,
    BalancedAccuracy,
    F1,
    Precision,
    Recall,
    MeanAbsoluteError,
    MeanSquaredError,
    R2,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::RocAuc => "roc_auc_score",
            Metric::AveragePrecision => "average_precision_score",
            Metric::Accuracy => "accuracy_score",
            Metric::BalancedAccuracy => "balanced_accuracy_score",
            Metric::F1 => "f1_score",
            Metric::Precision => "precision_score",
            Metric::Recall => "recall_score",
            Metric::MeanAbsoluteError => "mean_absolute_error",
            Metric::MeanSquaredError => "mean_squared_error",
            Metric::R2 => "r2_score",
        }
    }

    /// Whether the metric ranks continuous scores (probabilities, margins)
    /// rather than comparing hard labels.
    pub fn needs_scores(&self) -> bool {
        matches!(self, Metric::RocAuc | Metric::AveragePrecision)
    }

    pub fn is_classification(&self) -> bool {
        !matches!(
            self,
            Metric::MeanAbsoluteError | Metric::MeanSquaredError | Metric::R2
        )
    }

    pub fn greater_is_better(&self) -> bool {
        !matches!(self, Metric::MeanAbsoluteError | Metric::MeanSquaredError)
    }

    /// Evaluate the metric.
    ///
    /// Label metrics return `MetricError::ContinuousInput` when `y_pred`
    /// holds non-integer values; callers holding probabilities retry with
    /// hard predictions.
    pub fn score(&self, y_true: &[f64], y_pred: &[f64]) -> Result<f64, MetricError> {
        let name = self.name();
        check_lengths(name, y_true, y_pred)?;
        match self {
            Metric::RocAuc => roc_auc_score(y_true, y_pred),
            Metric::AveragePrecision => average_precision_score(y_true, y_pred),
            Metric::Accuracy => {
                require_discrete(name, y_pred)?;
                Ok(accuracy_score(y_true, y_pred))
            }
            Metric::BalancedAccuracy => {
                require_discrete(name, y_pred)?;
                balanced_accuracy_score(y_true, y_pred)
            }
            Metric::F1 => {
                require_discrete(name, y_pred)?;
                Ok(BinaryCounts::new(y_true, y_pred).f1())
            }
            Metric::Precision => {
                require_discrete(name, y_pred)?;
                Ok(BinaryCounts::new(y_true, y_pred).precision())
            }
            Metric::Recall => {
                require_discrete(name, y_pred)?;
                Ok(BinaryCounts::new(y_true, y_pred).recall())
            }
            Metric::MeanAbsoluteError => Ok(mean_absolute_error(y_true, y_pred)),
            Metric::MeanSquaredError => Ok(mean_squared_error(y_true, y_pred)),
            Metric::R2 => Ok(r2_score(y_true, y_pred)),
        }
    }

    /// Score oriented so that larger is always better (losses negated),
    /// used for model selection.
    pub fn selection_score(&self, y_true: &[f64], y_pred: &[f64]) -> Result<f64, MetricError> {
        let s = self.score(y_true, y_pred)?;
        Ok(if self.greater_is_better() { s } else { -s })
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = MetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "roc_auc" | "roc_auc_score" => Ok(Metric::RocAuc),
            "average_precision" | "average_precision_score" => Ok(Metric::AveragePrecision),
            "accuracy" | "accuracy_score" => Ok(Metric::Accuracy),
            "balanced_accuracy" | "balanced_accuracy_score" => Ok(Metric::BalancedAccuracy),
            "f1" | "f1_score" => Ok(Metric::F1),
            "precision" | "precision_score" => Ok(Metric::Precision),
            "recall" | "recall_score" => Ok(Metric::Recall),
            "neg_mean_absolute_error" | "mean_absolute_error" => Ok(Metric::MeanAbsoluteError),
            "neg_mean_squared_error" | "mean_squared_error" => Ok(Metric::MeanSquaredError),
            "r2" | "r2_score" => Ok(Metric::R2),
            _ => Err(MetricError::Unknown(s.to_string())),
        }
    }
}

fn check_lengths(metric: &'static str, y_true: &[f64], y_pred: &[f64]) -> Result<(), MetricError> {
    if y_true.len() != y_pred.len() {
        return Err(MetricError::LengthMismatch {
            metric,
            y_true: y_true.len(),
            y_pred: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(MetricError::Empty { metric });
    }
    Ok(())
}

fn require_discrete(metric: &'static str, y_pred: &[f64]) -> Result<(), MetricError> {
    if y_pred.iter().any(|v| v.fract() != 0.0 || !v.is_finite()) {
        return Err(MetricError::ContinuousInput { metric });
    }
    Ok(())
}

#[inline]
fn is_positive(v: f64) -> bool {
    v == 1.0
}

/// Receiver-operating characteristic curve.
#[derive(Debug, Clone, PartialEq)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub thresholds: Vec<f64>,
}

/// Precision-recall curve, ordered by decreasing recall and ending at
/// `(recall = 0, precision = 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub thresholds: Vec<f64>,
}

/// False/true positive counts at each distinct score threshold, highest
/// threshold first.
fn binary_clf_curve(y_true: &[f64], y_score: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| {
        y_score[b]
            .partial_cmp(&y_score[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut fps = Vec::new();
    let mut tps = Vec::new();
    let mut thresholds = Vec::new();
    let mut tp = 0.0;
    let mut fp = 0.0;
    for (k, &idx) in order.iter().enumerate() {
        if is_positive(y_true[idx]) {
            tp += 1.0;
        } else {
            fp += 1.0;
        }
        let is_last_of_value = k + 1 == order.len() || y_score[order[k + 1]] != y_score[idx];
        if is_last_of_value {
            tps.push(tp);
            fps.push(fp);
            thresholds.push(y_score[idx]);
        }
    }
    (fps, tps, thresholds)
}

/// Compute the ROC curve of a binary problem.
///
/// With `drop_intermediate`, collinear points that do not change the shape
/// of the curve are removed. A `(0, 0)` point with an infinite threshold is
/// always prepended.
pub fn roc_curve(y_true: &[f64], y_score: &[f64], drop_intermediate: bool) -> Result<RocCurve, MetricError> {
    const NAME: &str = "roc_curve";
    check_lengths(NAME, y_true, y_score)?;
    let (mut fps, mut tps, mut thresholds) = binary_clf_curve(y_true, y_score);

    if drop_intermediate && fps.len() > 2 {
        let n = fps.len();
        let keep: Vec<usize> = (0..n)
            .filter(|&i| {
                if i == 0 || i == n - 1 {
                    return true;
                }
                let d2_fps = fps[i + 1] - 2.0 * fps[i] + fps[i - 1];
                let d2_tps = tps[i + 1] - 2.0 * tps[i] + tps[i - 1];
                d2_fps != 0.0 || d2_tps != 0.0
            })
            .collect();
        fps = keep.iter().map(|&i| fps[i]).collect();
        tps = keep.iter().map(|&i| tps[i]).collect();
        thresholds = keep.iter().map(|&i| thresholds[i]).collect();
    }

    fps.insert(0, 0.0);
    tps.insert(0, 0.0);
    thresholds.insert(0, f64::INFINITY);

    let total_fp = *fps.last().unwrap_or(&0.0);
    let total_tp = *tps.last().unwrap_or(&0.0);
    if total_fp <= 0.0 || total_tp <= 0.0 {
        return Err(MetricError::SingleClass { metric: NAME });
    }

    Ok(RocCurve {
        fpr: fps.iter().map(|v| v / total_fp).collect(),
        tpr: tps.iter().map(|v| v / total_tp).collect(),
        thresholds,
    })
}

/// Compute the precision-recall curve of a binary problem.
pub fn precision_recall_curve(y_true: &[f64], y_score: &[f64]) -> Result<PrCurve, MetricError> {
    const NAME: &str = "precision_recall_curve";
    check_lengths(NAME, y_true, y_score)?;
    let (fps, tps, thresholds) = binary_clf_curve(y_true, y_score);

    let total_tp = *tps.last().unwrap_or(&0.0);
    if total_tp <= 0.0 {
        return Err(MetricError::SingleClass { metric: NAME });
    }

    let mut precision: Vec<f64> = tps
        .iter()
        .zip(fps.iter())
        .map(|(tp, fp)| tp / (tp + fp))
        .rev()
        .collect();
    let mut recall: Vec<f64> = tps.iter().map(|tp| tp / total_tp).rev().collect();
    precision.push(1.0);
    recall.push(0.0);

    Ok(PrCurve {
        precision,
        recall,
        thresholds: thresholds.into_iter().rev().collect(),
    })
}

pub fn roc_auc_score(y_true: &[f64], y_score: &[f64]) -> Result<f64, MetricError> {
    let curve = roc_curve(y_true, y_score, true).map_err(|e| match e {
        MetricError::SingleClass { .. } => MetricError::SingleClass {
            metric: "roc_auc_score",
        },
        other => other,
    })?;
    Ok(trapezoid(&curve.fpr, &curve.tpr))
}

/// Step-wise area under the precision-recall curve.
pub fn average_precision_score(y_true: &[f64], y_score: &[f64]) -> Result<f64, MetricError> {
    let curve = precision_recall_curve(y_true, y_score).map_err(|e| match e {
        MetricError::SingleClass { .. } => MetricError::SingleClass {
            metric: "average_precision_score",
        },
        other => other,
    })?;
    let ap = curve
        .recall
        .windows(2)
        .zip(curve.precision.iter())
        .map(|(r, p)| (r[0] - r[1]) * p)
        .sum();
    Ok(ap)
}

pub fn accuracy_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// Mean of per-class recall over the classes present in `y_true`.
pub fn balanced_accuracy_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64, MetricError> {
    let (labels, cm) = confusion_matrix(y_true, y_pred);
    let mut recalls = Vec::new();
    for (i, _) in labels.iter().enumerate() {
        let support: usize = cm.row(i).sum();
        if support > 0 {
            recalls.push(cm[(i, i)] as f64 / support as f64);
        }
    }
    if recalls.is_empty() {
        return Err(MetricError::Empty {
            metric: "balanced_accuracy_score",
        });
    }
    Ok(recalls.iter().sum::<f64>() / recalls.len() as f64)
}

/// Confusion counts for a binary problem with positive class `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinaryCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl BinaryCounts {
    pub fn new(y_true: &[f64], y_pred: &[f64]) -> Self {
        let mut c = BinaryCounts::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (is_positive(t), is_positive(p)) {
                (true, true) => c.tp += 1,
                (false, true) => c.fp += 1,
                (false, false) => c.tn += 1,
                (true, false) => c.fn_ += 1,
            }
        }
        c
    }

    /// Zero when nothing was predicted positive.
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Zero when there are no positives.
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        ratio(2 * self.tp, 2 * self.tp + self.fp + self.fn_)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Confusion matrix over the sorted union of labels in `y_true` and
/// `y_pred`. Rows are true labels, columns predicted labels.
pub fn confusion_matrix(y_true: &[f64], y_pred: &[f64]) -> (Vec<f64>, Array2<usize>) {
    let mut labels: Vec<f64> = y_true.iter().chain(y_pred.iter()).copied().collect();
    labels.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    labels.dedup();

    let index = |v: f64| labels.iter().position(|&l| l == v);
    let mut cm = Array2::<usize>::zeros((labels.len(), labels.len()));
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if let (Some(i), Some(j)) = (index(t), index(p)) {
            cm[(i, j)] += 1;
        }
    }
    (labels, cm)
}

pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / y_true.len() as f64
}

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64
}

/// Coefficient of determination. A constant `y_true` scores 1.0 when
/// predicted exactly and 0.0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len() as f64;
    let mean = y_true.iter().sum::<f64>() / n;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    const Y: [f64; 4] = [0.0, 0.0, 1.0, 1.0];
    const SCORES: [f64; 4] = [0.1, 0.4, 0.35, 0.8];

    #[test]
    fn test_roc_curve_reference_values() {
        let roc = roc_curve(&Y, &SCORES, true).unwrap();
        assert_eq!(roc.fpr, vec![0.0, 0.0, 0.5, 0.5, 1.0]);
        assert_eq!(roc.tpr, vec![0.0, 0.5, 0.5, 1.0, 1.0]);
        assert!(roc.thresholds[0].is_infinite());
        assert!((roc_auc_score(&Y, &SCORES).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_roc_drop_intermediate_keeps_corners() {
        let y = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let s = [0.1, 0.2, 0.3, 0.7, 0.8, 0.9];
        let full = roc_curve(&y, &s, false).unwrap();
        let dropped = roc_curve(&y, &s, true).unwrap();
        assert!(dropped.fpr.len() < full.fpr.len());
        assert_eq!(dropped.fpr, vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(dropped.tpr, vec![0.0, 1.0 / 3.0, 1.0, 1.0]);
    }

    #[test]
    fn test_average_precision_reference_value() {
        let ap = average_precision_score(&Y, &SCORES).unwrap();
        assert!((ap - 0.8333333333333333).abs() < 1e-12, "ap = {}", ap);
        let pr = precision_recall_curve(&Y, &SCORES).unwrap();
        assert_eq!(pr.recall.last(), Some(&0.0));
        assert_eq!(pr.precision.last(), Some(&1.0));
    }

    #[test]
    fn test_single_class_is_an_error() {
        let y = [1.0, 1.0, 1.0];
        let s = [0.2, 0.5, 0.9];
        assert!(matches!(
            roc_auc_score(&y, &s),
            Err(MetricError::SingleClass { metric: "roc_auc_score" })
        ));
    }

    #[test]
    fn test_label_metric_rejects_probabilities() {
        let err = Metric::Accuracy.score(&Y, &SCORES).unwrap_err();
        assert_eq!(err, MetricError::ContinuousInput { metric: "accuracy_score" });
        let acc = Metric::Accuracy.score(&Y, &[0.0, 1.0, 1.0, 1.0]).unwrap();
        assert!((acc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_binary_counts_and_f1() {
        let c = BinaryCounts::new(&Y, &[0.0, 1.0, 1.0, 0.0]);
        assert_eq!(c, BinaryCounts { tp: 1, fp: 1, tn: 1, fn_: 1 });
        assert!((c.f1() - 0.5).abs() < 1e-12);
        let none = BinaryCounts::new(&Y, &[0.0; 4]);
        assert_eq!(none.precision(), 0.0);
    }

    #[test]
    fn test_confusion_matrix_layout() {
        let (labels, cm) = confusion_matrix(&Y, &[0.0, 1.0, 1.0, 1.0]);
        assert_eq!(labels, vec![0.0, 1.0]);
        assert_eq!(cm[(0, 0)], 1);
        assert_eq!(cm[(0, 1)], 1);
        assert_eq!(cm[(1, 1)], 2);
        assert_eq!(cm[(1, 0)], 0);
    }

    #[test]
    fn test_regression_metrics() {
        let t = [1.0, 2.0, 3.0];
        let p = [1.0, 2.0, 4.0];
        assert!((mean_absolute_error(&t, &p) - 1.0 / 3.0).abs() < 1e-12);
        assert!((r2_score(&t, &p) - 0.5).abs() < 1e-12);
        assert!(Metric::MeanAbsoluteError.selection_score(&t, &p).unwrap() < 0.0);
    }

    #[test]
    fn test_metric_names_parse() {
        assert_eq!("roc_auc".parse::<Metric>().unwrap(), Metric::RocAuc);
        assert_eq!("average_precision_score".parse::<Metric>().unwrap(), Metric::AveragePrecision);
        assert_eq!("neg_mean_absolute_error".parse::<Metric>().unwrap(), Metric::MeanAbsoluteError);
        assert!("not_a_metric".parse::<Metric>().is_err());
    }
}
