//! Preprocessing shared by exploration and verification.
//!
//! Provides imputation of missing feature values, target statistics, a
//! standard scaler fitted on training rows only, and `Preprocessor`, which
//! chains these with the train/test split for one seed.
use ndarray::{Array1, Array2, Axis};

use crate::config::{DataSplitConfig, ImputeMethod, LearnTask};
use crate::data_handling::Frame;
use crate::data_split::{random_oversample, train_test_split, TrainTest};
use crate::error::{AnalysisError, Result};
use crate::stats::{mean_std, nan_mean, nan_percentile};

/// Fills missing values column by column.
#[derive(Debug, Clone, Copy)]
pub struct Imputer {
    method: ImputeMethod,
}

impl Imputer {
    pub fn new(method: ImputeMethod) -> Self {
        Imputer { method }
    }

    /// Replace `NaN` in `columns` with the column mean or median.
    pub fn fit_transform<S: AsRef<str>>(&self, frame: &Frame, columns: &[S]) -> Result<Frame> {
        let mut out = frame.clone();
        for name in columns {
            let name = name.as_ref();
            let col = frame.column(name)?;
            let missing = col.iter().filter(|v| v.is_nan()).count();
            if missing == 0 {
                continue;
            }
            let fill = match self.method {
                ImputeMethod::Mean => nan_mean(col),
                ImputeMethod::Median => nan_percentile(col, 50.0),
            };
            if fill.is_nan() {
                return Err(AnalysisError::InvalidData(format!(
                    "column '{}' has no observed values to impute from",
                    name
                )));
            }
            log::debug!("imputing {} missing values in '{}' with {:.4}", missing, name, fill);
            let filled = col.mapv(|v| if v.is_nan() { fill } else { v });
            out.set_column(name, &filled)?;
        }
        Ok(out)
    }
}

/// Summary of the target column after dropping unlabelled rows.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSummary {
    /// Row count per class value, ordered by class.
    Classes(Vec<(f64, usize)>),
    Continuous { mean: f64, std: f64 },
}

/// Drop rows with a missing target and log the target distribution.
///
/// Binary classification targets must be coded `0`/`1` and contain both
/// classes.
pub fn target_statistics(frame: &Frame, target_label: &str, task: LearnTask) -> Result<(Frame, TargetSummary)> {
    let target = frame.column(target_label)?;
    let keep: Vec<usize> = (0..frame.nrows()).filter(|&i| !target[i].is_nan()).collect();
    if keep.len() < frame.nrows() {
        log::warn!(
            "dropping {} rows with a missing {}",
            frame.nrows() - keep.len(),
            target_label
        );
    }
    let frame = frame.select_rows(&keep);
    let target = frame.column(target_label)?;

    let summary = if task.is_classification() {
        let mut counts: Vec<(f64, usize)> = Vec::new();
        for &v in target.iter() {
            match counts.iter_mut().find(|(c, _)| *c == v) {
                Some((_, n)) => *n += 1,
                None => counts.push((v, 1)),
            }
        }
        counts.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        if task == LearnTask::BinaryClassification {
            if counts.iter().any(|(c, _)| *c != 0.0 && *c != 1.0) {
                return Err(AnalysisError::InvalidData(format!(
                    "{} must be coded 0/1 for binary classification, found classes {:?}",
                    target_label,
                    counts.iter().map(|(c, _)| *c).collect::<Vec<_>>()
                )));
            }
            if counts.len() < 2 {
                return Err(AnalysisError::InvalidData(format!(
                    "{} contains a single class",
                    target_label
                )));
            }
        }
        for (class, n) in &counts {
            log::info!(
                "{} = {}: {} rows ({:.1}%)",
                target_label,
                class,
                n,
                100.0 * *n as f64 / frame.nrows() as f64
            );
        }
        TargetSummary::Classes(counts)
    } else {
        let values: Vec<f64> = target.to_vec();
        let (mean, std) = mean_std(&values);
        log::info!("{}: mean {:.3}, std {:.3}", target_label, mean, std);
        TargetSummary::Continuous { mean, std }
    };
    Ok((frame, summary))
}

/// Per-column z-score standardisation.
#[derive(Clone, Debug)]
pub struct Normaliser {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

impl Normaliser {
    /// Minimum stddev to avoid division by zero when transforming.
    const MIN_STD: f64 = 1e-6;

    /// Fit on the rows of `x` (samples are rows, features are columns).
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(AnalysisError::InvalidData(
                "cannot fit a normaliser on an empty matrix".to_string(),
            ));
        }
        let mean = x.mean_axis(Axis(0)).ok_or_else(|| {
            AnalysisError::InvalidData("cannot fit a normaliser on an empty matrix".to_string())
        })?;
        let std = x.std_axis(Axis(0), 0.0).mapv(|s| s.max(Self::MIN_STD));
        Ok(Normaliser { mean, std })
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.mean.len() {
            return Err(AnalysisError::Shape(format!(
                "normaliser fitted on {} columns, got {}",
                self.mean.len(),
                x.ncols()
            )));
        }
        Ok((x - &self.mean) / &self.std)
    }

    pub fn fit_transform(x: &Array2<f64>) -> Result<(Self, Array2<f64>)> {
        let normaliser = Self::fit(x)?;
        let out = normaliser.transform(x)?;
        Ok((normaliser, out))
    }
}

/// Imputation, target statistics and train/test split for one seed.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    pub target_label: String,
    pub metadata: Vec<String>,
    /// Columns to impute; empty means every feature column.
    pub features: Vec<String>,
    pub task: LearnTask,
    pub impute: ImputeMethod,
    pub split: DataSplitConfig,
}

impl Preprocessor {
    pub fn run(&self, frame: &Frame, seed: u64) -> Result<TrainTest> {
        let (frame, _) = target_statistics(frame, &self.target_label, self.task)?;
        let features = if self.features.is_empty() {
            frame.feature_names(&self.target_label, &self.metadata)
        } else {
            self.features.clone()
        };
        let frame = Imputer::new(self.impute).fit_transform(&frame, &features)?;
        let mut split = train_test_split(&frame, &self.target_label, self.task, self.split.test_frac, seed)?;
        if self.split.oversample && self.task.is_classification() {
            split.train = random_oversample(&split.train, &self.target_label, seed)?;
        }
        Ok(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_imputer_mean_and_median() {
        let f = Frame::from_columns(vec![("a", vec![1.0, f64::NAN, 3.0, 8.0]), ("y", vec![0.0, 1.0, 0.0, 1.0])]).unwrap();
        let mean = Imputer::new(ImputeMethod::Mean).fit_transform(&f, &["a"]).unwrap();
        assert_eq!(mean.column("a").unwrap()[1], 4.0);
        let median = Imputer::new(ImputeMethod::Median).fit_transform(&f, &["a"]).unwrap();
        assert_eq!(median.column("a").unwrap()[1], 3.0);
    }

    #[test]
    fn test_target_statistics_drops_unlabelled_rows() {
        let f = Frame::from_columns(vec![("a", vec![1.0, 2.0, 3.0]), ("y", vec![0.0, f64::NAN, 1.0])]).unwrap();
        let (kept, summary) = target_statistics(&f, "y", LearnTask::BinaryClassification).unwrap();
        assert_eq!(kept.nrows(), 2);
        assert_eq!(summary, TargetSummary::Classes(vec![(0.0, 1), (1.0, 1)]));
    }

    #[test]
    fn test_target_statistics_rejects_non_binary_codes() {
        let f = Frame::from_columns(vec![("y", vec![0.0, 2.0, 1.0])]).unwrap();
        assert!(target_statistics(&f, "y", LearnTask::BinaryClassification).is_err());
    }

    #[test]
    fn test_preprocessor_imputes_only_requested_features() {
        let n = 20;
        let f = Frame::from_columns(vec![
            ("lvef", (0..n).map(|i| if i == 3 { f64::NAN } else { i as f64 }).collect()),
            ("notes", vec![f64::NAN; n]),
            ("y", (0..n).map(|i| (i % 2) as f64).collect()),
        ])
        .unwrap();
        let mut pre = Preprocessor {
            target_label: "y".to_string(),
            metadata: Vec::new(),
            features: Vec::new(),
            task: LearnTask::BinaryClassification,
            impute: ImputeMethod::Mean,
            split: DataSplitConfig::default(),
        };
        assert!(matches!(pre.run(&f, 1), Err(AnalysisError::InvalidData(_))));

        pre.features = vec!["lvef".to_string()];
        let split = pre.run(&f, 1).unwrap();
        assert!(split.train.column("lvef").unwrap().iter().all(|v| !v.is_nan()));
        assert!(split.test.column("lvef").unwrap().iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn test_normaliser_uses_training_statistics() {
        let train = array![[1.0, 10.0], [3.0, 10.0]];
        let (norm, z) = Normaliser::fit_transform(&train).unwrap();
        assert_eq!(z, array![[-1.0, 0.0], [1.0, 0.0]]);
        let test = array![[5.0, 10.0]];
        assert_eq!(norm.transform(&test).unwrap(), array![[3.0, 0.0]]);
    }
}
