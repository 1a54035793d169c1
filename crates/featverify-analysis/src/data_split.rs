//! Seeded train/test splitting and minority oversampling.
use ndarray::{concatenate, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::LearnTask;
use crate::data_handling::Frame;
use crate::error::{AnalysisError, Result};
use crate::model_selection::splitter::class_indices;

/// Train and held-out partitions of one frame.
#[derive(Debug, Clone)]
pub struct TrainTest {
    pub train: Frame,
    pub test: Frame,
}

/// Split rows into train and test partitions.
///
/// Classification splits are stratified on the target: each class
/// contributes `round(test_frac * class_size)` rows to the test set, at
/// least one and never all of them when it has two or more rows.
/// Regression takes a seeded random `ceil(test_frac * n)` rows.
pub fn train_test_split(
    frame: &Frame,
    target_label: &str,
    task: LearnTask,
    test_frac: f64,
    seed: u64,
) -> Result<TrainTest> {
    let y = frame.column(target_label)?.to_owned();
    let n = y.len();
    if n < 2 {
        return Err(AnalysisError::InvalidData(format!(
            "cannot split {} rows into train and test sets",
            n
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed);

    let mut test_rows = Vec::new();
    let mut train_rows = Vec::new();
    if task.is_classification() {
        for (_, mut indices) in class_indices(&y) {
            indices.shuffle(&mut rng);
            let size = indices.len();
            let mut n_test = (test_frac * size as f64).round() as usize;
            if size >= 2 {
                n_test = n_test.clamp(1, size - 1);
            }
            test_rows.extend_from_slice(&indices[..n_test]);
            train_rows.extend_from_slice(&indices[n_test..]);
        }
    } else {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);
        let n_test = ((test_frac * n as f64).ceil() as usize).clamp(1, n - 1);
        test_rows.extend_from_slice(&indices[..n_test]);
        train_rows.extend_from_slice(&indices[n_test..]);
    }

    if train_rows.is_empty() || test_rows.is_empty() {
        return Err(AnalysisError::InvalidData(
            "train/test split left one partition empty".to_string(),
        ));
    }
    train_rows.sort_unstable();
    test_rows.sort_unstable();
    log::debug!(
        "seed {}: {} train rows, {} test rows",
        seed,
        train_rows.len(),
        test_rows.len()
    );
    Ok(TrainTest {
        train: frame.select_rows(&train_rows),
        test: frame.select_rows(&test_rows),
    })
}

/// Duplicate randomly drawn rows of every smaller class until all classes
/// match the largest one. Duplicates are appended after the original rows.
pub fn random_oversample(frame: &Frame, target_label: &str, seed: u64) -> Result<Frame> {
    let y = frame.column(target_label)?.to_owned();
    let classes = class_indices(&y);
    let Some(majority) = classes.values().map(|v| v.len()).max() else {
        return Ok(frame.clone());
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let mut extra = Vec::new();
    for (class, indices) in &classes {
        let missing = majority - indices.len();
        if missing > 0 {
            log::debug!("oversampling class {} with {} extra rows", class, missing);
        }
        for _ in 0..missing {
            extra.push(indices[rng.gen_range(0..indices.len())]);
        }
    }
    if extra.is_empty() {
        return Ok(frame.clone());
    }

    let duplicated = frame.data().select(Axis(0), &extra);
    let data = concatenate(Axis(0), &[frame.data().view(), duplicated.view()])
        .map_err(|e| AnalysisError::Shape(e.to_string()))?;
    Frame::new(frame.columns().to_vec(), data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n_pos: usize, n_neg: usize) -> Frame {
        let n = n_pos + n_neg;
        let y: Vec<f64> = (0..n).map(|i| if i < n_pos { 1.0 } else { 0.0 }).collect();
        let a: Vec<f64> = (0..n).map(|i| i as f64).collect();
        Frame::from_columns(vec![("a", a), ("y", y)]).unwrap()
    }

    #[test]
    fn test_stratified_split_preserves_classes() {
        let f = frame(10, 40);
        let split = train_test_split(&f, "y", LearnTask::BinaryClassification, 0.2, 42).unwrap();
        let test_pos = split.test.column("y").unwrap().iter().filter(|v| **v == 1.0).count();
        assert_eq!(split.test.nrows(), 10);
        assert_eq!(test_pos, 2);
        assert_eq!(split.train.nrows(), 40);
    }

    #[test]
    fn test_split_is_seeded() {
        let f = frame(10, 40);
        let a = train_test_split(&f, "y", LearnTask::BinaryClassification, 0.2, 1).unwrap();
        let b = train_test_split(&f, "y", LearnTask::BinaryClassification, 0.2, 1).unwrap();
        let c = train_test_split(&f, "y", LearnTask::BinaryClassification, 0.2, 2).unwrap();
        assert_eq!(a.test, b.test);
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn test_regression_split_sizes() {
        let f = frame(5, 6);
        let split = train_test_split(&f, "y", LearnTask::Regression, 0.2, 0).unwrap();
        assert_eq!(split.test.nrows(), 3);
        assert_eq!(split.train.nrows(), 8);
    }

    #[test]
    fn test_oversample_balances_classes() {
        let f = frame(3, 7);
        let balanced = random_oversample(&f, "y", 0).unwrap();
        assert_eq!(balanced.nrows(), 14);
        let pos = balanced.column("y").unwrap().iter().filter(|v| **v == 1.0).count();
        assert_eq!(pos, 7);
        // original rows come first and are unchanged
        assert_eq!(balanced.select_rows(&(0..10).collect::<Vec<_>>()), f);
    }
}
