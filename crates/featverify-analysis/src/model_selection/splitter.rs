//! Cross-validation fold generation.
use std::collections::BTreeMap;

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{AnalysisError, Result};

/// A single train/validation split, as row indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Cross-validation strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Splitter {
    /// Contiguous folds in row order; the first `n % k` folds get one extra row.
    KFold { n_splits: usize },
    /// Folds preserving class proportions, shuffled within each class.
    StratifiedKFold { n_splits: usize, seed: u64 },
}

impl Splitter {
    pub fn n_splits(&self) -> usize {
        match self {
            Splitter::KFold { n_splits } | Splitter::StratifiedKFold { n_splits, .. } => *n_splits,
        }
    }

    /// Generate folds for the labels `y`.
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<Fold>> {
        let n_samples = y.len();
        let n_splits = self.n_splits();
        if n_splits < 2 {
            return Err(AnalysisError::Config("n_splits must be at least 2".to_string()));
        }
        if n_samples < n_splits {
            return Err(AnalysisError::InvalidData(format!(
                "cannot make {} folds from {} samples",
                n_splits, n_samples
            )));
        }

        let folds = match self {
            Splitter::KFold { .. } => {
                let mut folds = Vec::with_capacity(n_splits);
                let mut start = 0;
                for k in 0..n_splits {
                    let size = n_samples / n_splits + usize::from(k < n_samples % n_splits);
                    folds.push((start..start + size).collect::<Vec<_>>());
                    start += size;
                }
                folds
            }
            Splitter::StratifiedKFold { seed, .. } => stratified_folds(y, n_splits, *seed),
        };

        Ok((0..n_splits)
            .map(|k| Fold {
                train: folds
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != k)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect(),
                test: folds[k].clone(),
            })
            .collect())
    }
}

/// Group row indices by class value, ordered by class.
pub(crate) fn class_indices(y: &Array1<f64>) -> BTreeMap<i64, Vec<usize>> {
    let mut classes: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        classes.entry(val.round() as i64).or_default().push(idx);
    }
    classes
}

fn stratified_folds(y: &Array1<f64>, n_splits: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut classes = class_indices(y);
    for (class, indices) in classes.iter_mut() {
        if indices.len() < n_splits {
            log::warn!(
                "The least populated class ({}) has only {} members, which is less than n_splits={}",
                class,
                indices.len(),
                n_splits
            );
        }
        indices.shuffle(&mut rng);
    }

    // deal rows round-robin, continuing across classes so fold sizes stay balanced
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
    let mut slot = 0;
    for indices in classes.values() {
        for &idx in indices {
            folds[slot % n_splits].push(idx);
            slot += 1;
        }
    }
    for fold in folds.iter_mut() {
        fold.sort_unstable();
    }
    folds
}
