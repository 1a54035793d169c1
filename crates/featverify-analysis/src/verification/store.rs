use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ndarray::{Array1, Array2};

use crate::error::{AnalysisError, Result};
use crate::models::Estimator;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EstimatorKey {
    pub model: String,
    pub seed: u64,
    pub feature_set: String,
}

impl EstimatorKey {
    pub fn new(model: &str, seed: u64, feature_set: &str) -> Self {
        EstimatorKey {
            model: model.to_string(),
            seed,
            feature_set: feature_set.to_string(),
        }
    }
}

impl fmt::Display for EstimatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / seed {} / {}", self.model, self.seed, self.feature_set)
    }
}

/// Normalised held-out rows of one (seed, feature set) split.
#[derive(Debug, Clone)]
pub struct HeldOut {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

/// Fitted estimators keyed by (model, seed, feature set), plus the
/// held-out split each (seed, feature set) pair is evaluated on.
///
/// Entries are write-once: storing a second estimator under an existing
/// key is an error.
#[derive(Default)]
pub struct EstimatorStore {
    estimators: BTreeMap<EstimatorKey, Arc<dyn Estimator>>,
    held_out: BTreeMap<(u64, String), HeldOut>,
}

impl EstimatorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: EstimatorKey, estimator: Arc<dyn Estimator>) -> Result<()> {
        if self.estimators.contains_key(&key) {
            return Err(AnalysisError::DuplicateEstimator(key.to_string()));
        }
        self.estimators.insert(key, estimator);
        Ok(())
    }

    pub fn get(&self, model: &str, seed: u64, feature_set: &str) -> Option<&Arc<dyn Estimator>> {
        self.estimators.get(&EstimatorKey::new(model, seed, feature_set))
    }

    pub fn insert_held_out(&mut self, seed: u64, feature_set: &str, held_out: HeldOut) -> Result<()> {
        let key = (seed, feature_set.to_string());
        if self.held_out.contains_key(&key) {
            return Err(AnalysisError::DuplicateEstimator(format!(
                "held-out split of seed {} / {}",
                seed, feature_set
            )));
        }
        self.held_out.insert(key, held_out);
        Ok(())
    }

    pub fn held_out(&self, seed: u64, feature_set: &str) -> Option<&HeldOut> {
        self.held_out.get(&(seed, feature_set.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &EstimatorKey> {
        self.estimators.keys()
    }

    pub fn len(&self) -> usize {
        self.estimators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimators.is_empty()
    }
}

impl fmt::Debug for EstimatorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EstimatorStore")
            .field("estimators", &self.estimators.keys().collect::<Vec<_>>())
            .field("held_out", &self.held_out.keys().collect::<Vec<_>>())
            .finish()
    }
}
