//! Model-agnostic permutation importance.
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{AnalysisError, Result};
use crate::metrics::Metric;
use crate::model_selection::score_estimator;
use crate::models::Estimator;
use crate::stats::mean_std;

#[derive(Debug, Clone)]
pub struct PermutationImportance {
    /// Score drop per feature and repeat, `(n_features, n_repeats)`.
    pub importances: Array2<f64>,
    pub importances_mean: Array1<f64>,
    pub importances_std: Array1<f64>,
    pub baseline: f64,
}

impl PermutationImportance {
    /// Feature indices from most to least important. `NaN` sorts last.
    pub fn ranking(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.importances_mean.len()).collect();
        order.sort_by(|&a, &b| {
            let (va, vb) = (self.importances_mean[a], self.importances_mean[b]);
            let va = if va.is_nan() { f64::NEG_INFINITY } else { va };
            let vb = if vb.is_nan() { f64::NEG_INFINITY } else { vb };
            vb.total_cmp(&va)
        });
        order
    }
}

/// Mean decrease of `metric` when each column of `x` is shuffled in turn.
///
/// The estimator must already be fitted. Shuffles are drawn from one
/// `StdRng` seeded with `seed`, so results are reproducible.
pub fn permutation_importance(
    estimator: &dyn Estimator,
    metric: Metric,
    x: &Array2<f64>,
    y: &Array1<f64>,
    n_repeats: usize,
    seed: u64,
) -> Result<PermutationImportance> {
    if n_repeats == 0 {
        return Err(AnalysisError::Config("permutation importance needs at least one repeat".to_string()));
    }
    let baseline = score_estimator(estimator, metric, x, y)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut importances = Array2::<f64>::zeros((x.ncols(), n_repeats));
    let mut permuted = x.clone();
    let mut order: Vec<usize> = (0..x.nrows()).collect();

    for j in 0..x.ncols() {
        let original = x.column(j);
        for r in 0..n_repeats {
            order.shuffle(&mut rng);
            for (i, &src) in order.iter().enumerate() {
                permuted[(i, j)] = original[src];
            }
            importances[(j, r)] = baseline - score_estimator(estimator, metric, &permuted, y)?;
        }
        permuted.column_mut(j).assign(&original);
    }

    let stats: Vec<(f64, f64)> = importances.rows().into_iter().map(|r| mean_std(&r.to_vec())).collect();
    Ok(PermutationImportance {
        importances_mean: stats.iter().map(|s| s.0).collect(),
        importances_std: stats.iter().map(|s| s.1).collect(),
        importances,
        baseline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LearnTask;
    use crate::models::{EstimatorSpec, ModelKind};

    #[test]
    fn test_informative_feature_ranks_first() {
        let n = 60;
        let y = Array1::from_iter((0..n).map(|i| (i % 2) as f64));
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 1 {
                if y[i] == 1.0 { 2.0 } else { -2.0 }
            } else {
                ((i * 7) % 11) as f64 / 11.0
            }
        });
        let mut estimator = EstimatorSpec::new(ModelKind::LogisticRegression, LearnTask::BinaryClassification, 0)
            .build()
            .unwrap();
        estimator.fit(&x, &y).unwrap();

        let imp = permutation_importance(estimator.as_ref(), Metric::Accuracy, &x, &y, 3, 42).unwrap();
        assert_eq!(imp.importances.dim(), (2, 3));
        assert_eq!(imp.ranking(), vec![1, 0]);
        assert!(imp.importances_mean[1] > 0.2);

        let again = permutation_importance(estimator.as_ref(), Metric::Accuracy, &x, &y, 3, 42).unwrap();
        assert_eq!(imp.importances, again.importances);
    }
}
