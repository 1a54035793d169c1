pub mod search;
pub mod splitter;

use ndarray::{Array1, Array2};

use crate::error::Result;
use crate::metrics::Metric;
use crate::models::Estimator;

pub use search::{expand_grid, CandidateResult, CrossValidation, SearchResult};
pub use splitter::{Fold, Splitter};

/// Score a fitted estimator on held-out rows, oriented so larger is better.
///
/// Ranking metrics use the estimator's continuous scores when it has any;
/// everything else is computed on hard predictions.
pub fn score_estimator(estimator: &dyn Estimator, metric: Metric, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
    let y_true = y.to_vec();
    if metric.needs_scores() {
        if let Some(scores) = estimator.scores(x) {
            return Ok(metric.selection_score(&y_true, &scores?.to_vec())?);
        }
    }
    let pred = estimator.predict(x)?;
    Ok(metric.selection_score(&y_true, &pred.to_vec())?)
}
