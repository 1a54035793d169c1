use ndarray::{Array1, Array2};

use crate::config::LearnTask;
use crate::error::Result;

/// Common contract of every model used for verification.
///
/// Labels follow the crate convention: `1.0` for the positive class and
/// `0.0` for the negative class. Regressors predict the target directly.
pub trait Estimator: Send + Sync {
    /// Fit the model on a feature matrix and target vector.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Hard predictions: class labels for classifiers, values for regressors.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Margin scores, if the model exposes them.
    fn decision_function(&self, _x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        None
    }

    /// Probability of the positive class, if the model exposes it.
    fn predict_proba(&self, _x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        None
    }

    /// Continuous ranking scores: the decision function when present,
    /// the positive-class probability otherwise.
    fn scores(&self, x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        self.decision_function(x).or_else(|| self.predict_proba(x))
    }

    fn name(&self) -> &str;

    fn task(&self) -> LearnTask;
}

/// Convert a label vector to the boolean targets expected by linfa
/// classifiers.
pub(crate) fn bool_targets(y: &Array1<f64>) -> Array1<bool> {
    y.mapv(|v| v == 1.0)
}

/// Ensure a classification target holds both classes and nothing else.
pub(crate) fn check_binary_target(model: &str, y: &Array1<f64>) -> Result<()> {
    if let Some(bad) = y.iter().find(|v| **v != 0.0 && **v != 1.0) {
        return Err(crate::error::AnalysisError::InvalidData(format!(
            "{} expects 0/1 labels, found {}",
            model, bad
        )));
    }
    let positives = y.iter().filter(|v| **v == 1.0).count();
    if positives == 0 || positives == y.len() {
        return Err(crate::error::AnalysisError::InvalidData(format!(
            "{} needs both classes in the training labels",
            model
        )));
    }
    Ok(())
}

pub(crate) fn check_rows(model: &str, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(crate::error::AnalysisError::Shape(format!(
            "{}: {} feature rows for {} labels",
            model,
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 {
        return Err(crate::error::AnalysisError::InvalidData(format!(
            "{}: cannot fit on an empty training set",
            model
        )));
    }
    Ok(())
}

pub(crate) fn not_fitted(model: &str) -> crate::error::AnalysisError {
    crate::error::AnalysisError::model(model, "predict called before fit")
}
