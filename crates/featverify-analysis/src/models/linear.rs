use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_linear::{FittedLinearRegression, LinearRegression};
use ndarray::{Array1, Array2};

use crate::config::LearnTask;
use crate::error::{AnalysisError, Result};
use crate::models::estimator::{check_rows, not_fitted, Estimator};
use crate::models::params::{ParamReader, ParamSet};

pub(crate) const PARAMS: &[&str] = &["fit_intercept"];

/// Ordinary least squares regression.
pub struct LinearEstimator {
    model: Option<FittedLinearRegression<f64>>,
    fit_intercept: bool,
}

impl LinearEstimator {
    pub fn new(params: &ParamSet) -> Result<Self> {
        let p = ParamReader::new("linear_regression", params, PARAMS)?;
        Ok(LinearEstimator {
            model: None,
            fit_intercept: p.bool("fit_intercept", true)?,
        })
    }
}

impl Estimator for LinearEstimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_rows("linear_regression", x, y)?;
        let dataset = Dataset::new(x.to_owned(), y.to_owned());
        let model = LinearRegression::new()
            .with_intercept(self.fit_intercept)
            .fit(&dataset)
            .map_err(|e| AnalysisError::model("linear_regression", e))?;
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted("linear_regression"))?;
        let pred: Array1<f64> = model.predict(x);
        Ok(pred)
    }

    fn name(&self) -> &str {
        "linear_regression"
    }

    fn task(&self) -> LearnTask {
        LearnTask::Regression
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_recovers_exact_line() {
        let x = Array2::from_shape_vec((5, 1), vec![0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        let y = x.column(0).mapv(|v| 2.0 * v + 1.0);
        let mut model = LinearEstimator::new(&ParamSet::new()).unwrap();
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-8);
        }
        assert!(model.scores(&x).is_none());
    }
}
