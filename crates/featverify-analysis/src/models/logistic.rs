use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2};

use crate::config::LearnTask;
use crate::error::{AnalysisError, Result};
use crate::models::estimator::{bool_targets, check_binary_target, check_rows, not_fitted, Estimator};
use crate::models::params::{ParamReader, ParamSet};

pub(crate) const PARAMS: &[&str] = &["alpha", "max_iterations", "fit_intercept"];

struct Fitted {
    model: FittedLogisticRegression<f64, bool>,
    /// Whether linfa picked `true` as the class its probabilities refer to.
    pos_is_true: bool,
}

/// L2-regularised logistic regression.
pub struct LogisticEstimator {
    fitted: Option<Fitted>,
    alpha: f64,
    max_iterations: u64,
    fit_intercept: bool,
}

impl LogisticEstimator {
    pub fn new(params: &ParamSet) -> Result<Self> {
        let p = ParamReader::new("logistic_regression", params, PARAMS)?;
        let alpha = p.f64("alpha", 1.0)?;
        if alpha < 0.0 {
            return Err(AnalysisError::Config(
                "logistic_regression alpha must not be negative".to_string(),
            ));
        }
        Ok(LogisticEstimator {
            fitted: None,
            alpha,
            max_iterations: p.usize("max_iterations", 100)? as u64,
            fit_intercept: p.bool("fit_intercept", true)?,
        })
    }

    fn fitted(&self) -> Result<&Fitted> {
        self.fitted.as_ref().ok_or_else(|| not_fitted("logistic_regression"))
    }

    fn positive_probability(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let fitted = self.fitted()?;
        let p = fitted.model.predict_probabilities(x);
        Ok(if fitted.pos_is_true { p } else { p.mapv(|v| 1.0 - v) })
    }
}

impl Estimator for LogisticEstimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_rows("logistic_regression", x, y)?;
        check_binary_target("logistic_regression", y)?;
        let dataset = Dataset::new(x.to_owned(), bool_targets(y));

        let model = LogisticRegression::default()
            .alpha(self.alpha)
            .max_iterations(self.max_iterations)
            .with_intercept(self.fit_intercept)
            .fit(&dataset)
            .map_err(|e| AnalysisError::model("logistic_regression", e))?;

        // predicted label agrees with p >= 0.5 exactly when p refers to `true`
        let probe = x.slice(ndarray::s![0..1, ..]).to_owned();
        let p0 = model.predict_probabilities(&probe)[0];
        let label0: Array1<bool> = model.predict(&probe);
        let pos_is_true = label0[0] == (p0 >= 0.5);

        self.fitted = Some(Fitted { model, pos_is_true });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.positive_probability(x)?.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    fn decision_function(&self, x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        Some(self.fitted().map(|fitted| {
            let margin = x.dot(fitted.model.params()) + fitted.model.intercept();
            if fitted.pos_is_true {
                margin
            } else {
                margin.mapv(|v| -v)
            }
        }))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        Some(self.positive_probability(x))
    }

    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn task(&self) -> LearnTask {
        LearnTask::BinaryClassification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec(
            (8, 1),
            vec![-3.0, -2.0, -1.5, 0.5, -0.5, 1.5, 2.0, 3.0],
        )
        .unwrap();
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        (x, y)
    }

    #[test]
    fn test_logistic_scores_rank_positive_class_higher() {
        let (x, y) = toy();
        let mut model = LogisticEstimator::new(&ParamSet::new()).unwrap();
        model.fit(&x, &y).unwrap();

        let margin = model.decision_function(&x).unwrap().unwrap();
        let proba = model.predict_proba(&x).unwrap().unwrap();
        assert!(margin[7] > margin[0]);
        assert!(proba[7] > 0.5 && proba[0] < 0.5);
        // margins and probabilities agree in sign
        for (m, p) in margin.iter().zip(proba.iter()) {
            assert_eq!(*m >= 0.0, *p >= 0.5);
        }
        assert_eq!(model.predict(&x).unwrap()[7], 1.0);
    }

    #[test]
    fn test_logistic_requires_both_classes() {
        let (x, _) = toy();
        let y = Array1::from_elem(8, 1.0);
        let mut model = LogisticEstimator::new(&ParamSet::new()).unwrap();
        assert!(matches!(model.fit(&x, &y), Err(AnalysisError::InvalidData(_))));
    }
}
