use linfa::dataset::Pr;
use linfa::traits::Predict;
use linfa::Dataset;
use linfa_svm::{Svm, SvmParams};
use ndarray::{Array1, Array2};

use crate::config::LearnTask;
use crate::error::{AnalysisError, Result};
use crate::models::estimator::{bool_targets, check_binary_target, check_rows, not_fitted, Estimator};
use crate::models::params::{ParamReader, ParamSet};

pub(crate) const PARAMS: &[&str] = &["c", "eps", "kernel", "gaussian_eps", "poly_constant", "poly_degree"];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kernel {
    Linear,
    Gaussian(f64),
    Polynomial(f64, f64),
}

/// Support vector classifier with Platt-scaled probability outputs.
pub struct SvmEstimator {
    model: Option<Svm<f64, Pr>>,
    c: f64,
    eps: f64,
    kernel: Kernel,
}

impl SvmEstimator {
    pub fn new(params: &ParamSet) -> Result<Self> {
        let p = ParamReader::new("svm", params, PARAMS)?;
        let kernel = match p.str("kernel", "linear")? {
            "linear" => Kernel::Linear,
            "gauss" | "rbf" => Kernel::Gaussian(p.positive_f64("gaussian_eps", 1.0)?),
            "poly" => Kernel::Polynomial(p.f64("poly_constant", 1.0)?, p.positive_f64("poly_degree", 3.0)?),
            other => {
                return Err(AnalysisError::Config(format!(
                    "unsupported svm kernel '{}', valid options are: linear, gauss, poly",
                    other
                )))
            }
        };
        Ok(SvmEstimator {
            model: None,
            c: p.positive_f64("c", 1.0)?,
            eps: p.positive_f64("eps", 1e-3)?,
            kernel,
        })
    }

    fn probabilities(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self.model.as_ref().ok_or_else(|| not_fitted("svm"))?;
        let predictions = model.predict(x.to_owned());
        Ok(predictions.targets().iter().map(|&p| *p as f64).collect())
    }
}

impl Estimator for SvmEstimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_rows("svm", x, y)?;
        check_binary_target("svm", y)?;
        let dataset = Dataset::new(x.to_owned(), bool_targets(y));

        let mut params: SvmParams<f64, Pr> = Svm::<f64, Pr>::params().eps(self.eps).pos_neg_weights(self.c, self.c);
        params = match self.kernel {
            Kernel::Linear => params.linear_kernel(),
            Kernel::Gaussian(eps) => params.gaussian_kernel(eps),
            Kernel::Polynomial(constant, degree) => params.polynomial_kernel(constant, degree),
        };

        let model = <SvmParams<f64, Pr> as linfa::traits::Fit<_, _, _>>::fit(&params, &dataset)
            .map_err(|e| AnalysisError::model("svm", e))?;
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.probabilities(x)?.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        Some(self.probabilities(x))
    }

    fn name(&self) -> &str {
        "svm"
    }

    fn task(&self) -> LearnTask {
        LearnTask::BinaryClassification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::params::ParamValue;

    #[test]
    fn test_svm_linear_kernel_probabilities() {
        let x = Array2::from_shape_vec(
            (8, 2),
            vec![-2.0, -1.0, -1.5, -2.0, -1.0, -1.5, -2.5, -0.5, 2.0, 1.0, 1.5, 2.0, 1.0, 1.5, 2.5, 0.5],
        )
        .unwrap();
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        let mut model = SvmEstimator::new(&ParamSet::new()).unwrap();
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap().unwrap();
        assert_eq!(proba.len(), 8);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(proba[4] > proba[0]);
    }

    #[test]
    fn test_svm_unknown_kernel() {
        let params = ParamSet::from([("kernel".to_string(), ParamValue::Str("sigmoid".into()))]);
        assert!(matches!(SvmEstimator::new(&params), Err(AnalysisError::Config(_))));
    }
}
