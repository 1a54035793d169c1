use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::{Array1, Array2};

use crate::config::LearnTask;
use crate::error::{AnalysisError, Result};
use crate::models::estimator::{check_binary_target, check_rows, not_fitted, Estimator};
use crate::models::params::{ParamReader, ParamSet};

pub(crate) const PARAMS: &[&str] = &[
    "learning_rate",
    "max_depth",
    "n_estimators",
    "min_leaf_size",
    "training_optimization_level",
    "debug",
];

/// Gradient Boosting Decision Tree (GBDT) classifier or regressor.
///
/// Classification trains with the log-likelihood loss on ±1 labels, so the
/// decision function is the boosted margin and `predict_proba` the logistic
/// transform of it.
pub struct GbdtEstimator {
    model: Option<GBDT>,
    task: LearnTask,
    learning_rate: f32,
    max_depth: u32,
    n_estimators: usize,
    min_leaf_size: usize,
    training_optimization_level: u8,
    debug: bool,
}

impl GbdtEstimator {
    pub fn new(task: LearnTask, params: &ParamSet) -> Result<Self> {
        let p = ParamReader::new("gbdt", params, PARAMS)?;
        let training_optimization_level = p.usize("training_optimization_level", 2)?;
        if training_optimization_level > 2 {
            return Err(AnalysisError::Config(
                "gbdt training_optimization_level must be 0, 1 or 2".to_string(),
            ));
        }
        Ok(GbdtEstimator {
            model: None,
            task,
            learning_rate: p.positive_f64("learning_rate", 0.1)? as f32,
            max_depth: p.usize("max_depth", 6)? as u32,
            n_estimators: p.usize("n_estimators", 50)?,
            min_leaf_size: p.usize("min_leaf_size", 1)?,
            training_optimization_level: training_optimization_level as u8,
            debug: p.bool("debug", false)?,
        })
    }

    fn config(&self, feature_size: usize) -> Config {
        let mut config = Config::new();
        config.set_feature_size(feature_size);
        config.set_shrinkage(self.learning_rate);
        config.set_max_depth(self.max_depth);
        config.set_iterations(self.n_estimators);
        config.set_min_leaf_size(self.min_leaf_size);
        config.set_debug(self.debug);
        config.set_training_optimization_level(self.training_optimization_level);
        match self.task {
            LearnTask::Regression => config.set_loss("SquaredError"),
            _ => config.set_loss("LogLikelyhood"),
        }
        config
    }

    fn to_data(x: &Array2<f64>, labels: Option<&Array1<f64>>) -> DataVec {
        let mut data = DataVec::with_capacity(x.nrows());
        for (i, row) in x.rows().into_iter().enumerate() {
            let features: Vec<f32> = row.iter().map(|v| *v as f32).collect();
            let label = labels.map(|y| y[i] as f32).unwrap_or(0.0);
            data.push(Data::new_training_data(features, 1.0, label, None));
        }
        data
    }

    fn fitted(&self) -> Result<&GBDT> {
        self.model.as_ref().ok_or_else(|| not_fitted("gbdt"))
    }
}

impl Estimator for GbdtEstimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_rows("gbdt", x, y)?;
        let labels = if self.task.is_classification() {
            check_binary_target("gbdt", y)?;
            y.mapv(|v| if v == 1.0 { 1.0 } else { -1.0 })
        } else {
            y.clone()
        };

        let mut gbdt = GBDT::new(&self.config(x.ncols()));
        let mut train = Self::to_data(x, Some(&labels));
        gbdt.fit(&mut train);
        self.model = Some(gbdt);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self.fitted()?;
        let raw = model.predict(&Self::to_data(x, None));
        let out = match self.task {
            LearnTask::Regression => raw.iter().map(|v| *v as f64).collect(),
            _ => raw.iter().map(|p| if *p >= 0.5 { 1.0 } else { 0.0 }).collect(),
        };
        Ok(out)
    }

    fn decision_function(&self, x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        if !self.task.is_classification() {
            return None;
        }
        Some(self.fitted().map(|model| {
            model
                .decision_function(&Self::to_data(x, None))
                .iter()
                .map(|v| *v as f64)
                .collect()
        }))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        if !self.task.is_classification() {
            return None;
        }
        Some(self.fitted().map(|model| {
            model
                .predict(&Self::to_data(x, None))
                .iter()
                .map(|v| *v as f64)
                .collect()
        }))
    }

    fn name(&self) -> &str {
        "gbdt"
    }

    fn task(&self) -> LearnTask {
        self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> (Array2<f64>, Array1<f64>) {
        // second feature carries the label
        let x = Array2::from_shape_vec(
            (10, 3),
            vec![
                0.1, 1.0, 5.0, 0.4, -1.0, 5.0, 0.6, 1.0, 5.0, 0.9, -1.0, 5.0, 1.2, 1.0, 5.0, 1.5,
                -1.0, 5.0, 1.8, 1.0, 5.0, 2.1, -1.0, 5.0, 2.4, 1.0, 5.0, 2.7, -1.0, 5.0,
            ],
        )
        .unwrap();
        let y = Array1::from_vec(vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        (x, y)
    }

    #[test]
    fn test_gbdt_classifier_separates_toy_data() {
        let (x, y) = toy();
        let params = ParamSet::from([("n_estimators".to_string(), 20i64.into())]);
        let mut model = GbdtEstimator::new(LearnTask::BinaryClassification, &params).unwrap();
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        assert_eq!(pred, y);
        let margins = model.decision_function(&x).unwrap().unwrap();
        assert!(margins[0] > margins[1]);
        let proba = model.predict_proba(&x).unwrap().unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_gbdt_rejects_unknown_parameter() {
        let params = ParamSet::from([("depth".to_string(), 3i64.into())]);
        assert!(GbdtEstimator::new(LearnTask::BinaryClassification, &params).is_err());
    }

    #[test]
    fn test_gbdt_predict_before_fit_is_an_error() {
        let (x, _) = toy();
        let model = GbdtEstimator::new(LearnTask::Regression, &ParamSet::new()).unwrap();
        assert!(model.predict(&x).is_err());
        assert!(model.decision_function(&x).is_none());
    }
}
