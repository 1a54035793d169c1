use crate::config::{LearnTask, SelectionConfig};
use crate::error::Result;
use crate::metrics::Metric;
use crate::model_selection::Splitter;
use crate::models::estimator::Estimator;
use crate::models::gbdt::GbdtEstimator;
use crate::models::linear::LinearEstimator;
use crate::models::logistic::LogisticEstimator;
use crate::models::params::ParamSet;
use crate::models::svm::SvmEstimator;
use crate::models::ModelKind;

/// Everything needed to build an untrained estimator, so that search can
/// create a fresh copy for every fold and candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorSpec {
    pub model: ModelKind,
    pub task: LearnTask,
    pub seed: u64,
    pub params: ParamSet,
}

impl EstimatorSpec {
    pub fn new(model: ModelKind, task: LearnTask, seed: u64) -> Self {
        EstimatorSpec {
            model,
            task,
            seed,
            params: ParamSet::new(),
        }
    }

    pub fn with_params(&self, params: ParamSet) -> Self {
        EstimatorSpec {
            params,
            ..self.clone()
        }
    }

    /// Build a boxed, unfitted estimator.
    pub fn build(&self) -> Result<Box<dyn Estimator>> {
        self.model.check_task(self.task)?;
        let estimator: Box<dyn Estimator> = match self.model {
            ModelKind::Gbdt => Box::new(GbdtEstimator::new(self.task, &self.params)?),
            ModelKind::LogisticRegression => Box::new(LogisticEstimator::new(&self.params)?),
            ModelKind::Svm => Box::new(SvmEstimator::new(&self.params)?),
            ModelKind::LinearRegression => Box::new(LinearEstimator::new(&self.params)?),
        };
        Ok(estimator)
    }
}

/// Resolve a model name for a learning task into an estimator spec, the
/// cross-validation splitter to search it with and the selection metric.
///
/// Classification uses shuffled stratified folds seeded with `seed`;
/// regression uses plain contiguous folds.
pub fn init_estimator(
    model: &str,
    learn_task: LearnTask,
    seed: u64,
    selection: &SelectionConfig,
) -> Result<(EstimatorSpec, Splitter, Metric)> {
    let kind: ModelKind = model.parse()?;
    kind.check_task(learn_task)?;
    let splitter = if learn_task.is_classification() {
        Splitter::StratifiedKFold {
            n_splits: selection.n_splits,
            seed,
        }
    } else {
        Splitter::KFold {
            n_splits: selection.n_splits,
        }
    };
    let scoring = selection.scoring_for(learn_task)?;
    Ok((EstimatorSpec::new(kind, learn_task, seed), splitter, scoring))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;

    #[test]
    fn test_init_estimator_classification() {
        let selection = SelectionConfig::default();
        let (spec, splitter, scoring) =
            init_estimator("gbdt", LearnTask::BinaryClassification, 7, &selection).unwrap();
        assert_eq!(spec.model, ModelKind::Gbdt);
        assert_eq!(splitter, Splitter::StratifiedKFold { n_splits: 5, seed: 7 });
        assert_eq!(scoring, Metric::RocAuc);
        assert_eq!(spec.build().unwrap().name(), "gbdt");
    }

    #[test]
    fn test_init_estimator_regression() {
        let selection = SelectionConfig::default();
        let (_, splitter, scoring) =
            init_estimator("linear_regression", LearnTask::Regression, 0, &selection).unwrap();
        assert_eq!(splitter, Splitter::KFold { n_splits: 5 });
        assert_eq!(scoring, Metric::MeanAbsoluteError);
    }

    #[test]
    fn test_init_estimator_rejects_unsupported() {
        let selection = SelectionConfig::default();
        assert!(matches!(
            init_estimator("gbdt", LearnTask::MultiClassification, 0, &selection),
            Err(AnalysisError::UnsupportedTask(_))
        ));
        assert!(matches!(
            init_estimator("random_forest", LearnTask::BinaryClassification, 0, &selection),
            Err(AnalysisError::Config(_))
        ));
        assert!(init_estimator("svm", LearnTask::Regression, 0, &selection).is_err());
    }
}
