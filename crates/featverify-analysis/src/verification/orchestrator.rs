use std::sync::Arc;

use ndarray::Array2;

use crate::config::{first_duplicate, AnalysisConfig, LearnTask};
use crate::data_handling::{split_xy, Frame};
use crate::error::{AnalysisError, Result};
use crate::model_selection::CrossValidation;
use crate::models::params::describe;
use crate::models::{init_estimator, EnsembleKind, Estimator, VotingEnsemble};
use crate::preprocessing::{Normaliser, Preprocessor};
use crate::verification::store::{EstimatorKey, EstimatorStore, HeldOut};
use crate::verification::{feature_sets, FeatureSet};

/// Everything a verification run trained, ready for evaluation.
#[derive(Debug)]
pub struct VerificationRun {
    pub task: LearnTask,
    pub seeds: Vec<u64>,
    /// Base models followed by ensembles.
    pub models: Vec<String>,
    pub feature_sets: Vec<FeatureSet>,
    pub store: EstimatorStore,
}

/// Trains every configured model for each seed and feature set.
pub struct Verification<'a> {
    config: &'a AnalysisConfig,
    preprocessor: Preprocessor,
    top_features: Vec<String>,
}

impl<'a> Verification<'a> {
    pub fn new(config: &'a AnalysisConfig, top_features: &[String]) -> Result<Self> {
        if top_features.is_empty() {
            return Err(AnalysisError::Config("no top features to verify".to_string()));
        }
        let meta = &config.meta;
        if meta.learn_task == LearnTask::MultiClassification {
            log::error!("{} has not yet been implemented", meta.learn_task);
            return Err(AnalysisError::UnsupportedTask(meta.learn_task.to_string()));
        }
        if let Some(feature) = first_duplicate(top_features) {
            return Err(AnalysisError::Config(format!("top feature '{}' is listed twice", feature)));
        }
        if let Some(seed) = first_duplicate(&meta.seed) {
            return Err(AnalysisError::Config(format!("seed {} is listed twice", seed)));
        }
        let mut top_features = top_features.to_vec();
        if top_features.contains(&meta.target_label) {
            log::warn!(
                "{} was found in the top features for validation, dropping it",
                meta.target_label
            );
            top_features.retain(|f| f != &meta.target_label);
            if top_features.is_empty() {
                return Err(AnalysisError::Config("no top features left besides the target label".to_string()));
            }
        }
        let preprocessor = Preprocessor {
            target_label: meta.target_label.clone(),
            metadata: meta.metadata.clone(),
            features: top_features.clone(),
            task: meta.learn_task,
            impute: config.impute.method,
            split: config.data_split.clone(),
        };
        Ok(Verification {
            config,
            preprocessor,
            top_features,
        })
    }

    pub fn run(&self, frame: &Frame) -> Result<VerificationRun> {
        let meta = &self.config.meta;
        let models = self.config.verification.enabled_models();
        let ensembles = self.config.verification.enabled_ensembles();
        let ensemble_kinds = ensembles
            .iter()
            .map(|name| EnsembleKind::from_name(name))
            .collect::<Result<Vec<_>>>()?;
        if models.is_empty() {
            return Err(AnalysisError::Config("no verification model is enabled".to_string()));
        }
        let sets = feature_sets(&self.top_features);
        log::info!(
            "Verifying {} feature sets with {} models over {} seeds",
            sets.len(),
            models.len() + ensembles.len(),
            meta.seed.len()
        );

        let mut store = EstimatorStore::new();
        for &seed in &meta.seed {
            let split = self.preprocessor.run(frame, seed)?;
            for set in &sets {
                let train = split_xy(&split.train, &set.features, &meta.target_label)?;
                let test = split_xy(&split.test, &set.features, &meta.target_label)?;
                let (normaliser, x_train) = Normaliser::fit_transform(&train.x)?;
                let x_test = normaliser.transform(&test.x)?;

                let mut fitted: Vec<Arc<dyn Estimator>> = Vec::with_capacity(models.len());
                for model in &models {
                    log::info!("Optimising {} on {} (seed {})", model, set.name, seed);
                    let (spec, splitter, scoring) = init_estimator(model, meta.learn_task, seed, &self.config.selection)?;
                    let result = CrossValidation::new(spec, splitter, self.config.verification.param_grid(model), scoring)
                        .with_strategy(self.config.selection.search)
                        .with_workers(meta.workers)
                        .with_max_resources(self.config.selection.max_resources)
                        .fit(&x_train, &train.y)?;
                    log::info!(
                        "{} was optimised using {}: {:.3} with {}",
                        model,
                        scoring,
                        result.best_score,
                        describe(&result.best_params)
                    );
                    let estimator: Arc<dyn Estimator> = Arc::from(result.best_estimator);
                    if meta.learn_task.is_classification() {
                        warn_degenerate(estimator.as_ref(), &x_test, set)?;
                    }
                    store.insert(EstimatorKey::new(model, seed, &set.name), Arc::clone(&estimator))?;
                    fitted.push(estimator);
                }

                for (name, kind) in ensembles.iter().zip(&ensemble_kinds) {
                    log::info!("Combining optimised models in {} estimator", name);
                    let ensemble = match kind {
                        EnsembleKind::Voting if meta.learn_task.is_classification() => {
                            VotingEnsemble::classifier(name, fitted.clone(), &test.y)?
                        }
                        EnsembleKind::Voting => VotingEnsemble::regressor(name, fitted.clone())?,
                    };
                    if meta.learn_task.is_classification() {
                        warn_degenerate(&ensemble, &x_test, set)?;
                    }
                    store.insert(EstimatorKey::new(name, seed, &set.name), Arc::new(ensemble))?;
                }

                store.insert_held_out(seed, &set.name, HeldOut { x: x_test, y: test.y })?;
            }
        }

        let mut all_models = models;
        all_models.extend(ensembles);
        Ok(VerificationRun {
            task: meta.learn_task,
            seeds: meta.seed.clone(),
            models: all_models,
            feature_sets: sets,
            store,
        })
    }
}

/// Warn when a classifier predicts the same class for every test row.
/// Returns whether the predictions were degenerate.
fn warn_degenerate(estimator: &dyn Estimator, x_test: &Array2<f64>, set: &FeatureSet) -> Result<bool> {
    let pred = estimator.predict(x_test)?;
    let Some(first) = pred.first().copied() else {
        return Ok(false);
    };
    if pred.iter().all(|p| *p == first) {
        log::warn!(
            "{} predicted class {} for every test instance using top features {:?}",
            estimator.name(),
            first,
            set.features
        );
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    /// Predicts the same label for every row.
    struct ConstantLabel(f64);

    impl Estimator for ConstantLabel {
        fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
            Ok(())
        }

        fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            Ok(Array1::from_elem(x.nrows(), self.0))
        }

        fn name(&self) -> &str {
            "constant"
        }

        fn task(&self) -> LearnTask {
            LearnTask::BinaryClassification
        }
    }

    #[test]
    fn test_constant_predictions_of_either_class_are_degenerate() {
        let x = Array2::<f64>::zeros((5, 1));
        let set = FeatureSet::single("lvef");
        assert!(warn_degenerate(&ConstantLabel(1.0), &x, &set).unwrap());
        assert!(warn_degenerate(&ConstantLabel(0.0), &x, &set).unwrap());
        assert!(!warn_degenerate(&ConstantLabel(1.0), &Array2::zeros((0, 1)), &set).unwrap());
    }

    #[test]
    fn test_degenerate_ensemble_detected() {
        let x = Array2::<f64>::zeros((4, 1));
        let members: Vec<Arc<dyn Estimator>> = vec![Arc::new(ConstantLabel(1.0)), Arc::new(ConstantLabel(1.0))];
        let ensemble = VotingEnsemble::classifier("voting_ensemble", members, &Array1::from_vec(vec![0.0, 1.0, 0.0, 1.0])).unwrap();
        assert!(warn_degenerate(&ensemble, &x, &FeatureSet::single("lvef")).unwrap());
    }
}
