use ndarray::{Array1, Array2};
use std::sync::Arc;

use crate::config::LearnTask;
use crate::error::{AnalysisError, Result};
use crate::models::estimator::Estimator;

/// Ensemble types that can be combined from already-fitted models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsembleKind {
    Voting,
}

impl EnsembleKind {
    /// Resolve an ensemble from its configured name (e.g. `voting_ensemble`).
    pub fn from_name(name: &str) -> Result<Self> {
        if name.contains("voting") {
            Ok(EnsembleKind::Voting)
        } else {
            log::error!("{} has not yet been implemented", name);
            Err(AnalysisError::UnsupportedEnsemble(name.to_string()))
        }
    }
}

const BINARY_CLASSES: [f64; 2] = [0.0, 1.0];

/// Maps class values to contiguous indices, ordered ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<f64>,
}

impl LabelEncoder {
    pub fn fit(y: &Array1<f64>) -> Self {
        Self::fit_with_classes(y, &[])
    }

    /// Fit on `y` plus `known` classes that may be absent from `y`.
    pub fn fit_with_classes(y: &Array1<f64>, known: &[f64]) -> Self {
        let mut classes: Vec<f64> = y.iter().chain(known).copied().filter(|v| !v.is_nan()).collect();
        classes.sort_by(|a, b| a.total_cmp(b));
        classes.dedup();
        LabelEncoder { classes }
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn transform(&self, value: f64) -> Result<usize> {
        self.classes.iter().position(|c| *c == value).ok_or_else(|| {
            AnalysisError::InvalidData(format!(
                "label {} was not seen by the label encoder (classes: {:?})",
                value, self.classes
            ))
        })
    }
}

/// Hard-voting classifier or averaging regressor over fitted estimators.
///
/// The ensemble is assembled from estimators that were already trained and
/// never refits them.
pub struct VotingEnsemble {
    name: String,
    task: LearnTask,
    estimators: Vec<Arc<dyn Estimator>>,
    encoder: Option<LabelEncoder>,
}

impl VotingEnsemble {
    /// Majority vote over class predictions. The class set is `labels`,
    /// typically the held-out labels of the split being evaluated, together
    /// with both binary classes.
    pub fn classifier(name: &str, estimators: Vec<Arc<dyn Estimator>>, labels: &Array1<f64>) -> Result<Self> {
        Self::check_members(name, &estimators)?;
        let encoder = LabelEncoder::fit_with_classes(labels, &BINARY_CLASSES);
        Ok(VotingEnsemble {
            name: name.to_string(),
            task: LearnTask::BinaryClassification,
            estimators,
            encoder: Some(encoder),
        })
    }

    /// Mean of the member predictions.
    pub fn regressor(name: &str, estimators: Vec<Arc<dyn Estimator>>) -> Result<Self> {
        Self::check_members(name, &estimators)?;
        Ok(VotingEnsemble {
            name: name.to_string(),
            task: LearnTask::Regression,
            estimators,
            encoder: None,
        })
    }

    fn check_members(name: &str, estimators: &[Arc<dyn Estimator>]) -> Result<()> {
        if estimators.is_empty() {
            return Err(AnalysisError::Config(format!(
                "{} needs at least one fitted base estimator",
                name
            )));
        }
        Ok(())
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.estimators.iter().map(|e| e.name())
    }

    /// Vote counts per sample and class.
    fn votes(&self, encoder: &LabelEncoder, x: &Array2<f64>) -> Result<Array2<usize>> {
        let mut votes = Array2::<usize>::zeros((x.nrows(), encoder.classes().len()));
        for estimator in &self.estimators {
            let pred = estimator.predict(x)?;
            for (i, p) in pred.iter().enumerate() {
                votes[(i, encoder.transform(*p)?)] += 1;
            }
        }
        Ok(votes)
    }
}

impl Estimator for VotingEnsemble {
    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        Err(AnalysisError::model(
            &self.name,
            "voting ensembles combine fitted estimators and are never refit",
        ))
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match &self.encoder {
            Some(encoder) => {
                let votes = self.votes(encoder, x)?;
                // first maximum wins, so ties go to the lowest class
                let out = votes
                    .rows()
                    .into_iter()
                    .map(|row| {
                        let mut best = 0;
                        for (k, v) in row.iter().enumerate() {
                            if *v > row[best] {
                                best = k;
                            }
                        }
                        encoder.classes()[best]
                    })
                    .collect();
                Ok(out)
            }
            None => {
                let mut sum = Array1::<f64>::zeros(x.nrows());
                for estimator in &self.estimators {
                    sum = sum + estimator.predict(x)?;
                }
                Ok(sum / self.estimators.len() as f64)
            }
        }
    }

    /// Fraction of members voting for the positive class.
    fn predict_proba(&self, x: &Array2<f64>) -> Option<Result<Array1<f64>>> {
        let encoder = self.encoder.as_ref()?;
        Some(self.votes(encoder, x).map(|votes| match encoder.transform(1.0) {
            Ok(pos) => votes.column(pos).mapv(|v| v as f64 / self.estimators.len() as f64),
            Err(_) => Array1::zeros(x.nrows()),
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn task(&self) -> LearnTask {
        self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Predicts a fixed label vector regardless of input.
    struct Fixed(Array1<f64>);

    impl Estimator for Fixed {
        fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
            panic!("members must not be refit");
        }

        fn predict(&self, _x: &Array2<f64>) -> Result<Array1<f64>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn task(&self) -> LearnTask {
            LearnTask::BinaryClassification
        }
    }

    fn members(preds: &[[f64; 4]]) -> Vec<Arc<dyn Estimator>> {
        preds
            .iter()
            .map(|p| Arc::new(Fixed(Array1::from_vec(p.to_vec()))) as Arc<dyn Estimator>)
            .collect()
    }

    #[test]
    fn test_hard_vote_majority_and_tie_break() {
        let x = Array2::<f64>::zeros((4, 1));
        let labels = Array1::from_vec(vec![0.0, 1.0, 0.0, 1.0]);
        let ens = VotingEnsemble::classifier(
            "voting_ensemble",
            members(&[[1.0, 0.0, 1.0, 0.0], [1.0, 1.0, 0.0, 0.0], [0.0, 1.0, 1.0, 0.0]]),
            &labels,
        )
        .unwrap();
        assert_eq!(ens.predict(&x).unwrap().to_vec(), vec![1.0, 1.0, 1.0, 0.0]);
        let proba = ens.predict_proba(&x).unwrap().unwrap();
        assert!((proba[0] - 2.0 / 3.0).abs() < 1e-12);

        let tie = VotingEnsemble::classifier(
            "voting_ensemble",
            members(&[[1.0, 0.0, 1.0, 0.0], [0.0, 1.0, 1.0, 0.0]]),
            &labels,
        )
        .unwrap();
        assert_eq!(tie.predict(&x).unwrap().to_vec(), vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_single_class_labels_still_encode_both_classes() {
        let x = Array2::<f64>::zeros((4, 1));
        let labels = Array1::from_vec(vec![0.0; 4]);
        let ens = VotingEnsemble::classifier(
            "voting_ensemble",
            members(&[[1.0, 1.0, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0, 0.0]]),
            &labels,
        )
        .unwrap();
        assert_eq!(ens.predict(&x).unwrap().to_vec(), vec![1.0, 1.0, 0.0, 1.0]);
        let proba = ens.predict_proba(&x).unwrap().unwrap();
        assert_eq!(proba[0], 1.0);
    }

    #[test]
    fn test_voting_regressor_averages() {
        let x = Array2::<f64>::zeros((4, 1));
        let ens = VotingEnsemble::regressor("voting_ensemble", members(&[[1.0, 2.0, 3.0, 4.0], [3.0, 2.0, 1.0, 0.0]])).unwrap();
        assert_eq!(ens.predict(&x).unwrap().to_vec(), vec![2.0; 4]);
        assert!(ens.predict_proba(&x).is_none());
    }

    #[test]
    fn test_ensemble_cannot_be_refit() {
        let labels = Array1::from_vec(vec![0.0, 1.0]);
        let mut ens = VotingEnsemble::classifier("voting_ensemble", members(&[[0.0; 4]]), &labels).unwrap();
        let x = Array2::<f64>::zeros((2, 1));
        assert!(ens.fit(&x, &labels).is_err());
    }

    #[test]
    fn test_unknown_ensemble_kind() {
        assert_eq!(EnsembleKind::from_name("voting_ensemble").unwrap(), EnsembleKind::Voting);
        assert!(matches!(
            EnsembleKind::from_name("stacking_ensemble"),
            Err(AnalysisError::UnsupportedEnsemble(_))
        ));
    }
}
