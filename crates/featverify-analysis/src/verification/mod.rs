//! Cross-validated verification of the top features.
//!
//! `orchestrator` trains every configured model per seed and feature set
//! and fills an `EstimatorStore`; `evaluator` reads the store back,
//! aggregates scores across seeds and writes the ROC/PRC and confusion
//! matrix plots.
pub mod evaluator;
pub mod orchestrator;
pub mod store;

pub use evaluator::{EvaluationReport, Evaluator, ScoreSummary};
pub use orchestrator::{Verification, VerificationRun};
pub use store::{EstimatorKey, EstimatorStore, HeldOut};

/// Named subset of feature columns a model is trained on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSet {
    pub name: String,
    pub features: Vec<String>,
}

impl FeatureSet {
    pub fn single(feature: &str) -> Self {
        FeatureSet {
            name: feature.to_string(),
            features: vec![feature.to_string()],
        }
    }

    /// All of `features` combined, named `"{K}-item score"`.
    pub fn combined(features: &[String]) -> Self {
        FeatureSet {
            name: format!("{}-item score", features.len()),
            features: features.to_vec(),
        }
    }
}

/// Every top feature on its own, followed by all of them together.
pub fn feature_sets(top_features: &[String]) -> Vec<FeatureSet> {
    let mut sets: Vec<FeatureSet> = top_features.iter().map(|f| FeatureSet::single(f)).collect();
    sets.push(FeatureSet::combined(top_features));
    sets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_sets() {
        let top = vec!["lvef".to_string(), "age".to_string()];
        let sets = feature_sets(&top);
        assert_eq!(sets.len(), 3);
        assert_eq!(sets[0], FeatureSet::single("lvef"));
        assert_eq!(sets[2].name, "2-item score");
        assert_eq!(sets[2].features, top);
    }
}
