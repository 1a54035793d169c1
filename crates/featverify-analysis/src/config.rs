use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{AnalysisError, Result};
use crate::metrics::Metric;
use crate::models::params::ParamGrid;
use crate::models::{EnsembleKind, ModelKind};

/// Supervised learning task the verification models are trained for.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum LearnTask {
    BinaryClassification,
    MultiClassification,
    Regression,
}

impl LearnTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearnTask::BinaryClassification => "binary_classification",
            LearnTask::MultiClassification => "multi_classification",
            LearnTask::Regression => "regression",
        }
    }

    pub fn is_classification(&self) -> bool {
        !matches!(self, LearnTask::Regression)
    }
}

impl fmt::Display for LearnTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LearnTask {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "binary_classification" => Ok(LearnTask::BinaryClassification),
            "multi_classification" => Ok(LearnTask::MultiClassification),
            "regression" => Ok(LearnTask::Regression),
            _ => Err(AnalysisError::Config(format!("unknown learning task '{}'", s))),
        }
    }
}

/// Top-level configuration of an exploration/verification run.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub meta: MetaConfig,
    pub impute: ImputeConfig,
    pub data_split: DataSplitConfig,
    pub explore: ExploreConfig,
    pub selection: SelectionConfig,
    pub verification: VerificationConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct MetaConfig {
    /// Run name, used as the output sub-directory.
    pub name: String,
    pub output_dir: PathBuf,
    /// Input table (CSV or TSV). May be overridden on the command line.
    pub data_path: Option<PathBuf>,
    pub target_label: String,
    pub learn_task: LearnTask,
    /// Every seed yields an independent train/test split.
    pub seed: Vec<u64>,
    /// Worker threads used for hyperparameter search.
    pub workers: usize,
    /// Columns that are carried along but never analysed as features.
    pub metadata: Vec<String>,
    /// Column used to order investigation tables.
    pub subject_column: Option<String>,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            name: "featverify".to_string(),
            output_dir: PathBuf::from("results"),
            data_path: None,
            target_label: "target".to_string(),
            learn_task: LearnTask::BinaryClassification,
            seed: vec![0],
            workers: 1,
            metadata: Vec::new(),
            subject_column: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImputeMethod {
    #[default]
    Mean,
    Median,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ImputeConfig {
    pub method: ImputeMethod,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct DataSplitConfig {
    /// Fraction of rows held out for evaluation.
    pub test_frac: f64,
    /// Randomly oversample the minority class of the training split
    /// (classification only).
    pub oversample: bool,
}

impl Default for DataSplitConfig {
    fn default() -> Self {
        Self {
            test_frac: 0.2,
            oversample: true,
        }
    }
}

/// What to do with values outside the IQR bounds.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMode {
    /// Mask outliers to missing values.
    Drop,
    /// Only highlight outliers in a rendered table.
    Investigate,
    #[default]
    Off,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct RfecvConfig {
    pub enabled: bool,
    pub model: String,
    pub step: usize,
    pub min_features: usize,
    /// Shuffles per feature when computing permutation importance.
    pub n_repeats: usize,
}

impl Default for RfecvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "logistic_regression".to_string(),
            step: 1,
            min_features: 1,
            n_repeats: 5,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ExploreConfig {
    pub corr_thresh: f64,
    pub drop_correlated: bool,
    pub outliers: OutlierMode,
    pub rfecv: RfecvConfig,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            corr_thresh: 0.95,
            drop_correlated: true,
            outliers: OutlierMode::Off,
            rfecv: RfecvConfig::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    #[default]
    Grid,
    Halving,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct SelectionConfig {
    /// Model-selection metric per learning task.
    pub scoring: BTreeMap<String, String>,
    pub n_splits: usize,
    pub search: SearchStrategy,
    /// Upper bound on the samples used by the last halving iteration.
    pub max_resources: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        let scoring = BTreeMap::from([
            (LearnTask::BinaryClassification.to_string(), "roc_auc".to_string()),
            (LearnTask::MultiClassification.to_string(), "balanced_accuracy".to_string()),
            (LearnTask::Regression.to_string(), "neg_mean_absolute_error".to_string()),
        ]);
        Self {
            scoring,
            n_splits: 5,
            search: SearchStrategy::Grid,
            max_resources: 1000,
        }
    }
}

impl SelectionConfig {
    /// Metric used to rank hyperparameter candidates for `task`.
    pub fn scoring_for(&self, task: LearnTask) -> Result<Metric> {
        let name = self.scoring.get(task.as_str()).ok_or_else(|| {
            AnalysisError::Config(format!("no selection scoring configured for {}", task))
        })?;
        name.parse::<Metric>().map_err(|e| AnalysisError::Config(e.to_string()))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct VerificationConfig {
    /// Model and ensemble names mapped to whether they are enabled.
    pub models: BTreeMap<String, bool>,
    /// Hyperparameter candidates per model.
    pub param_grids: BTreeMap<String, ParamGrid>,
    /// Reported metrics per learning task, each mapped to whether it is enabled.
    pub scoring: BTreeMap<String, BTreeMap<String, bool>>,
    /// Features to verify. Empty means "use the RFECV ranking".
    pub top_features: Vec<String>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        let models = BTreeMap::from([
            ("gbdt".to_string(), true),
            ("logistic_regression".to_string(), true),
            ("svm".to_string(), false),
            ("linear_regression".to_string(), false),
            ("voting_ensemble".to_string(), false),
        ]);
        let classification = BTreeMap::from([
            ("roc_auc_score".to_string(), true),
            ("average_precision_score".to_string(), true),
            ("accuracy_score".to_string(), true),
            ("f1_score".to_string(), false),
        ]);
        let regression = BTreeMap::from([
            ("mean_absolute_error".to_string(), true),
            ("r2_score".to_string(), true),
        ]);
        let scoring = BTreeMap::from([
            (LearnTask::BinaryClassification.to_string(), classification),
            (LearnTask::Regression.to_string(), regression),
        ]);
        Self {
            models,
            param_grids: BTreeMap::new(),
            scoring,
            top_features: Vec::new(),
        }
    }
}

impl VerificationConfig {
    fn enabled(&self) -> impl Iterator<Item = &String> {
        self.models.iter().filter(|(_, on)| **on).map(|(name, _)| name)
    }

    /// Enabled base models, in name order.
    pub fn enabled_models(&self) -> Vec<String> {
        self.enabled().filter(|m| !m.contains("ensemble")).cloned().collect()
    }

    /// Enabled ensembles (any model name containing "ensemble").
    pub fn enabled_ensembles(&self) -> Vec<String> {
        self.enabled().filter(|m| m.contains("ensemble")).cloned().collect()
    }

    /// Enabled reporting metrics for `task`.
    pub fn scoring_for(&self, task: LearnTask) -> Result<Vec<Metric>> {
        let Some(table) = self.scoring.get(task.as_str()) else {
            return Ok(Vec::new());
        };
        table
            .iter()
            .filter(|(_, on)| **on)
            .map(|(name, _)| name.parse::<Metric>().map_err(|e| AnalysisError::Config(e.to_string())))
            .collect()
    }

    pub fn param_grid(&self, model: &str) -> ParamGrid {
        self.param_grids.get(model).cloned().unwrap_or_default()
    }
}

impl AnalysisConfig {
    /// `{meta.output_dir}/{meta.name}`
    pub fn out_dir(&self) -> PathBuf {
        self.meta.output_dir.join(&self.meta.name)
    }

    /// Check every name and range in the configuration before any work starts.
    pub fn validate(&self) -> Result<()> {
        let task = self.meta.learn_task;
        if task == LearnTask::MultiClassification {
            log::error!("{} has not yet been implemented", task);
            return Err(AnalysisError::UnsupportedTask(task.to_string()));
        }
        if self.meta.seed.is_empty() {
            return Err(AnalysisError::Config("meta.seed must list at least one seed".to_string()));
        }
        if let Some(seed) = first_duplicate(&self.meta.seed) {
            return Err(AnalysisError::Config(format!("meta.seed lists seed {} twice", seed)));
        }
        if let Some(feature) = first_duplicate(&self.verification.top_features) {
            return Err(AnalysisError::Config(format!(
                "verification.top_features lists '{}' twice",
                feature
            )));
        }
        if self.meta.target_label.is_empty() {
            return Err(AnalysisError::Config("meta.target_label is empty".to_string()));
        }
        if self.meta.metadata.contains(&self.meta.target_label) {
            return Err(AnalysisError::Config(format!(
                "target label '{}' is also listed as metadata",
                self.meta.target_label
            )));
        }
        if !(0.0..=1.0).contains(&self.explore.corr_thresh) {
            return Err(AnalysisError::Config(format!(
                "explore.corr_thresh must be within [0, 1], got {}",
                self.explore.corr_thresh
            )));
        }
        if !(self.data_split.test_frac > 0.0 && self.data_split.test_frac < 1.0) {
            return Err(AnalysisError::Config(format!(
                "data_split.test_frac must be within (0, 1), got {}",
                self.data_split.test_frac
            )));
        }
        if self.selection.n_splits < 2 {
            return Err(AnalysisError::Config("selection.n_splits must be at least 2".to_string()));
        }
        if self.explore.rfecv.step == 0 || self.explore.rfecv.min_features == 0 {
            return Err(AnalysisError::Config(
                "explore.rfecv.step and min_features must be positive".to_string(),
            ));
        }

        let selection_metric = self.selection.scoring_for(task)?;
        check_metric_task(selection_metric, task)?;
        for metric in self.verification.scoring_for(task)? {
            check_metric_task(metric, task)?;
        }

        for model in self.verification.enabled_models() {
            let kind: ModelKind = model.parse()?;
            kind.check_task(task)?;
            kind.validate_grid(task, &self.verification.param_grid(&model))?;
        }
        for ensemble in self.verification.enabled_ensembles() {
            EnsembleKind::from_name(&ensemble)?;
        }
        if self.explore.rfecv.enabled {
            let kind: ModelKind = self.explore.rfecv.model.parse()?;
            kind.check_task(task)?;
        }
        Ok(())
    }
}

/// First value that occurs more than once, if any.
pub(crate) fn first_duplicate<T: PartialEq>(values: &[T]) -> Option<&T> {
    values
        .iter()
        .enumerate()
        .find(|&(i, v)| values[..i].contains(v))
        .map(|(_, v)| v)
}

fn check_metric_task(metric: Metric, task: LearnTask) -> Result<()> {
    if metric.is_classification() != task.is_classification() {
        return Err(AnalysisError::Config(format!(
            "metric {} cannot score a {} task",
            metric, task
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.out_dir(), PathBuf::from("results").join("featverify"));
        assert_eq!(
            config.verification.enabled_models(),
            vec!["gbdt".to_string(), "logistic_regression".to_string()]
        );
    }

    #[test]
    fn test_duplicate_seeds_and_features_rejected() {
        let mut config = AnalysisConfig::default();
        config.meta.seed = vec![1, 2, 1];
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

        config.meta.seed = vec![1, 2];
        config.verification.top_features = vec!["lvef".to_string(), "lvef".to_string()];
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

        config.verification.top_features = vec!["lvef".to_string(), "age".to_string()];
        config.validate().unwrap();
        assert_eq!(first_duplicate(&[3, 4, 4, 3]), Some(&4));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "meta": {"target_label": "mace", "seed": [1, 2], "metadata": ["subject"]},
            "verification": {"models": {"gbdt": true, "voting_ensemble": true}}
        }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.meta.target_label, "mace");
        assert_eq!(config.meta.seed, vec![1, 2]);
        assert_eq!(config.explore.corr_thresh, 0.95);
        assert_eq!(config.verification.enabled_ensembles(), vec!["voting_ensemble".to_string()]);
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let mut config = AnalysisConfig::default();
        config
            .verification
            .scoring
            .get_mut("binary_classification")
            .unwrap()
            .insert("made_up_score".to_string(), true);
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));
    }

    #[test]
    fn test_multi_classification_unsupported() {
        let mut config = AnalysisConfig::default();
        config.meta.learn_task = LearnTask::MultiClassification;
        assert!(matches!(config.validate(), Err(AnalysisError::UnsupportedTask(_))));
    }

    #[test]
    fn test_regression_rejects_classifier_only_model() {
        let mut config = AnalysisConfig::default();
        config.meta.learn_task = LearnTask::Regression;
        config.explore.rfecv.model = "gbdt".to_string();
        assert!(config.validate().is_err());

        config.verification.models.insert("logistic_regression".to_string(), false);
        config.verification.models.insert("linear_regression".to_string(), true);
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_ensemble_rejected() {
        let mut config = AnalysisConfig::default();
        config.verification.models.insert("stacking_ensemble".to_string(), true);
        assert!(matches!(config.validate(), Err(AnalysisError::UnsupportedEnsemble(_))));
    }
}
