pub mod estimator;
pub mod factory;
pub mod gbdt;
pub mod linear;
pub mod logistic;
pub mod params;
pub mod svm;
pub mod voting;

use std::fmt;
use std::str::FromStr;

use crate::config::LearnTask;
use crate::error::{AnalysisError, Result};
use crate::model_selection::search::expand_grid;

pub use estimator::Estimator;
pub use factory::{init_estimator, EstimatorSpec};
pub use params::{ParamGrid, ParamSet, ParamValue};
pub use voting::{EnsembleKind, LabelEncoder, VotingEnsemble};

/// Supported base models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelKind {
    Gbdt,
    LogisticRegression,
    Svm,
    LinearRegression,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Gbdt => "gbdt",
            ModelKind::LogisticRegression => "logistic_regression",
            ModelKind::Svm => "svm",
            ModelKind::LinearRegression => "linear_regression",
        }
    }

    pub fn supports(&self, task: LearnTask) -> bool {
        match task {
            LearnTask::BinaryClassification => !matches!(self, ModelKind::LinearRegression),
            LearnTask::Regression => matches!(self, ModelKind::Gbdt | ModelKind::LinearRegression),
            LearnTask::MultiClassification => false,
        }
    }

    pub fn check_task(&self, task: LearnTask) -> Result<()> {
        if task == LearnTask::MultiClassification {
            return Err(AnalysisError::UnsupportedTask(task.to_string()));
        }
        if !self.supports(task) {
            return Err(AnalysisError::Config(format!(
                "{} does not support {}",
                self.name(),
                task
            )));
        }
        Ok(())
    }

    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            ModelKind::Gbdt => gbdt::PARAMS,
            ModelKind::LogisticRegression => logistic::PARAMS,
            ModelKind::Svm => svm::PARAMS,
            ModelKind::LinearRegression => linear::PARAMS,
        }
    }

    /// Check that every candidate of `grid` builds into an estimator.
    pub fn validate_grid(&self, task: LearnTask, grid: &ParamGrid) -> Result<()> {
        for candidate in expand_grid(grid)? {
            EstimatorSpec::new(*self, task, 0).with_params(candidate).build()?;
        }
        Ok(())
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gbdt" | "gradient_boosting" => Ok(ModelKind::Gbdt),
            "logistic_regression" | "logistic" => Ok(ModelKind::LogisticRegression),
            "svm" => Ok(ModelKind::Svm),
            "linear_regression" | "linear" => Ok(ModelKind::LinearRegression),
            _ => Err(AnalysisError::Config(format!(
                "Unknown model type: {}. Valid options are: gbdt, logistic_regression, svm, linear_regression",
                s
            ))),
        }
    }
}
