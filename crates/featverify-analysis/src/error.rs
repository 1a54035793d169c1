use std::path::PathBuf;

/// Errors raised by the analysis passes.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Invalid or inconsistent configuration (unknown model, metric, parameter, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested learning task has no implementation.
    #[error("learning task '{0}' has not yet been implemented")]
    UnsupportedTask(String),

    /// The requested ensemble type has no implementation.
    #[error("ensemble '{0}' has not yet been implemented")]
    UnsupportedEnsemble(String),

    /// A column referenced by name does not exist in the frame.
    #[error("column '{0}' not found")]
    MissingColumn(String),

    /// A frame was built with the same column name twice.
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    /// Arrays that must line up do not.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Data is present but unusable (empty, single class, non-numeric, ...).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A hyperparameter grid cannot be searched.
    #[error("invalid parameter grid: {0}")]
    InvalidGrid(String),

    /// The underlying learning library rejected a fit or predict call.
    #[error("{model} failed: {reason}")]
    Model { model: String, reason: String },

    /// A fitted estimator was stored twice under the same key.
    #[error("an estimator is already stored for {0}")]
    DuplicateEstimator(String),

    /// Metric evaluation failed.
    #[error(transparent)]
    Metric(#[from] crate::metrics::MetricError),

    /// Reading or writing an artifact failed.
    #[error("i/o error on {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Reading or writing a delimited table failed.
    #[error("csv error on {path}")]
    Csv { path: PathBuf, source: csv::Error },

    /// The grid-search worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    pub(crate) fn model(model: &str, reason: impl std::fmt::Display) -> Self {
        AnalysisError::Model {
            model: model.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}
