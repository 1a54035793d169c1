//! featverify-analysis: exploratory statistics and cross-validated feature
//! verification for tabular clinical data.
//!
//! This crate provides the analysis passes (IQR outliers, correlation
//! pruning, recursive feature elimination), thin estimator wrappers over
//! `gbdt` and `linfa`, a cross-validated hyperparameter search, and the
//! verification/evaluation pipeline that benchmarks the selected features
//! across seeds. Plots are written as plotly HTML, tables as CSV.
pub mod config;
pub mod data_handling;
pub mod data_split;
pub mod error;
pub mod exploration;
pub mod feature_selection;
pub mod io;
pub mod metrics;
pub mod model_selection;
pub mod models;
pub mod outliers;
pub mod preprocessing;
pub mod report;
pub mod stats;
pub mod verification;

pub use config::AnalysisConfig;
pub use data_handling::Frame;
pub use error::{AnalysisError, Result};
