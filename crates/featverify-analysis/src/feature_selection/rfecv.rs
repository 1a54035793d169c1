//! Recursive feature elimination with cross-validation.
//!
//! At every step the estimator is cross-validated with default
//! hyperparameters on the remaining features, refit on all rows, and the
//! `step` features with the lowest permutation importance are removed.
//! The selected set is the smallest one reaching the best mean score.
use std::path::Path;

use ndarray::Axis;

use crate::config::{AnalysisConfig, ImputeMethod};
use crate::data_handling::{split_xy, Frame, XyData};
use crate::error::{AnalysisError, Result};
use crate::feature_selection::importance::{permutation_importance, PermutationImportance};
use crate::metrics::Metric;
use crate::model_selection::{CrossValidation, Splitter};
use crate::models::{init_estimator, EstimatorSpec, ParamGrid};
use crate::preprocessing::{target_statistics, Imputer, Normaliser};
use crate::report::plots::{plot_importance, plot_rfecv};
use crate::report::write_plot;

/// Scores and importances of one elimination step.
#[derive(Debug, Clone)]
pub struct RfecvStep {
    pub features: Vec<String>,
    pub mean_score: f64,
    pub std_score: f64,
    pub importance: PermutationImportance,
}

#[derive(Debug, Clone)]
pub struct RfecvResult {
    /// Steps from the full feature set down to `min_features`.
    pub steps: Vec<RfecvStep>,
    /// Index of the selected step.
    pub selected: usize,
    /// Features in the order they were eliminated.
    pub eliminated: Vec<String>,
}

impl RfecvResult {
    pub fn selected_step(&self) -> &RfecvStep {
        &self.steps[self.selected]
    }

    /// Selected features, most important first.
    pub fn ranked_features(&self) -> Vec<String> {
        let step = self.selected_step();
        step.importance
            .ranking()
            .into_iter()
            .map(|i| step.features[i].clone())
            .collect()
    }
}

/// What an RFECV run over a frame produces.
#[derive(Debug, Clone)]
pub struct RfecvReport {
    /// Selected features, the target label and metadata columns.
    pub frame: Frame,
    pub ranked_features: Vec<String>,
    pub result: RfecvResult,
}

#[derive(Debug, Clone)]
pub struct Rfecv {
    spec: EstimatorSpec,
    splitter: Splitter,
    scoring: Metric,
    step: usize,
    min_features: usize,
    n_repeats: usize,
    workers: usize,
    impute: ImputeMethod,
}

impl Rfecv {
    pub fn new(spec: EstimatorSpec, splitter: Splitter, scoring: Metric) -> Self {
        Rfecv {
            spec,
            splitter,
            scoring,
            step: 1,
            min_features: 1,
            n_repeats: 5,
            workers: 1,
            impute: ImputeMethod::Mean,
        }
    }

    /// RFECV as configured under `explore.rfecv`, seeded with `seed`.
    pub fn from_config(config: &AnalysisConfig, seed: u64) -> Result<Self> {
        let rfecv = &config.explore.rfecv;
        let (spec, splitter, scoring) = init_estimator(&rfecv.model, config.meta.learn_task, seed, &config.selection)?;
        Ok(Rfecv::new(spec, splitter, scoring)
            .with_step(rfecv.step)
            .with_min_features(rfecv.min_features)
            .with_n_repeats(rfecv.n_repeats)
            .with_workers(config.meta.workers)
            .with_impute(config.impute.method))
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    pub fn with_min_features(mut self, min_features: usize) -> Self {
        self.min_features = min_features;
        self
    }

    pub fn with_n_repeats(mut self, n_repeats: usize) -> Self {
        self.n_repeats = n_repeats;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_impute(mut self, impute: ImputeMethod) -> Self {
        self.impute = impute;
        self
    }

    pub fn model_name(&self) -> &'static str {
        self.spec.model.name()
    }

    pub fn fit(&self, data: &XyData) -> Result<RfecvResult> {
        if self.step == 0 || self.min_features == 0 {
            return Err(AnalysisError::Config("RFECV step and min_features must be positive".to_string()));
        }
        let n_features = data.feature_names.len();
        if n_features == 0 {
            return Err(AnalysisError::InvalidData("RFECV needs at least one feature".to_string()));
        }
        let min_features = self.min_features.min(n_features);

        let mut remaining: Vec<usize> = (0..n_features).collect();
        let mut steps = Vec::new();
        let mut eliminated = Vec::new();
        loop {
            let x = data.x.select(Axis(1), &remaining);
            let search = CrossValidation::new(self.spec.clone(), self.splitter.clone(), ParamGrid::new(), self.scoring)
                .with_workers(self.workers)
                .fit(&x, &data.y)?;
            let cv = &search.cv_results[0];
            let importance = permutation_importance(
                search.best_estimator.as_ref(),
                self.scoring,
                &x,
                &data.y,
                self.n_repeats,
                self.spec.seed,
            )?;
            let features: Vec<String> = remaining.iter().map(|&i| data.feature_names[i].clone()).collect();
            log::info!(
                "RFECV {}: {} features, {} = {:.3} ± {:.3}",
                self.spec.model,
                features.len(),
                self.scoring,
                cv.mean_score,
                cv.std_score
            );

            let ranking = importance.ranking();
            steps.push(RfecvStep {
                features,
                mean_score: cv.mean_score,
                std_score: cv.std_score,
                importance,
            });
            if remaining.len() <= min_features {
                break;
            }

            let n_drop = self.step.min(remaining.len() - min_features);
            let mut least: Vec<usize> = ranking.into_iter().rev().take(n_drop).collect();
            least.sort_unstable();
            for pos in least.iter().rev() {
                let idx = remaining.remove(*pos);
                log::debug!("RFECV eliminated {}", data.feature_names[idx]);
                eliminated.push(data.feature_names[idx].clone());
            }
        }

        let selected = select_step(&steps);
        log::info!(
            "RFECV {} selected {} of {} features",
            self.spec.model,
            steps[selected].features.len(),
            n_features
        );
        Ok(RfecvResult {
            steps,
            selected,
            eliminated,
        })
    }

    /// Run RFECV on the feature columns of `frame` and write the score
    /// curve and the importance chart of the selected set.
    pub fn run(&self, frame: &Frame, target_label: &str, metadata: &[String], out_dir: &Path) -> Result<RfecvReport> {
        let (labelled, _) = target_statistics(frame, target_label, self.spec.task)?;
        let features = labelled.feature_names(target_label, metadata);
        let imputed = Imputer::new(self.impute).fit_transform(&labelled, &features)?;
        let mut data = split_xy(&imputed, &features, target_label)?;
        data.x = Normaliser::fit_transform(&data.x)?.1;

        let result = self.fit(&data)?;
        let model = self.spec.model.name();

        let n_features: Vec<usize> = result.steps.iter().map(|s| s.features.len()).collect();
        let means: Vec<f64> = result.steps.iter().map(|s| s.mean_score).collect();
        let stds: Vec<f64> = result.steps.iter().map(|s| s.std_score).collect();
        write_plot(
            &plot_rfecv(
                &n_features,
                &means,
                &stds,
                self.scoring.name(),
                &format!("Recursive feature elimination, {}", model),
            ),
            out_dir.join(format!("RFECV_{}.html", model)),
        )?;

        let step = result.selected_step();
        let ranking = step.importance.ranking();
        let names: Vec<String> = ranking.iter().map(|&i| step.features[i].clone()).collect();
        let imps: Vec<f64> = ranking.iter().map(|&i| step.importance.importances_mean[i]).collect();
        let imp_stds: Vec<f64> = ranking.iter().map(|&i| step.importance.importances_std[i]).collect();
        write_plot(
            &plot_importance(&names, &imps, &imp_stds, &format!("Permutation importance, {}", model)),
            out_dir.join(format!("feature_importance_{}.html", model)),
        )?;

        let mut keep = names.clone();
        keep.push(target_label.to_string());
        keep.extend(metadata.iter().filter(|m| frame.has_column(m)).cloned());
        let reduced = frame.select(&keep)?;
        Ok(RfecvReport {
            frame: reduced,
            ranked_features: names,
            result,
        })
    }
}

/// Smallest feature set reaching the highest mean score. `NaN` never wins.
fn select_step(steps: &[RfecvStep]) -> usize {
    let score = |s: &RfecvStep| if s.mean_score.is_nan() { f64::NEG_INFINITY } else { s.mean_score };
    let mut best = 0;
    for (i, step) in steps.iter().enumerate() {
        // steps shrink, so ">=" prefers the smaller set on ties
        if score(step) >= score(&steps[best]) {
            best = i;
        }
    }
    best
}
