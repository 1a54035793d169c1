//! Hyperparameter search with cross-validated scoring.
//!
//! `CrossValidation` wraps an estimator spec, a parameter grid, a splitter
//! and a selection metric into one fit-and-select call. Candidates are
//! scored on a dedicated rayon pool and the winner is refit on the full
//! training set.
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::config::SearchStrategy;
use crate::error::{AnalysisError, Result};
use crate::metrics::Metric;
use crate::model_selection::splitter::{class_indices, Splitter};
use crate::model_selection::score_estimator;
use crate::models::params::{describe, ParamGrid, ParamSet};
use crate::models::{Estimator, EstimatorSpec};
use crate::stats::mean_std;

const HALVING_FACTOR: usize = 3;

/// Expand a grid into the Cartesian product of its candidate lists, in
/// sorted key order. An empty grid yields a single empty parameter set.
pub fn expand_grid(grid: &ParamGrid) -> Result<Vec<ParamSet>> {
    let mut candidates = vec![ParamSet::new()];
    for (key, values) in grid {
        if values.is_empty() {
            return Err(AnalysisError::InvalidGrid(format!(
                "parameter '{}' has no candidate values",
                key
            )));
        }
        candidates = candidates
            .into_iter()
            .flat_map(|base| {
                values.iter().map(move |v| {
                    let mut next = base.clone();
                    next.insert(key.clone(), v.clone());
                    next
                })
            })
            .collect();
    }
    Ok(candidates)
}

/// Cross-validated score of one candidate.
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub params: ParamSet,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    /// Training rows available to this evaluation.
    pub n_resources: usize,
    /// Halving iteration (always 0 for an exhaustive search).
    pub iteration: usize,
}

pub struct SearchResult {
    pub best_estimator: Box<dyn Estimator>,
    pub best_params: ParamSet,
    pub best_score: f64,
    pub cv_results: Vec<CandidateResult>,
}

impl std::fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchResult")
            .field("best_estimator", &self.best_estimator.name())
            .field("best_params", &self.best_params)
            .field("best_score", &self.best_score)
            .field("cv_results", &self.cv_results.len())
            .finish()
    }
}

/// Grid or successive-halving search over a hyperparameter grid.
pub struct CrossValidation {
    spec: EstimatorSpec,
    splitter: Splitter,
    grid: ParamGrid,
    scoring: Metric,
    strategy: SearchStrategy,
    workers: usize,
    max_resources: usize,
}

impl CrossValidation {
    pub fn new(spec: EstimatorSpec, splitter: Splitter, grid: ParamGrid, scoring: Metric) -> Self {
        CrossValidation {
            spec,
            splitter,
            grid,
            scoring,
            strategy: SearchStrategy::Grid,
            workers: 1,
            max_resources: 1000,
        }
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_max_resources(mut self, max_resources: usize) -> Self {
        self.max_resources = max_resources;
        self
    }

    /// Search the grid, then refit the best candidate on all of `x`/`y`.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<SearchResult> {
        if x.nrows() != y.len() {
            return Err(AnalysisError::Shape(format!(
                "{} feature rows for {} labels",
                x.nrows(),
                y.len()
            )));
        }
        let candidates = expand_grid(&self.grid)?;
        let pool = rayon::ThreadPoolBuilder::new().num_threads(self.workers).build()?;

        let (cv_results, best) = match self.strategy {
            SearchStrategy::Grid => {
                let rows: Vec<usize> = (0..x.nrows()).collect();
                let results = pool.install(|| self.score_candidates(&candidates, x, y, &rows, 0))?;
                let best = best_index(&results);
                (results, best)
            }
            SearchStrategy::Halving => self.halving(&pool, candidates, x, y)?,
        };

        let winner = &cv_results[best];
        log::info!(
            "{}: best {} = {:.3} with {}",
            self.spec.model,
            self.scoring,
            winner.mean_score,
            describe(&winner.params)
        );

        let mut best_estimator = self.spec.with_params(winner.params.clone()).build()?;
        best_estimator.fit(x, y)?;
        Ok(SearchResult {
            best_estimator,
            best_params: winner.params.clone(),
            best_score: winner.mean_score,
            cv_results,
        })
    }

    fn score_candidates(
        &self,
        candidates: &[ParamSet],
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &[usize],
        iteration: usize,
    ) -> Result<Vec<CandidateResult>> {
        let x_sub = x.select(Axis(0), rows);
        let y_sub = y.select(Axis(0), rows);
        let folds = self.splitter.split(&y_sub)?;

        candidates
            .par_iter()
            .map(|params| -> Result<CandidateResult> {
                let mut fold_scores = Vec::with_capacity(folds.len());
                for fold in &folds {
                    let mut estimator = self.spec.with_params(params.clone()).build()?;
                    estimator.fit(&x_sub.select(Axis(0), &fold.train), &y_sub.select(Axis(0), &fold.train))?;
                    let x_val = x_sub.select(Axis(0), &fold.test);
                    let y_val = y_sub.select(Axis(0), &fold.test);
                    let score = score_estimator(estimator.as_ref(), self.scoring, &x_val, &y_val);
                    fold_scores.push(fold_score(self.spec.model.name(), score)?);
                }
                let (mean_score, std_score) = mean_std(&fold_scores);
                log::debug!(
                    "{} [{} rows] {}: {:.4} ± {:.4}",
                    self.spec.model,
                    rows.len(),
                    describe(params),
                    mean_score,
                    std_score
                );
                Ok(CandidateResult {
                    params: params.clone(),
                    fold_scores,
                    mean_score,
                    std_score,
                    n_resources: rows.len(),
                    iteration,
                })
            })
            .collect()
    }

    /// Successive halving: score every candidate on a small stratified
    /// subsample, keep the best third, triple the subsample, repeat.
    fn halving(
        &self,
        pool: &rayon::ThreadPool,
        candidates: Vec<ParamSet>,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<(Vec<CandidateResult>, usize)> {
        let n = x.nrows();
        let order = self.resource_order(y);
        let n_classes = if self.spec.task.is_classification() {
            class_indices(y).len().max(1)
        } else {
            1
        };
        let max_resources = self.max_resources.min(n).max(1);
        let min_resources = (2 * self.splitter.n_splits() * n_classes).min(max_resources);

        let n_required = 1 + ilog(candidates.len(), HALVING_FACTOR);
        let n_possible = 1 + ilog(max_resources / min_resources, HALVING_FACTOR);
        let n_iterations = n_required.min(n_possible);
        log::info!(
            "{}: halving search over {} candidates, {} iterations, {}..{} samples",
            self.spec.model,
            candidates.len(),
            n_iterations,
            min_resources,
            max_resources
        );

        let mut all_results = Vec::new();
        let mut remaining = candidates;
        let mut last: Vec<CandidateResult> = Vec::new();
        for iteration in 0..n_iterations {
            let n_resources = (min_resources * HALVING_FACTOR.pow(iteration as u32)).min(max_resources);
            let rows = &order[..n_resources];
            last = pool.install(|| self.score_candidates(&remaining, x, y, rows, iteration))?;
            all_results.extend(last.iter().cloned());

            if iteration + 1 < n_iterations {
                let keep = remaining.len().div_ceil(HALVING_FACTOR);
                let mut ranked: Vec<usize> = (0..last.len()).collect();
                ranked.sort_by(|&a, &b| {
                    sortable(last[b].mean_score)
                        .partial_cmp(&sortable(last[a].mean_score))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                let mut kept: Vec<usize> = ranked.into_iter().take(keep).collect();
                kept.sort_unstable();
                remaining = kept.into_iter().map(|i| last[i].params.clone()).collect();
            }
        }

        let best_in_last = best_index(&last);
        let offset = all_results.len() - last.len();
        Ok((all_results, offset + best_in_last))
    }

    /// Row order used to draw growing subsamples: a seeded shuffle, with
    /// classes interleaved in proportion so every prefix stays stratified.
    fn resource_order(&self, y: &Array1<f64>) -> Vec<usize> {
        let mut rng = StdRng::seed_from_u64(self.spec.seed);
        if !self.spec.task.is_classification() {
            let mut order: Vec<usize> = (0..y.len()).collect();
            order.shuffle(&mut rng);
            return order;
        }
        let mut keyed: Vec<(f64, usize)> = Vec::with_capacity(y.len());
        for (_, mut indices) in class_indices(y) {
            indices.shuffle(&mut rng);
            let size = indices.len() as f64;
            for (pos, idx) in indices.into_iter().enumerate() {
                keyed.push(((pos as f64 + 0.5) / size, idx));
            }
        }
        keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        keyed.into_iter().map(|(_, idx)| idx).collect()
    }
}

fn ilog(value: usize, base: usize) -> usize {
    let mut power = 0;
    let mut acc = base;
    while acc <= value {
        power += 1;
        acc *= base;
    }
    power
}

/// Unscorable folds (single-class validation labels, mismatched shapes)
/// count as NaN; any other failure, such as a model that cannot predict,
/// aborts the search.
fn fold_score(model: &str, score: Result<f64>) -> Result<f64> {
    match score {
        Ok(s) => Ok(s),
        Err(e @ (AnalysisError::Metric(_) | AnalysisError::Shape(_))) => {
            log::warn!("{}: fold could not be scored ({}), counting it as NaN", model, e);
            Ok(f64::NAN)
        }
        Err(e) => Err(e),
    }
}

fn sortable(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}

/// Index of the highest mean score; the earliest candidate wins ties.
fn best_index(results: &[CandidateResult]) -> usize {
    let mut best = 0;
    for (i, r) in results.iter().enumerate() {
        if sortable(r.mean_score) > sortable(results[best].mean_score) {
            best = i;
        }
    }
    best
}
