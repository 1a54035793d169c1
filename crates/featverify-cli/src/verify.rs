use anyhow::{Context, Result};

use featverify_analysis::io::read_frame;
use featverify_analysis::verification::{EvaluationReport, Evaluator, Verification};
use featverify_analysis::Frame;

use crate::explore::run_exploration;
use crate::input::RunInput;

/// Verify the configured top features, running the exploration stages first
/// when none are given.
pub fn run_verification(input: &RunInput) -> Result<EvaluationReport> {
    let config = &input.config;
    let (frame, top_features) = if config.verification.top_features.is_empty() {
        log::info!("No top features given, selecting them by exploration");
        let report = run_exploration(input)?;
        (report.frame, report.top_features)
    } else {
        let frame: Frame = read_frame(&input.data_path)
            .with_context(|| format!("Failed to load data: {}", input.data_path.display()))?;
        (frame, config.verification.top_features.clone())
    };
    log::info!("Verifying top features: {}", top_features.join(", "));

    let run = Verification::new(config, &top_features)?.run(&frame)?;
    let report = Evaluator::new(config)?.evaluate(&run)?;
    Ok(report)
}
