use anyhow::{Context, Result};

use featverify_analysis::exploration::{Exploration, ExplorationReport};
use featverify_analysis::io::read_frame;

use crate::input::RunInput;

pub fn run_exploration(input: &RunInput) -> Result<ExplorationReport> {
    let frame = read_frame(&input.data_path)
        .with_context(|| format!("Failed to load data: {}", input.data_path.display()))?;
    log::info!(
        "Loaded {} rows x {} columns from {}",
        frame.nrows(),
        frame.ncols(),
        input.data_path.display()
    );

    let report = Exploration::new(&input.config).run(&frame)?;
    if !report.dropped_correlated.is_empty() {
        log::info!("Dropped correlated features: {}", report.dropped_correlated.join(", "));
    }
    log::info!(
        "Flagged {} outlier cells; results in {}",
        report.outlier_count,
        input.config.out_dir().display()
    );
    Ok(report)
}
