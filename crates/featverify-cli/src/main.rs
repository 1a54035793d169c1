use anyhow::Result;
use clap::ArgMatches;
use log::LevelFilter;
use std::path::PathBuf;

use featverify_cli::build_cli;
use featverify_cli::explore::run_exploration;
use featverify_cli::input::{Overrides, RunInput};
use featverify_cli::verify::run_verification;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("FEATVERIFY_LOG", "error,featverify=info"))
        .init();

    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("explore", sub_m)) => handle_explore(sub_m),
        Some(("verify", sub_m)) => handle_verify(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn load_input(matches: &ArgMatches) -> Result<RunInput> {
    let config_path = matches
        .get_one::<PathBuf>("config")
        .ok_or_else(|| anyhow::anyhow!("missing configuration path"))?;
    RunInput::from_arguments(config_path, &Overrides::from_matches(matches))
}

fn handle_explore(matches: &ArgMatches) -> Result<()> {
    let input = load_input(matches)?;
    log::info!(
        "[featverify::explore] {} on {:?}",
        input.config.meta.name,
        input.data_path
    );
    match run_exploration(&input) {
        Ok(report) => {
            log::info!("Top features: {}", report.top_features.join(", "));
            Ok(())
        }
        Err(e) => {
            log::error!("Exploration failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_verify(matches: &ArgMatches) -> Result<()> {
    let input = load_input(matches)?;
    log::info!(
        "[featverify::verify] {} on {:?}",
        input.config.meta.name,
        input.data_path
    );
    match run_verification(&input) {
        Ok(report) => {
            log::info!(
                "Wrote {} artifacts to {}",
                report.artifacts.len(),
                input.config.out_dir().display()
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Verification failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
