pub mod explore;
pub mod input;
pub mod util;
pub mod verify;

use clap::{Arg, Command, ValueHint};
use std::path::PathBuf;

fn run_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("config")
                .help("Path to the JSON analysis configuration file")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .help(
                    "Path to the input table (*.csv or *.tsv). \
                     Overrides meta.data_path in the configuration file.",
                )
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output_dir")
                .short('o')
                .long("output_dir")
                .help(
                    "Directory that results are written under. \
                     Overrides meta.output_dir in the configuration file.",
                )
                .value_parser(clap::value_parser!(PathBuf))
                .value_hint(ValueHint::DirPath),
        )
}

pub fn build_cli() -> Command {
    Command::new("featverify")
        .version(clap::crate_version!())
        .about("Feature exploration and cross-validated verification for tabular clinical data")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(run_args(
            Command::new("explore")
                .about("Univariate plots, outlier handling, correlation pruning and RFECV"),
        ))
        .subcommand(
            run_args(
                Command::new("verify")
                    .about("Benchmark the top features across seeds and models"),
            )
            .arg(
                Arg::new("features")
                    .short('f')
                    .long("features")
                    .help(
                        "Comma separated top features to verify. Overrides \
                         verification.top_features; when neither is set the \
                         exploration stages select them.",
                    )
                    .value_parser(clap::builder::NonEmptyStringValueParser::new())
                    .value_hint(ValueHint::Other),
            ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_subcommand_required() {
        assert!(build_cli().try_get_matches_from(["featverify"]).is_err());
        assert!(build_cli()
            .try_get_matches_from(["featverify", "explore", "config.json", "-f", "lvef"])
            .is_err());
    }
}
