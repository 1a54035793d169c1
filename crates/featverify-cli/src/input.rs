use anyhow::{Context, Result};
use clap::ArgMatches;
use std::fs;
use std::path::{Path, PathBuf};

use featverify_analysis::AnalysisConfig;

use crate::util::{parse_feature_list, validate_tsv_or_csv_file};

/// Command line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub top_features: Option<Vec<String>>,
}

impl Overrides {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let top_features = matches
            .try_get_one::<String>("features")
            .ok()
            .flatten()
            .map(|raw| parse_feature_list(raw));
        Overrides {
            data: matches.get_one::<PathBuf>("data").cloned(),
            output_dir: matches.get_one::<PathBuf>("output_dir").cloned(),
            top_features,
        }
    }
}

/// A validated configuration together with the table it runs on.
#[derive(Debug, Clone)]
pub struct RunInput {
    pub config: AnalysisConfig,
    pub data_path: PathBuf,
}

impl RunInput {
    pub fn from_arguments(config_path: &Path, overrides: &Overrides) -> Result<Self> {
        let mut config = load_config(config_path)?;

        if let Some(data) = &overrides.data {
            config.meta.data_path = Some(data.clone());
        }
        if let Some(output_dir) = &overrides.output_dir {
            config.meta.output_dir = output_dir.clone();
        }
        if let Some(features) = &overrides.top_features {
            config.verification.top_features = features.clone();
        }

        let data_path = config
            .meta
            .data_path
            .clone()
            .context("No input data: set meta.data_path or pass --data")?;
        validate_tsv_or_csv_file(&data_path)?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration: {}", config_path.display()))?;

        Ok(RunInput { config, data_path })
    }
}

pub fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: AnalysisConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_cli;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("config.json");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_command_line_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("cohort.csv");
        fs::write(&data, "lvef,mace\n40,1\n60,0\n").unwrap();
        let config_path = write_config(
            dir.path(),
            r#"{"meta": {"target_label": "mace", "data_path": "nowhere.csv"},
                "verification": {"top_features": ["age"]}}"#,
        );

        let matches = build_cli().get_matches_from([
            "featverify",
            "verify",
            config_path.to_str().unwrap(),
            "-d",
            data.to_str().unwrap(),
            "-o",
            dir.path().join("out").to_str().unwrap(),
            "-f",
            "lvef, age",
        ]);
        let (_, sub) = matches.subcommand().unwrap();
        let input = RunInput::from_arguments(&config_path, &Overrides::from_matches(sub)).unwrap();

        assert_eq!(input.data_path, data);
        assert_eq!(input.config.meta.output_dir, dir.path().join("out"));
        assert_eq!(
            input.config.verification.top_features,
            vec!["lvef".to_string(), "age".to_string()]
        );
    }

    #[test]
    fn test_explore_has_no_feature_override() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("cohort.tsv");
        fs::write(&data, "lvef\tmace\n40\t1\n").unwrap();
        let config_path = write_config(
            dir.path(),
            &format!(
                r#"{{"meta": {{"target_label": "mace", "data_path": {:?}}},
                    "verification": {{"top_features": ["lvef"]}}}}"#,
                data.to_str().unwrap()
            ),
        );

        let matches = build_cli().get_matches_from(["featverify", "explore", config_path.to_str().unwrap()]);
        let (_, sub) = matches.subcommand().unwrap();
        let overrides = Overrides::from_matches(sub);
        assert!(overrides.top_features.is_none());

        let input = RunInput::from_arguments(&config_path, &overrides).unwrap();
        assert_eq!(input.data_path, data);
        assert_eq!(input.config.verification.top_features, vec!["lvef".to_string()]);
    }

    #[test]
    fn test_missing_data_and_bad_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path(), r#"{"meta": {"target_label": "mace"}}"#);
        let err = RunInput::from_arguments(&config_path, &Overrides::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("No input data"));

        let data = dir.path().join("cohort.csv");
        fs::write(&data, "lvef,mace\n40,1\n").unwrap();
        let config_path = write_config(
            dir.path(),
            r#"{"meta": {"target_label": "mace", "learn_task": "multi_classification"}}"#,
        );
        let overrides = Overrides {
            data: Some(data),
            ..Overrides::default()
        };
        assert!(RunInput::from_arguments(&config_path, &overrides).is_err());

        let broken = write_config(dir.path(), "{ not json");
        let err = load_config(&broken).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }
}
