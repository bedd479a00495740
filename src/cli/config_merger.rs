//! Merges CLI overrides into file-based configuration
//!
//! CLI arguments take precedence over every configuration source.

use std::path::Path;

use super::parser::{Cli, SelectionArgs};
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, Environment, settings::Settings};
use crate::jobs::parse_job_list;

pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Load the base configuration, from `config_path` alone when given,
    /// otherwise through the layered loader.
    pub fn load(
        config_path: Option<&Path>,
        environment: Option<Environment>,
    ) -> Result<Self, ConfigError> {
        let mut loader = ConfigLoader::new()?;
        if let Some(path) = config_path {
            loader = loader.with_config_file(path);
        }
        if let Some(environment) = environment {
            loader = loader.with_environment(environment);
        }
        Ok(Self::new(loader.load()?))
    }

    /// Apply CLI overrides and validate the result
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        apply_global_overrides(&mut config, cli);
        apply_selection_overrides(&mut config, cli.selection());

        config.validate()?;
        Ok(config)
    }

    pub fn config(&self) -> &Settings {
        &self.base_config
    }
}

fn apply_global_overrides(config: &mut Settings, cli: &Cli) {
    if cli.verbose {
        config.logger.level = "debug".to_string();
    } else if cli.quiet {
        config.logger.level = "error".to_string();
    }
}

/// A CLI list replaces the configured list rather than extending it
fn apply_selection_overrides(config: &mut Settings, selection: &SelectionArgs) {
    if let Some(ref jobs) = selection.job {
        config.maintenance.jobs = parse_job_list(jobs);
    }
    if let Some(ref excluded) = selection.excluded_jobs {
        config.maintenance.excluded_jobs = parse_job_list(excluded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn base_config() -> Settings {
        let mut config = Settings::default();
        config.maintenance.jobs = vec!["cleanupcache".to_string()];
        config.maintenance.excluded_jobs = vec!["versioncleanup".to_string()];
        config
    }

    #[test]
    fn test_merge_keeps_base_without_flags() {
        let merger = ConfigurationMerger::new(base_config());
        let cli = Cli::try_parse_from(["housekeeper"]).unwrap();
        let merged = merger.merge_cli_args(&cli).unwrap();
        assert_eq!(&merged, merger.config());
    }

    #[test]
    fn test_merge_verbose_and_quiet() {
        let merger = ConfigurationMerger::new(base_config());

        let cli = Cli::try_parse_from(["housekeeper", "--verbose"]).unwrap();
        assert_eq!(merger.merge_cli_args(&cli).unwrap().logger.level, "debug");

        let cli = Cli::try_parse_from(["housekeeper", "run", "--quiet"]).unwrap();
        assert_eq!(merger.merge_cli_args(&cli).unwrap().logger.level, "error");
    }

    #[test]
    fn test_cli_job_lists_replace_configured_lists() {
        let merger = ConfigurationMerger::new(base_config());
        let cli = Cli::try_parse_from([
            "housekeeper",
            "run",
            "--job",
            "tmpstorecleanup, cleanuplogfiles",
        ])
        .unwrap();
        let merged = merger.merge_cli_args(&cli).unwrap();

        assert_eq!(merged.maintenance.jobs, vec!["tmpstorecleanup", "cleanuplogfiles"]);
        assert_eq!(merged.maintenance.excluded_jobs, vec!["versioncleanup"]);
    }

    #[test]
    fn test_list_selection_is_merged() {
        let merger = ConfigurationMerger::new(base_config());
        let cli = Cli::try_parse_from(["housekeeper", "list", "--ej", "cleanupcache"]).unwrap();
        let merged = merger.merge_cli_args(&cli).unwrap();
        assert_eq!(merged.maintenance.excluded_jobs, vec!["cleanupcache"]);
    }

    #[test]
    fn test_malformed_job_name_fails_validation() {
        let merger = ConfigurationMerger::new(base_config());
        let cli = Cli::try_parse_from(["housekeeper", "--job", "cache cleanup"]).unwrap();
        assert!(matches!(
            merger.merge_cli_args(&cli),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
