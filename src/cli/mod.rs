//! Command-line interface
//!
//! - Argument parsing with clap
//! - Configuration merging (CLI args over config files)
//! - Command dispatch to the run and list handlers

pub mod config_merger;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{Cli, Commands, Environment, ReportFormat, RunArgs, SelectionArgs};

use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};
use crate::logger::init_logger;

/// Load file configuration, then apply CLI overrides and validate
pub fn load_and_merge_config(cli: &Cli) -> AppResult<Settings> {
    let merger =
        ConfigurationMerger::load(cli.config.as_deref(), cli.env.map(Into::into))?;
    Ok(merger.merge_cli_args(cli)?)
}

pub fn init_logger_from_settings(settings: &Settings) -> AppResult<()> {
    let logger_config = settings.logger.clone().into_logger_config()?;
    init_logger(logger_config).map_err(|source| AppError::Logger { source })
}
