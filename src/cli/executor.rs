//! Dispatches parsed commands to their handlers

use super::handlers::{ListCommandHandler, RunCommandHandler};
use super::parser::{Cli, Commands, RunArgs};
use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};

/// Execute the parsed command with merged settings
///
/// A run that reaches `Done` returns `Ok` even when some jobs failed.
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    cli.validate()
        .map_err(|reason| AppError::validation("cli_arguments", reason))?;

    match &cli.command {
        Some(Commands::List(_)) => ListCommandHandler::new(settings).execute(),
        Some(Commands::Run(args)) => run(settings, args).await,
        None => run(settings, &cli.run).await,
    }
}

async fn run(settings: Settings, args: &RunArgs) -> AppResult<()> {
    let report = RunCommandHandler::new(settings).execute(args).await?;
    if report.has_failures() {
        tracing::warn!(
            failed = report.summary().failed,
            "Maintenance run finished with failed jobs"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn scratch_settings(dir: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.maintenance.lock_file = dir.join("maintenance.pid").display().to_string();
        settings.tasks.logs.directory = dir.join("log").display().to_string();
        settings.tasks.cache.directory = dir.join("cache").display().to_string();
        settings.tasks.versions.directory = dir.join("versions").display().to_string();
        settings.tasks.tmp.directory = dir.join("tmp").display().to_string();
        settings
    }

    #[tokio::test]
    async fn test_default_command_runs() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from(["housekeeper"]).unwrap();
        assert!(execute_command(&cli, scratch_settings(dir.path())).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_command() {
        let cli = Cli::try_parse_from(["housekeeper", "list"]).unwrap();
        assert!(execute_command(&cli, Settings::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_argument_combination() {
        let cli = Cli::try_parse_from(["housekeeper", "--force", "list"]).unwrap();
        let err = execute_command(&cli, Settings::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(err.exit_code(), 1);
    }
}
