//! Run command handler

use crate::cli::parser::{ReportFormat, RunArgs};
use crate::config::settings::Settings;
use crate::error::AppResult;
use crate::jobs::{LoggingHook, Manager, RunReport, builtin_registry};

pub struct RunCommandHandler {
    config: Settings,
}

impl RunCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Manager wired with the built-in jobs and the configured lock
    pub fn manager(&self, force: bool) -> AppResult<Manager> {
        let maintenance = &self.config.maintenance;
        let registry = builtin_registry(&self.config.tasks)?;

        Ok(
            Manager::new(maintenance.lock_path(), maintenance.execution_policy(force))
                .with_registry(registry)
                .with_stale_lock_policy(maintenance.stale_lock)
                .with_hook(LoggingHook),
        )
    }

    /// Execute one run and print its report to stdout
    ///
    /// Job failures are part of the report; only run-level failures are errors.
    pub async fn execute(&self, args: &RunArgs) -> AppResult<RunReport> {
        let report = self.manager(args.force)?.run().await?;
        println!("{}", render_report(&report, args.report)?);
        Ok(report)
    }
}

pub fn render_report(report: &RunReport, format: ReportFormat) -> AppResult<String> {
    match format {
        ReportFormat::Text => Ok(report.to_string()),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report).map_err(anyhow::Error::from)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_ALREADY_LOCKED;
    use crate::jobs::{JobOutcome, LockHandle, StaleLockPolicy};
    use crate::jobs::report::SKIP_FILTERED;
    use tempfile::{TempDir, tempdir};

    /// Settings pointing every path into a scratch directory
    fn scratch_settings() -> (TempDir, Settings) {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut settings = Settings::default();
        settings.maintenance.lock_file = root.join("maintenance.pid").display().to_string();
        settings.tasks.logs.directory = root.join("log").display().to_string();
        settings.tasks.cache.directory = root.join("cache").display().to_string();
        settings.tasks.versions.directory = root.join("versions").display().to_string();
        settings.tasks.tmp.directory = root.join("tmp").display().to_string();
        (dir, settings)
    }

    #[tokio::test]
    async fn test_run_all_builtin_jobs() {
        let (_dir, settings) = scratch_settings();
        let lock_path = settings.maintenance.lock_path();
        let handler = RunCommandHandler::new(settings);

        let report = handler.execute(&RunArgs::default()).await.unwrap();

        let summary = report.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 4);
        assert!(!lock_path.exists());
    }

    #[tokio::test]
    async fn test_run_respects_selection() {
        let (_dir, mut settings) = scratch_settings();
        settings.maintenance.excluded_jobs = vec!["versioncleanup".to_string()];
        let handler = RunCommandHandler::new(settings);

        let report = handler.execute(&RunArgs::default()).await.unwrap();
        assert_eq!(
            report.outcome_of("versioncleanup"),
            Some(&JobOutcome::Skipped {
                reason: SKIP_FILTERED.to_string()
            })
        );
        assert_eq!(report.outcome_of("cleanupcache"), Some(&JobOutcome::Succeeded));
    }

    #[tokio::test]
    async fn test_held_lock_maps_to_tempfail() {
        let (_dir, settings) = scratch_settings();
        let _held =
            LockHandle::try_acquire(settings.maintenance.lock_path(), StaleLockPolicy::Refuse).unwrap();
        let handler = RunCommandHandler::new(settings);

        let err = handler.execute(&RunArgs::default()).await.unwrap_err();
        assert_eq!(err.exit_code(), EXIT_ALREADY_LOCKED);
    }

    #[tokio::test]
    async fn test_force_ignores_held_lock() {
        let (_dir, settings) = scratch_settings();
        let _held =
            LockHandle::try_acquire(settings.maintenance.lock_path(), StaleLockPolicy::Refuse).unwrap();
        let handler = RunCommandHandler::new(settings);

        let args = RunArgs {
            force: true,
            ..Default::default()
        };
        let report = handler.execute(&args).await.unwrap();
        assert_eq!(report.summary().succeeded, 4);
    }

    #[tokio::test]
    async fn test_render_json_report() {
        let (_dir, settings) = scratch_settings();
        let report = RunCommandHandler::new(settings)
            .manager(false)
            .unwrap()
            .run()
            .await
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&render_report(&report, ReportFormat::Json).unwrap()).unwrap();
        assert_eq!(json["entries"][0]["name"], "cleanuplogfiles");
        assert_eq!(json["entries"][3]["name"], "tmpstorecleanup");

        let text = render_report(&report, ReportFormat::Text).unwrap();
        assert!(text.ends_with("total=4 succeeded=4 failed=0 skipped=0"));
    }
}
