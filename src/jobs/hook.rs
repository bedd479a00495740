//! Pre-run notification hook
//!
//! A single hook is invoked once per run, after the lock is taken and before
//! the first job starts. A failing hook aborts the run.

use async_trait::async_trait;
use uuid::Uuid;

use crate::jobs::policy::ExecutionPolicy;
use crate::jobs::registry::PlannedJob;
use crate::jobs::types::JobName;

/// Read-only view of a run handed to the pre-run hook
#[derive(Debug, Clone, Copy)]
pub struct RunView<'a> {
    pub run_id: Uuid,
    pub policy: &'a ExecutionPolicy,
    pub plan: &'a [PlannedJob<'a>],
}

impl<'a> RunView<'a> {
    /// Names of the jobs that will run, in execution order
    pub fn selected(&self) -> impl Iterator<Item = &'a JobName> + use<'a> {
        self.plan
            .iter()
            .filter(|job| job.selected)
            .map(|job| job.descriptor.name())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &'a JobName> + use<'a> {
        self.plan
            .iter()
            .filter(|job| !job.selected)
            .map(|job| job.descriptor.name())
    }
}

#[async_trait]
pub trait PreRunHook: Send + Sync {
    /// Hook name for logging
    fn name(&self) -> &str;

    async fn before_run(&self, view: &RunView<'_>) -> anyhow::Result<()>;
}

/// Logs the resolved plan before jobs start
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHook;

#[async_trait]
impl PreRunHook for LoggingHook {
    fn name(&self) -> &str {
        "logging"
    }

    async fn before_run(&self, view: &RunView<'_>) -> anyhow::Result<()> {
        let selected: Vec<&str> = view.selected().map(JobName::as_str).collect();
        let skipped: Vec<&str> = view.skipped().map(JobName::as_str).collect();
        tracing::debug!(
            run_id = %view.run_id,
            force = view.policy.force(),
            selected = ?selected,
            skipped = ?skipped,
            "Maintenance plan resolved"
        );
        Ok(())
    }
}
