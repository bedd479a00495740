//! List command handler

use std::fmt::Write;

use crate::config::settings::Settings;
use crate::error::AppResult;
use crate::jobs::builtin_registry;

pub struct ListCommandHandler {
    config: Settings,
}

impl ListCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> AppResult<()> {
        print!("{}", self.render()?);
        Ok(())
    }

    /// One line per job in execution order: marker, name, description
    pub fn render(&self) -> AppResult<String> {
        let registry = builtin_registry(&self.config.tasks)?;
        let policy = self.config.maintenance.execution_policy(false);

        for name in policy.unknown_names(&registry) {
            tracing::warn!(job = name, "Job filter names no registered job");
        }

        let width = registry
            .iter()
            .map(|job| job.name().as_str().len())
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for planned in registry.plan(&policy) {
            let marker = if planned.selected { "run " } else { "skip" };
            let description = planned.descriptor.description().unwrap_or_default();
            // Writing to a String cannot fail
            let _ = writeln!(
                out,
                "{}  {:<width$}  {}",
                marker,
                planned.name().as_str(),
                description,
                width = width
            );
        }
        Ok(out)
    }
}
