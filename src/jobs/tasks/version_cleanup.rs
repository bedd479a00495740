use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;

use crate::config::settings::VersionCleanupConfig;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::tasks::{read_dir_if_exists, remove_file, run_blocking};
use crate::jobs::types::{JobContext, MaintenanceTask};

/// Prunes stored versions, keeping the newest `keep_versions` per element.
///
/// Layout is one subdirectory per element under `directory`, each holding
/// one file per version. Newest is decided by mtime, then by file name.
#[derive(Debug, Clone)]
pub struct VersionCleanupTask {
    directory: PathBuf,
    keep_versions: usize,
}

impl VersionCleanupTask {
    pub const NAME: &'static str = "versioncleanup";

    pub fn new(directory: impl Into<PathBuf>, keep_versions: usize) -> Self {
        Self {
            directory: directory.into(),
            keep_versions,
        }
    }

    pub fn from_settings(settings: &VersionCleanupConfig) -> Self {
        Self::new(&settings.directory, settings.keep_versions)
    }

    /// Returns the number of versions removed
    pub fn sweep(&self) -> JobResult<usize> {
        let Some(entries) = read_dir_if_exists(&self.directory)? else {
            return Ok(0);
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| JobError::io(&self.directory, e))?;
            let path = entry.path();
            if entry.file_type().map_err(|e| JobError::io(&path, e))?.is_dir() {
                removed += self.prune_element(&path)?;
            }
        }
        Ok(removed)
    }

    fn prune_element(&self, dir: &Path) -> JobResult<usize> {
        let Some(entries) = read_dir_if_exists(dir)? else {
            return Ok(0);
        };

        let mut versions: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| JobError::io(dir, e))?;
            let path = entry.path();
            let metadata = entry.metadata().map_err(|e| JobError::io(&path, e))?;
            if metadata.is_file() {
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                versions.push((modified, path));
            }
        }

        // Newest first
        versions.sort_by(|a, b| b.cmp(a));

        let mut removed = 0;
        for (_, path) in versions.iter().skip(self.keep_versions) {
            remove_file(path)?;
            removed += 1;
        }
        if removed > 0 {
            tracing::debug!(element = %dir.display(), removed, "Pruned old versions");
        }
        Ok(removed)
    }
}

#[async_trait]
impl MaintenanceTask for VersionCleanupTask {
    async fn execute(&self, ctx: &JobContext) -> JobResult<()> {
        let task = self.clone();
        let removed = run_blocking(move || task.sweep()).await?;

        tracing::info!(
            run_id = %ctx.run_id,
            removed,
            keep_versions = self.keep_versions,
            "Version cleanup completed"
        );
        Ok(())
    }

    fn description(&self) -> Option<String> {
        Some(format!(
            "Keep the newest {} versions of each element",
            self.keep_versions
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::tasks::test_support::{aged_file, hours};

    #[test]
    fn test_keeps_newest_versions_per_element() {
        let dir = tempfile::tempdir().unwrap();
        for (i, age) in [5, 4, 3, 2, 1].into_iter().enumerate() {
            aged_file(&dir.path().join(format!("doc-1/v{}", i + 1)), "v", hours(age));
        }
        aged_file(&dir.path().join("doc-2/v1"), "v", hours(10));

        let task = VersionCleanupTask::new(dir.path(), 2);
        assert_eq!(task.sweep().unwrap(), 3);

        let mut remaining: Vec<String> = std::fs::read_dir(dir.path().join("doc-1"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(remaining, vec!["v4", "v5"]);
        assert!(dir.path().join("doc-2/v1").exists());
    }

    #[test]
    fn test_ignores_top_level_files() {
        let dir = tempfile::tempdir().unwrap();
        let loose = dir.path().join("index.json");
        aged_file(&loose, "{}", hours(100));

        let task = VersionCleanupTask::new(dir.path(), 1);
        assert_eq!(task.sweep().unwrap(), 0);
        assert!(loose.exists());
    }

    #[test]
    fn test_missing_directory_removes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let task = VersionCleanupTask::new(dir.path().join("missing"), 3);
        assert_eq!(task.sweep().unwrap(), 0);
    }
}
