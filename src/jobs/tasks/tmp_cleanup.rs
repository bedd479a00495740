use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::config::settings::TmpCleanupConfig;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::tasks::{age_of, read_dir_if_exists, remove_file, run_blocking};
use crate::jobs::types::{JobContext, MaintenanceTask};

const SECS_PER_HOUR: u64 = 60 * 60;

/// Sweeps the temporary store: stale files go first, then any subdirectory
/// left empty and itself older than the cutoff. The root is never removed.
#[derive(Debug, Clone)]
pub struct TmpCleanupTask {
    directory: PathBuf,
    max_age: Duration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TmpCleanupStats {
    pub files: usize,
    pub directories: usize,
}

impl TmpCleanupTask {
    pub const NAME: &'static str = "tmpstorecleanup";

    pub fn new(directory: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            directory: directory.into(),
            max_age,
        }
    }

    pub fn from_settings(settings: &TmpCleanupConfig) -> Self {
        Self::new(
            &settings.directory,
            Duration::from_secs(settings.max_age_hours.saturating_mul(SECS_PER_HOUR)),
        )
    }

    pub fn sweep(&self, now: SystemTime) -> JobResult<TmpCleanupStats> {
        let mut stats = TmpCleanupStats::default();
        self.sweep_dir(&self.directory, now, &mut stats)?;
        Ok(stats)
    }

    /// Returns whether `dir` is empty after the sweep
    fn sweep_dir(&self, dir: &Path, now: SystemTime, stats: &mut TmpCleanupStats) -> JobResult<bool> {
        let Some(entries) = read_dir_if_exists(dir)? else {
            return Ok(false);
        };

        let mut empty = true;
        for entry in entries {
            let entry = entry.map_err(|e| JobError::io(dir, e))?;
            let path = entry.path();
            let metadata = entry.metadata().map_err(|e| JobError::io(&path, e))?;
            let expired = age_of(&metadata, now) > self.max_age;

            if metadata.is_dir() {
                let child_empty = self.sweep_dir(&path, now, stats)?;
                if child_empty && expired && remove_empty_dir(&path)? {
                    stats.directories += 1;
                } else {
                    empty = false;
                }
            } else if expired {
                remove_file(&path)?;
                stats.files += 1;
            } else {
                empty = false;
            }
        }
        Ok(empty)
    }
}

/// `false` when the directory gained entries in the meantime
fn remove_empty_dir(path: &Path) -> JobResult<bool> {
    match fs::remove_dir(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => Ok(false),
        Err(e) => Err(JobError::io(path, e)),
    }
}

#[async_trait]
impl MaintenanceTask for TmpCleanupTask {
    async fn execute(&self, ctx: &JobContext) -> JobResult<()> {
        let task = self.clone();
        let stats = run_blocking(move || task.sweep(SystemTime::now())).await?;

        tracing::info!(
            run_id = %ctx.run_id,
            files = stats.files,
            directories = stats.directories,
            "Temporary store cleanup completed"
        );
        Ok(())
    }

    fn description(&self) -> Option<String> {
        Some(format!(
            "Delete temporary files older than {} hours",
            self.max_age.as_secs() / SECS_PER_HOUR
        ))
    }
}
