use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use crate::config::settings::CacheCleanupConfig;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::tasks::{age_of, read_dir_if_exists, remove_file, run_blocking};
use crate::jobs::types::{JobContext, MaintenanceTask};

/// Expires cache entries whose mtime is older than the TTL.
///
/// Walks the cache tree recursively and removes files only; directory layout
/// is left for the cache owner.
#[derive(Debug, Clone)]
pub struct CacheCleanupTask {
    directory: PathBuf,
    ttl: Duration,
}

impl CacheCleanupTask {
    pub const NAME: &'static str = "cleanupcache";

    pub fn new(directory: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            directory: directory.into(),
            ttl,
        }
    }

    pub fn from_settings(settings: &CacheCleanupConfig) -> Self {
        Self::new(&settings.directory, Duration::from_secs(settings.ttl_seconds))
    }

    /// Returns the number of expired entries removed
    pub fn sweep(&self, now: SystemTime) -> JobResult<usize> {
        let mut removed = 0;
        self.sweep_dir(&self.directory, now, &mut removed)?;
        Ok(removed)
    }

    fn sweep_dir(&self, dir: &Path, now: SystemTime, removed: &mut usize) -> JobResult<()> {
        let Some(entries) = read_dir_if_exists(dir)? else {
            return Ok(());
        };

        for entry in entries {
            let entry = entry.map_err(|e| JobError::io(dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| JobError::io(&path, e))?;

            if file_type.is_dir() {
                self.sweep_dir(&path, now, removed)?;
            } else if file_type.is_file() {
                let metadata = entry.metadata().map_err(|e| JobError::io(&path, e))?;
                if age_of(&metadata, now) > self.ttl {
                    remove_file(&path)?;
                    *removed += 1;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MaintenanceTask for CacheCleanupTask {
    async fn execute(&self, ctx: &JobContext) -> JobResult<()> {
        let task = self.clone();
        let removed = run_blocking(move || task.sweep(SystemTime::now())).await?;

        tracing::info!(
            run_id = %ctx.run_id,
            removed,
            ttl_seconds = self.ttl.as_secs(),
            "Cache cleanup completed"
        );
        Ok(())
    }

    fn description(&self) -> Option<String> {
        Some(format!(
            "Delete cache entries older than {} seconds",
            self.ttl.as_secs()
        ))
    }
}
