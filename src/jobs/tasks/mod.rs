//! Built-in maintenance tasks
//!
//! Each task is an opaque unit of work from the manager's point of view. They
//! all do blocking filesystem work, so bodies run on the blocking pool.

pub mod cache_cleanup;
pub mod log_cleanup;
pub mod tmp_cleanup;
pub mod version_cleanup;

pub use cache_cleanup::CacheCleanupTask;
pub use log_cleanup::LogCleanupTask;
pub use tmp_cleanup::TmpCleanupTask;
pub use version_cleanup::VersionCleanupTask;

use std::fs::{self, Metadata, ReadDir};
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::config::settings::TasksConfig;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::registry::JobRegistry;
use crate::jobs::types::JobDescriptor;

/// Build the registry of built-in tasks in their fixed execution order
pub fn builtin_registry(settings: &TasksConfig) -> JobResult<JobRegistry> {
    let mut registry = JobRegistry::new();
    registry
        .register(JobDescriptor::new(
            LogCleanupTask::NAME,
            LogCleanupTask::from_settings(&settings.logs),
        )?)?
        .register(JobDescriptor::new(
            CacheCleanupTask::NAME,
            CacheCleanupTask::from_settings(&settings.cache),
        )?)?
        .register(JobDescriptor::new(
            VersionCleanupTask::NAME,
            VersionCleanupTask::from_settings(&settings.versions),
        )?)?
        .register(JobDescriptor::new(
            TmpCleanupTask::NAME,
            TmpCleanupTask::from_settings(&settings.tmp),
        )?)?;
    Ok(registry)
}

/// Run blocking filesystem work off the async workers
pub(crate) async fn run_blocking<F, T>(work: F) -> JobResult<T>
where
    F: FnOnce() -> JobResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(JobError::Panicked(e.to_string())),
        Err(e) => Err(JobError::failed(format!("blocking work cancelled: {}", e))),
    }
}

/// `None` when the directory does not exist
pub(crate) fn read_dir_if_exists(dir: &Path) -> JobResult<Option<ReadDir>> {
    match fs::read_dir(dir) {
        Ok(entries) => Ok(Some(entries)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(JobError::io(dir, e)),
    }
}

/// Time since last modification; zero for timestamps in the future
pub(crate) fn age_of(metadata: &Metadata, now: SystemTime) -> Duration {
    metadata
        .modified()
        .ok()
        .and_then(|modified| now.duration_since(modified).ok())
        .unwrap_or_default()
}

pub(crate) fn remove_file(path: &Path) -> JobResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        // Someone else already removed it
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(JobError::io(path, e)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    use filetime::FileTime;

    /// Write a file and backdate its mtime
    pub fn aged_file(path: &Path, contents: &str, age: Duration) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
        backdate(path, age);
    }

    pub fn backdate(path: &Path, age: Duration) {
        let mtime = FileTime::from_system_time(SystemTime::now() - age);
        filetime::set_file_mtime(path, mtime).unwrap();
    }

    pub fn days(n: u64) -> Duration {
        Duration::from_secs(n * 24 * 60 * 60)
    }

    pub fn hours(n: u64) -> Duration {
        Duration::from_secs(n * 60 * 60)
    }
}
