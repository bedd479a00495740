//! Rotated log compression and archive expiry

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::config::settings::LogCleanupConfig;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::tasks::{age_of, read_dir_if_exists, remove_file, run_blocking};
use crate::jobs::types::{JobContext, MaintenanceTask};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Upper bound on `<name>.<n>.gz` candidates tried for one rotated log
const MAX_ARCHIVE_SUFFIX: u32 = 1000;

/// Gzips rotated log files and removes expired archives.
///
/// A rotated log is any `*.log.<suffix>` file, for example `app.log.2024-01-01`.
/// The live `*.log` file is never touched.
#[derive(Debug, Clone)]
pub struct LogCleanupTask {
    directory: PathBuf,
    compress_after: Duration,
    retention: Duration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogCleanupStats {
    pub compressed: usize,
    pub deleted: usize,
}

impl LogCleanupTask {
    pub const NAME: &'static str = "cleanuplogfiles";

    pub fn new(directory: impl Into<PathBuf>, compress_after: Duration, retention: Duration) -> Self {
        Self {
            directory: directory.into(),
            compress_after,
            retention,
        }
    }

    pub fn from_settings(settings: &LogCleanupConfig) -> Self {
        Self::new(
            &settings.directory,
            days_to_duration(settings.compress_after_days),
            days_to_duration(settings.retention_days),
        )
    }

    /// Single pass over the log directory
    pub fn sweep(&self, now: SystemTime) -> JobResult<LogCleanupStats> {
        let mut stats = LogCleanupStats::default();
        let Some(entries) = read_dir_if_exists(&self.directory)? else {
            tracing::debug!(directory = %self.directory.display(), "Log directory missing, nothing to do");
            return Ok(stats);
        };

        for entry in entries {
            let entry = entry.map_err(|e| JobError::io(&self.directory, e))?;
            let path = entry.path();
            let metadata = entry.metadata().map_err(|e| JobError::io(&path, e))?;
            if !metadata.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let age = age_of(&metadata, now);

            if file_name.ends_with(".gz") {
                if age > self.retention {
                    remove_file(&path)?;
                    stats.deleted += 1;
                }
            } else if is_rotated_log(file_name) && age > self.compress_after {
                let archive = compress(&path)?;
                tracing::debug!(log = %path.display(), archive = %archive.display(), "Compressed rotated log");
                stats.compressed += 1;
            }
        }

        Ok(stats)
    }
}

#[async_trait]
impl MaintenanceTask for LogCleanupTask {
    async fn execute(&self, ctx: &JobContext) -> JobResult<()> {
        let task = self.clone();
        let stats = run_blocking(move || task.sweep(SystemTime::now())).await?;

        tracing::info!(
            run_id = %ctx.run_id,
            compressed = stats.compressed,
            deleted = stats.deleted,
            directory = %self.directory.display(),
            "Log file cleanup completed"
        );
        Ok(())
    }

    fn description(&self) -> Option<String> {
        Some(format!(
            "Compress rotated logs older than {} days and delete archives older than {} days",
            self.compress_after.as_secs() / SECS_PER_DAY,
            self.retention.as_secs() / SECS_PER_DAY
        ))
    }
}

fn is_rotated_log(file_name: &str) -> bool {
    file_name
        .find(".log.")
        .is_some_and(|idx| idx + ".log.".len() < file_name.len())
}

/// Saturates instead of overflowing; a saturated age never expires
fn days_to_duration(days: u64) -> Duration {
    Duration::from_secs(days.saturating_mul(SECS_PER_DAY))
}

/// Replace `path` with a gzip archive next to it.
///
/// The archive is `path.gz`, or `path.<n>.gz` when a numbered log such as
/// `app.log.1` was already archived by an earlier sweep. Existing archives
/// are never overwritten.
fn compress(path: &Path) -> JobResult<PathBuf> {
    let (archive, output) = create_archive(path).map_err(|e| JobError::io(path, e))?;

    let write_archive = || -> io::Result<()> {
        let mut input = BufReader::new(File::open(path)?);
        let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
        io::copy(&mut input, &mut encoder)?;
        encoder.finish()?.into_inner().map_err(|e| e.into_error())?.sync_all()
    };

    if let Err(e) = write_archive() {
        // Leave no truncated archive behind
        let _ = fs::remove_file(&archive);
        return Err(JobError::io(path, e));
    }
    remove_file(path)?;
    Ok(archive)
}

fn create_archive(path: &Path) -> io::Result<(PathBuf, File)> {
    for n in 0..MAX_ARCHIVE_SUFFIX {
        let archive = archive_path(path, n);
        match OpenOptions::new().write(true).create_new(true).open(&archive) {
            Ok(file) => {
                if n > 0 {
                    tracing::debug!(archive = %archive.display(), "Archive name taken, using numbered archive");
                }
                return Ok((archive, file));
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free archive name for {}", path.display()),
    ))
}

fn archive_path(path: &Path, n: u32) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    if n > 0 {
        name.push(format!(".{n}"));
    }
    name.push(".gz");
    PathBuf::from(name)
}
