//! File-backed process lock
//!
//! The lock is a PID file guarded by a non-blocking exclusive `flock`. The
//! `flock` alone arbitrates between invocations: the kernel drops it when the
//! owner exits, however it exits. A PID still recorded in a file whose `flock`
//! we just obtained therefore belongs to a run that ended without releasing,
//! even if the OS has since handed that PID to an unrelated process.
//!
//! Acquisition:
//! 1. open-or-create the file and try `flock(LOCK_EX | LOCK_NB)`
//! 2. make sure the locked inode is still the one at the path, since a
//!    releasing process unlinks the file before closing it
//! 3. a leftover PID from another process is stale and handled by the
//!    [`StaleLockPolicy`]
//! 4. write our PID

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::jobs::error::LockError;

/// How many times to retry when the lock file is replaced under us
const MAX_ACQUIRE_ATTEMPTS: usize = 3;

/// What to do with a lock file left behind by a process that no longer exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleLockPolicy {
    /// Take over the lock and log a warning
    #[default]
    Reclaim,
    /// Fail with [`LockError::StaleLock`]; an operator has to remove the file
    Refuse,
}

impl StaleLockPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaleLockPolicy::Reclaim => "reclaim",
            StaleLockPolicy::Refuse => "refuse",
        }
    }
}

impl std::str::FromStr for StaleLockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reclaim" => Ok(StaleLockPolicy::Reclaim),
            "refuse" => Ok(StaleLockPolicy::Refuse),
            _ => Err(format!(
                "Invalid stale lock policy '{}'. Valid values are: reclaim, refuse",
                s
            )),
        }
    }
}

/// A held process lock; released explicitly or on drop
#[derive(Debug)]
pub struct LockHandle {
    path: PathBuf,
    file: Option<File>,
}

impl LockHandle {
    /// Try to acquire the lock at `path` without blocking
    pub fn try_acquire(
        path: impl AsRef<Path>,
        stale_policy: StaleLockPolicy,
    ) -> Result<Self, LockError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;
        }

        for _ in 0..MAX_ACQUIRE_ATTEMPTS {
            let mut file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(path)
                .map_err(|e| io_error(path, e))?;

            if !try_lock_exclusive(&file).map_err(|e| io_error(path, e))? {
                let pid = read_pid(&mut file).ok().flatten();
                return Err(LockError::AlreadyLocked {
                    identifier: path.display().to_string(),
                    pid,
                });
            }

            if !is_same_file(&file, path).map_err(|e| io_error(path, e))? {
                tracing::debug!(path = %path.display(), "Lock file replaced while locking, retrying");
                continue;
            }

            match read_pid(&mut file).map_err(|e| io_error(path, e))? {
                Some(pid) if pid != std::process::id() => {
                    // Liveness is informational only; a live pid here was reused
                    let pid_reused = is_pid_alive(pid);
                    match stale_policy {
                        StaleLockPolicy::Reclaim => {
                            tracing::warn!(
                                path = %path.display(),
                                stale_pid = pid,
                                pid_reused,
                                "Reclaiming stale maintenance lock"
                            );
                        }
                        StaleLockPolicy::Refuse => {
                            tracing::error!(
                                path = %path.display(),
                                stale_pid = pid,
                                pid_reused,
                                "Stale maintenance lock found, refusing to reclaim"
                            );
                            return Err(LockError::StaleLock {
                                identifier: path.display().to_string(),
                                pid,
                            });
                        }
                    }
                }
                _ => {}
            }

            write_pid(&mut file).map_err(|e| io_error(path, e))?;
            tracing::debug!(path = %path.display(), pid = std::process::id(), "Acquired maintenance lock");

            return Ok(Self {
                path: path.to_path_buf(),
                file: Some(file),
            });
        }

        Err(LockError::AlreadyLocked {
            identifier: path.display().to_string(),
            pid: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Remove the lock file and drop the `flock`. Calling it again is a no-op.
    pub fn release(&mut self) -> Result<(), LockError> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };

        // Unlink while still holding the flock so no one can lock the old inode
        let result = match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&self.path, e)),
        };
        drop(file);

        tracing::debug!(path = %self.path.display(), "Released maintenance lock");
        result
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "Failed to release maintenance lock");
        }
    }
}

fn io_error(path: &Path, source: io::Error) -> LockError {
    LockError::Io {
        identifier: path.display().to_string(),
        source,
    }
}

fn read_pid(file: &mut File) -> io::Result<Option<u32>> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let contents = contents.trim();
    if contents.is_empty() {
        return Ok(None);
    }
    match contents.parse::<u32>() {
        Ok(pid) => Ok(Some(pid)),
        Err(_) => {
            tracing::warn!(contents, "Lock file holds no valid pid, overwriting");
            Ok(None)
        }
    }
}

fn write_pid(file: &mut File) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.sync_all()
}

/// Check whether a given PID is alive.
///
/// Uses `kill(pid, 0)`, which checks for existence without sending a signal.
fn is_pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(pid_i32) = i32::try_from(pid) else {
        return false;
    };
    #[cfg(unix)]
    {
        // SAFETY: signal 0 performs only the existence and permission check.
        let result = unsafe { libc::kill(pid_i32, 0) };
        if result == 0 {
            return true;
        }
        // EPERM: the process exists but belongs to someone else
        io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }
    #[cfg(not(unix))]
    {
        let _ = pid_i32;
        true
    }
}

/// Try to take an exclusive lock without blocking.
///
/// Returns `Ok(false)` if another open file description holds it.
fn try_lock_exclusive(file: &File) -> io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        // SAFETY: the descriptor is owned by `file` and stays open for the call.
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if result == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK)
        {
            return Ok(false);
        }
        Err(err)
    }
    #[cfg(not(unix))]
    {
        match file.try_lock() {
            Ok(()) => Ok(true),
            Err(std::fs::TryLockError::WouldBlock) => Ok(false),
            Err(std::fs::TryLockError::Error(e)) => Err(e),
        }
    }
}

fn is_same_file(file: &File, path: &Path) -> io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let held = file.metadata()?;
        match fs::metadata(path) {
            Ok(current) => Ok(held.dev() == current.dev() && held.ino() == current.ino()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (file, path);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use tempfile::tempdir;

    /// Above any real pid_max, so never a live process
    const DEAD_PID: u32 = i32::MAX as u32;

    #[test]
    fn test_acquire_writes_pid_and_release_removes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("maintenance.pid");

        let mut handle = LockHandle::try_acquire(&path, StaleLockPolicy::Reclaim).unwrap();
        assert!(handle.is_held());
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());

        handle.release().unwrap();
        assert!(!handle.is_held());
        assert!(!path.exists());

        // Idempotent
        handle.release().unwrap();
    }

    #[test]
    fn test_second_acquire_is_rejected_while_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("maintenance.pid");

        let _held = LockHandle::try_acquire(&path, StaleLockPolicy::Reclaim).unwrap();
        let result = LockHandle::try_acquire(&path, StaleLockPolicy::Reclaim);

        match result {
            Err(LockError::AlreadyLocked { pid, .. }) => {
                assert_eq!(pid, Some(std::process::id()));
            }
            other => panic!("Expected AlreadyLocked, got {:?}", other),
        }
    }

    #[test]
    fn test_lock_can_be_reacquired_after_release_and_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("maintenance.pid");

        let mut first = LockHandle::try_acquire(&path, StaleLockPolicy::Reclaim).unwrap();
        first.release().unwrap();
        let second = LockHandle::try_acquire(&path, StaleLockPolicy::Reclaim).unwrap();
        drop(second);
        assert!(!path.exists());

        assert!(LockHandle::try_acquire(&path, StaleLockPolicy::Reclaim).is_ok());
    }

    #[test]
    fn test_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("var").join("run").join("maintenance.pid");

        let handle = LockHandle::try_acquire(&path, StaleLockPolicy::Reclaim).unwrap();
        assert_eq!(handle.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("maintenance.pid");
        fs::write(&path, format!("{}\n", DEAD_PID)).unwrap();

        let _handle = LockHandle::try_acquire(&path, StaleLockPolicy::Reclaim).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_stale_lock_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("maintenance.pid");
        fs::write(&path, format!("{}\n", DEAD_PID)).unwrap();

        let result = LockHandle::try_acquire(&path, StaleLockPolicy::Refuse);
        assert!(matches!(result, Err(LockError::StaleLock { pid, .. }) if pid == DEAD_PID));

        // The marker stays for an operator to inspect
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), DEAD_PID.to_string());
    }

    #[test]
    fn test_reused_pid_without_flock_is_reclaimed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("maintenance.pid");
        // pid 1 is always alive but never holds our flock
        fs::write(&path, "1\n").unwrap();

        let _handle = LockHandle::try_acquire(&path, StaleLockPolicy::Reclaim).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_reused_pid_without_flock_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("maintenance.pid");
        fs::write(&path, "1\n").unwrap();

        let result = LockHandle::try_acquire(&path, StaleLockPolicy::Refuse);
        assert!(matches!(result, Err(LockError::StaleLock { pid: 1, .. })));
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "1");
    }

    #[test]
    fn test_garbage_contents_are_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("maintenance.pid");
        fs::write(&path, "not a pid").unwrap();

        let _handle = LockHandle::try_acquire(&path, StaleLockPolicy::Refuse).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_concurrent_acquire_has_single_winner() {
        let dir = tempdir().unwrap();
        let path = Arc::new(dir.path().join("maintenance.pid"));
        let contenders = 8;
        let barrier = Arc::new(Barrier::new(contenders));

        let threads: Vec<_> = (0..contenders)
            .map(|_| {
                let path = Arc::clone(&path);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    let result = LockHandle::try_acquire(path.as_path(), StaleLockPolicy::Reclaim);
                    // Hold the winner until everyone has tried
                    barrier.wait();
                    result
                })
            })
            .collect();

        let results: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, LockError::AlreadyLocked { .. }))
        );
    }

    #[test]
    fn test_pid_liveness() {
        assert!(is_pid_alive(std::process::id()));
        assert!(!is_pid_alive(0));
        assert!(!is_pid_alive(DEAD_PID));
        assert!(!is_pid_alive(DEAD_PID + 1));
    }

    #[test]
    fn test_stale_policy_parsing() {
        assert_eq!("reclaim".parse::<StaleLockPolicy>().unwrap(), StaleLockPolicy::Reclaim);
        assert_eq!("REFUSE".parse::<StaleLockPolicy>().unwrap(), StaleLockPolicy::Refuse);
        assert!("maybe".parse::<StaleLockPolicy>().is_err());
        assert_eq!(StaleLockPolicy::default(), StaleLockPolicy::Reclaim);
    }
}
