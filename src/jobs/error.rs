use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Job panicked: {0}")]
    Panicked(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid job name '{name}': {reason}")]
    InvalidJobName { name: String, reason: &'static str },

    #[error("Job already registered: {0}")]
    DuplicateJobName(String),
}

impl JobError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        JobError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        JobError::ExecutionFailed(message.into())
    }
}

pub type JobResult<T> = Result<T, JobError>;

/// Errors raised while acquiring the process lock
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Lock {identifier} is already held{}", holder_suffix(*.pid))]
    AlreadyLocked { identifier: String, pid: Option<u32> },

    #[error("Lock {identifier} was left behind by pid {pid}, which no longer holds it, and the stale-lock policy is 'refuse'")]
    StaleLock { identifier: String, pid: u32 },

    #[error("Lock {identifier} could not be accessed: {source}")]
    Io {
        identifier: String,
        #[source]
        source: std::io::Error,
    },
}

fn holder_suffix(pid: Option<u32>) -> String {
    match pid {
        Some(pid) => format!(" by pid {}", pid),
        None => String::new(),
    }
}

/// Run-level failures that escape the manager
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Pre-run hook '{hook}' failed")]
    HookFailed {
        hook: String,
        #[source]
        source: anyhow::Error,
    },
}

impl RunError {
    /// Another run holds the lock; callers usually treat this as benign
    pub fn is_already_locked(&self) -> bool {
        matches!(self, RunError::Lock(LockError::AlreadyLocked { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_locked_message_includes_pid() {
        let err = LockError::AlreadyLocked {
            identifier: "var/maintenance.pid".to_string(),
            pid: Some(42),
        };
        assert_eq!(
            err.to_string(),
            "Lock var/maintenance.pid is already held by pid 42"
        );

        let err = LockError::AlreadyLocked {
            identifier: "var/maintenance.pid".to_string(),
            pid: None,
        };
        assert_eq!(err.to_string(), "Lock var/maintenance.pid is already held");
    }

    #[test]
    fn test_run_error_classification() {
        let locked: RunError = LockError::AlreadyLocked {
            identifier: "x".to_string(),
            pid: None,
        }
        .into();
        assert!(locked.is_already_locked());

        let hook = RunError::HookFailed {
            hook: "audit".to_string(),
            source: anyhow::anyhow!("boom"),
        };
        assert!(!hook.is_already_locked());
    }
}
