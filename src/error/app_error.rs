use thiserror::Error;

use crate::config::ConfigError;
use crate::jobs::{JobError, RunError};

/// Exit code for a run refused because another instance holds the lock (EX_TEMPFAIL)
pub const EXIT_ALREADY_LOCKED: i32 = 75;

/// Exit code for every other failure
pub const EXIT_FAILURE: i32 = 1;

/// Application-wide error returned from command handlers.
///
/// Individual job failures never surface here; they are part of the run
/// report. Only run-level and setup failures do.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: ConfigError,
    },

    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Logger initialization failed")]
    Logger {
        #[source]
        source: anyhow::Error,
    },

    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Run(e) if e.is_already_locked() => EXIT_ALREADY_LOCKED,
            _ => EXIT_FAILURE,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        let key = match &error {
            ConfigError::ValidationError { field, .. } => field.clone(),
            ConfigError::FileNotFound(_) => "config_file".to_string(),
            ConfigError::EnvVarError(_) | ConfigError::MutualExclusivityError(_) => {
                "environment".to_string()
            }
            ConfigError::ParseError(_) | ConfigError::Other(_) => "settings".to_string(),
        };
        AppError::Configuration { key, source: error }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::LockError;

    #[test]
    fn test_exit_codes() {
        let locked = AppError::from(RunError::from(LockError::AlreadyLocked {
            identifier: "var/maintenance.pid".to_string(),
            pid: Some(42),
        }));
        assert_eq!(locked.exit_code(), EXIT_ALREADY_LOCKED);

        let stale = AppError::from(RunError::from(LockError::StaleLock {
            identifier: "var/maintenance.pid".to_string(),
            pid: 42,
        }));
        assert_eq!(stale.exit_code(), EXIT_FAILURE);

        let hook = AppError::from(RunError::HookFailed {
            hook: "notify".to_string(),
            source: anyhow::anyhow!("unreachable"),
        });
        assert_eq!(hook.exit_code(), EXIT_FAILURE);

        let config = AppError::from(ConfigError::validation("maintenance.lock_file", "empty"));
        assert_eq!(config.exit_code(), EXIT_FAILURE);
        assert!(config.to_string().contains("maintenance.lock_file"));
    }

    #[test]
    fn test_run_error_is_transparent() {
        let err = AppError::from(RunError::from(LockError::AlreadyLocked {
            identifier: "x.pid".to_string(),
            pid: None,
        }));
        assert_eq!(
            err.to_string(),
            LockError::AlreadyLocked {
                identifier: "x.pid".to_string(),
                pid: None
            }
            .to_string()
        );
    }
}
