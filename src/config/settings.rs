//! Configuration settings structures for housekeeper
//!
//! Everything here can be loaded from TOML files and `HOUSEKEEPER_*`
//! environment variables. Every field has a default so an empty file is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::jobs::{ExecutionPolicy, StaleLockPolicy};
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "housekeeper".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "var/log/housekeeper.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_lock_file() -> String {
    "var/maintenance.pid".to_string()
}

fn default_log_directory() -> String {
    "var/log".to_string()
}

fn default_compress_after_days() -> u64 {
    1
}

fn default_retention_days() -> u64 {
    30
}

fn default_cache_directory() -> String {
    "var/cache".to_string()
}

fn default_cache_ttl() -> u64 {
    24 * 60 * 60
}

fn default_versions_directory() -> String {
    "var/versions".to_string()
}

fn default_keep_versions() -> usize {
    10
}

fn default_tmp_directory() -> String {
    "var/tmp".to_string()
}

fn default_tmp_max_age_hours() -> u64 {
    24
}

// ============================================================================
// Application Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_app_name")]
    pub name: String,

    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,

    #[serde(default = "default_true")]
    pub append: bool,

    /// "full", "compact" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// File representation of the logger; converted with [`LoggerSettings::into_logger_config`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file = self.file.into_file_config()?;

        LoggerConfig::new(console, file, self.level)
            .map_err(|e| ConfigError::validation("logger", e.to_string()))
    }
}

impl FileSettings {
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::validation("logger.file.format", e.to_string()))?;

        FileConfig::new(self.enabled, PathBuf::from(self.path), self.append, format)
            .map_err(|e| ConfigError::validation("logger.file", e.to_string()))
    }
}

// ============================================================================
// Maintenance Configuration
// ============================================================================

/// Manager-level settings: the lock file and the default job selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// PID file guarding against overlapping runs
    #[serde(default = "default_lock_file")]
    pub lock_file: String,

    #[serde(default)]
    pub stale_lock: StaleLockPolicy,

    /// Allow-list; empty means every registered job
    #[serde(default)]
    pub jobs: Vec<String>,

    #[serde(default)]
    pub excluded_jobs: Vec<String>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            lock_file: default_lock_file(),
            stale_lock: StaleLockPolicy::default(),
            jobs: Vec::new(),
            excluded_jobs: Vec::new(),
        }
    }
}

impl MaintenanceConfig {
    pub fn lock_path(&self) -> PathBuf {
        PathBuf::from(&self.lock_file)
    }

    pub fn execution_policy(&self, force: bool) -> ExecutionPolicy {
        ExecutionPolicy::new(&self.jobs, &self.excluded_jobs, force)
    }
}

// ============================================================================
// Task Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCleanupConfig {
    #[serde(default = "default_log_directory")]
    pub directory: String,

    /// Rotated logs older than this are gzipped
    #[serde(default = "default_compress_after_days")]
    pub compress_after_days: u64,

    /// Archives older than this are deleted
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
}

impl Default for LogCleanupConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            compress_after_days: default_compress_after_days(),
            retention_days: default_retention_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCleanupConfig {
    #[serde(default = "default_cache_directory")]
    pub directory: String,

    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheCleanupConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            ttl_seconds: default_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCleanupConfig {
    #[serde(default = "default_versions_directory")]
    pub directory: String,

    #[serde(default = "default_keep_versions")]
    pub keep_versions: usize,
}

impl Default for VersionCleanupConfig {
    fn default() -> Self {
        Self {
            directory: default_versions_directory(),
            keep_versions: default_keep_versions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmpCleanupConfig {
    #[serde(default = "default_tmp_directory")]
    pub directory: String,

    #[serde(default = "default_tmp_max_age_hours")]
    pub max_age_hours: u64,
}

impl Default for TmpCleanupConfig {
    fn default() -> Self {
        Self {
            directory: default_tmp_directory(),
            max_age_hours: default_tmp_max_age_hours(),
        }
    }
}

/// Settings for the built-in tasks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default)]
    pub logs: LogCleanupConfig,

    #[serde(default)]
    pub cache: CacheCleanupConfig,

    #[serde(default)]
    pub versions: VersionCleanupConfig,

    #[serde(default)]
    pub tmp: TmpCleanupConfig,
}

// ============================================================================
// Root Settings
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationConfig,

    #[serde(default)]
    pub logger: LoggerSettings,

    #[serde(default)]
    pub maintenance: MaintenanceConfig,

    #[serde(default)]
    pub tasks: TasksConfig,
}
