//! Range and format checks applied after loading

use crate::config::error::ConfigError;
use crate::config::settings::{
    FileSettings, LoggerSettings, MaintenanceConfig, Settings, TasksConfig,
};
use crate::jobs::JobName;

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::validation(
                "logger.file.format",
                format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            ));
        }
        Ok(())
    }
}

impl LoggerSettings {
    /// Level must be a plain level name or an `EnvFilter` directive list
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.trim().to_lowercase();
        let is_directive = level.contains(['=', ',']);
        if !is_directive && !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::validation(
                "logger.level",
                format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one of logger.console and logger.file must be enabled.",
            ));
        }

        self.file.validate()
    }
}

impl MaintenanceConfig {
    /// Unknown job names are not an error here; the manager warns about them
    /// once the registry is known.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_file.trim().is_empty() {
            return Err(ConfigError::validation(
                "maintenance.lock_file",
                "Lock file path cannot be empty.",
            ));
        }

        for (field, names) in [
            ("maintenance.jobs", &self.jobs),
            ("maintenance.excluded_jobs", &self.excluded_jobs),
        ] {
            for name in names {
                JobName::new(name.as_str())
                    .map_err(|e| ConfigError::validation(field, e.to_string()))?;
            }
        }
        Ok(())
    }
}

impl TasksConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let directories = [
            ("tasks.logs.directory", &self.logs.directory),
            ("tasks.cache.directory", &self.cache.directory),
            ("tasks.versions.directory", &self.versions.directory),
            ("tasks.tmp.directory", &self.tmp.directory),
        ];
        for (field, directory) in directories {
            if directory.trim().is_empty() {
                return Err(ConfigError::validation(field, "Directory cannot be empty."));
            }
        }

        if self.logs.retention_days == 0 {
            return Err(ConfigError::validation(
                "tasks.logs.retention_days",
                "Retention must be at least 1 day.",
            ));
        }
        if self.versions.keep_versions == 0 {
            return Err(ConfigError::validation(
                "tasks.versions.keep_versions",
                "At least one version must be kept.",
            ));
        }
        Ok(())
    }
}

impl Settings {
    /// Returns the first validation error encountered
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logger.validate()?;
        self.maintenance.validate()?;
        self.tasks.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_settings_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_logger_levels() {
        let mut logger = LoggerSettings::default();
        for level in VALID_LOG_LEVELS {
            logger.level = level.to_uppercase();
            assert!(logger.validate().is_ok(), "level {level} should be valid");
        }

        logger.level = "info,housekeeper::jobs=trace".to_string();
        assert!(logger.validate().is_ok());

        logger.level = "verbose".to_string();
        assert_eq!(field_of(logger.validate().unwrap_err()), "logger.level");
    }

    #[test]
    fn test_logger_requires_an_output() {
        let mut logger = LoggerSettings::default();
        logger.console.enabled = false;
        assert_eq!(field_of(logger.validate().unwrap_err()), "logger");
    }

    #[test]
    fn test_logger_file_checks() {
        let mut logger = LoggerSettings::default();
        logger.file.enabled = true;
        logger.file.path = "  ".to_string();
        assert_eq!(field_of(logger.validate().unwrap_err()), "logger.file.path");

        logger.file.enabled = false;
        assert!(logger.validate().is_ok());

        logger.file.format = "yaml".to_string();
        assert_eq!(field_of(logger.validate().unwrap_err()), "logger.file.format");
    }

    #[test]
    fn test_maintenance_rejects_malformed_job_names() {
        let mut maintenance = MaintenanceConfig {
            jobs: vec!["cleanupcache".to_string(), "nosuchjob".to_string()],
            ..Default::default()
        };
        assert!(maintenance.validate().is_ok());

        maintenance.excluded_jobs = vec!["a,b".to_string()];
        assert_eq!(
            field_of(maintenance.validate().unwrap_err()),
            "maintenance.excluded_jobs"
        );

        maintenance.excluded_jobs.clear();
        maintenance.lock_file = String::new();
        assert_eq!(
            field_of(maintenance.validate().unwrap_err()),
            "maintenance.lock_file"
        );
    }

    #[test]
    fn test_tasks_checks() {
        let mut tasks = TasksConfig::default();
        tasks.versions.keep_versions = 0;
        assert_eq!(
            field_of(tasks.validate().unwrap_err()),
            "tasks.versions.keep_versions"
        );

        let mut tasks = TasksConfig::default();
        tasks.tmp.directory = String::new();
        assert_eq!(field_of(tasks.validate().unwrap_err()), "tasks.tmp.directory");

        let mut tasks = TasksConfig::default();
        tasks.logs.retention_days = 0;
        assert_eq!(
            field_of(tasks.validate().unwrap_err()),
            "tasks.logs.retention_days"
        );
    }
}
