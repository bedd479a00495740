//! Configuration management
//!
//! Layered TOML files plus `HOUSEKEEPER_*` environment overrides.
//! See [`loader`] for the precedence rules.

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use environment::Environment;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use settings::{
    CacheCleanupConfig, LogCleanupConfig, LoggerSettings, MaintenanceConfig, Settings,
    TasksConfig, TmpCleanupConfig, VersionCleanupConfig,
};
