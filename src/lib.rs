//! Housekeeper Library
//!
//! Core library modules for the housekeeper maintenance runner.

use shadow_rs::shadow;
shadow!(build);

pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logger;

pub use jobs::{ExecutionPolicy, JobRegistry, Manager, RunReport};

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
