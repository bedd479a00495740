//! Command handlers, kept apart from parsing and validation

pub mod list;
pub mod run;

pub use list::ListCommandHandler;
pub use run::RunCommandHandler;
