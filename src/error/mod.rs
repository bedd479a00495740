mod app_error;

pub use app_error::{AppError, AppResult, EXIT_ALREADY_LOCKED, EXIT_FAILURE};
